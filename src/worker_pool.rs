use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinError;

#[derive(Debug)]
pub enum WorkerError {
    Closed(AcquireError),
    Join(JoinError),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(err) => write!(f, "worker pool closed: {err}"),
            Self::Join(err) => write!(f, "worker task failed: {err}"),
        }
    }
}

impl std::error::Error for WorkerError {}

/// Caps how many decode, encode and generation jobs run at once across all requests.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { permits: Arc::new(Semaphore::new(size)) }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Runs CPU-bound work on the blocking thread pool.
    pub async fn run_blocking<F, T>(&self, job: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.permits.clone().acquire_owned().await.map_err(WorkerError::Closed)?;

        tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        })
        .await
        .map_err(WorkerError::Join)
    }

    /// Runs `job` on its own task. Dropping the returned future does not cancel it.
    pub async fn run<F>(&self, job: F) -> Result<F::Output, WorkerError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = self.permits.clone().acquire_owned().await.map_err(WorkerError::Closed)?;

        tokio::spawn(async move {
            let result = job.await;
            drop(permit);
            result
        })
        .await
        .map_err(WorkerError::Join)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_run_blocking() {
        let pool = WorkerPool::new(2);
        assert_eq!(pool.run_blocking(|| 2 + 2).await.unwrap(), 4);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_permits_are_held_while_running() {
        let pool = WorkerPool::new(1);
        let (tx, rx) = oneshot::channel::<()>();

        let running = tokio::spawn({
            let pool = pool.clone();
            async move { pool.run(async move { rx.await.is_ok() }).await }
        });

        while pool.available() != 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        tx.send(()).unwrap();
        assert!(running.await.unwrap().unwrap());
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_job_outlives_caller() {
        let pool = WorkerPool::new(1);
        let (tx, rx) = oneshot::channel();

        let job = pool.run(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send(42).unwrap();
        });

        let _ = tokio::time::timeout(Duration::from_millis(1), job).await;

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_panicking_job() {
        let pool = WorkerPool::new(1);
        let result = pool.run_blocking(|| -> u8 { panic!("boom") }).await;
        assert!(matches!(result, Err(WorkerError::Join(_))));
        assert_eq!(pool.available(), 1);
    }
}
