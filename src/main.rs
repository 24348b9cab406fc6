use std::process;
use std::sync::Arc;

use apis::google_aistudio::GoogleAiStudio;
use config::Config;
use generation::{GenerativeService, MemeGenerator, Strategy};
use server::AppState;
use tokio::net::TcpListener;
use worker_pool::WorkerPool;

mod apis;
mod config;
mod error;
mod extract;
mod generation;
mod image_utils;
mod logchamp;
mod prompts;
mod response;
mod server;
#[cfg(test)]
mod test_fixtures;
mod worker_pool;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    if let Err(err) = logchamp::init() {
        eprintln!("failed to initialize logging: {err}");
        process::exit(1);
    }

    if let Err(err) = dotenv {
        log::debug!("no .env file loaded: {err}");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            process::exit(1);
        }
    };

    let vision = match GoogleAiStudio::new(&config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            log::error!("failed to initialize Gemini client: {err}");
            process::exit(1);
        }
    };

    let strategy = if config.image_generation {
        Strategy::resolve(
            GoogleAiStudio::new(&config)
                .map(|client| Arc::new(client) as Arc<dyn GenerativeService>),
        )
    } else {
        log::info!("image generation disabled by IMAGE_GENERATION");
        Strategy::VisionOnly
    };

    log::info!("image model: {}", config.image_model);
    log::info!("vision model: {}", config.vision_model);
    log::info!("generation strategy: {}", strategy.name());
    log::info!("worker pool size: {}", config.workers);

    let state = AppState {
        generator: Arc::new(MemeGenerator::new(
            vision,
            strategy,
            config.image_model,
            config.vision_model,
        )),
        pool: WorkerPool::new(config.workers),
        api_configured: true,
    };

    let listener = match TcpListener::bind(config.address).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind {}: {err}", config.address);
            process::exit(1);
        }
    };
    log::info!("listening on http://{}", config.address);

    if let Err(err) =
        axum::serve(listener, server::router(state)).with_graceful_shutdown(shutdown_signal()).await
    {
        log::error!("server error: {err}");
        process::exit(1);
    }

    log::info!("server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                log::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => (),
        () = terminate => (),
    }

    log::info!("shutting down");
}
