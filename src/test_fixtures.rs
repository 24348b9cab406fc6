use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::apis::google_aistudio::GenerationError;
use crate::config::Config;
use crate::generation::{GeneratedContent, GenerativeService, MemeGenerator, Strategy};
use crate::server::AppState;
use crate::worker_pool::WorkerPool;

#[derive(Debug, PartialEq, Eq)]
pub enum Call {
    Analyze { model: String, prompt: String, image: Vec<u8> },
    GenerateImage { model: String, prompt: String },
}

pub enum FakeImage {
    Images(Vec<Vec<u8>>, Option<String>),
    Fail,
}

pub struct FakeService {
    analysis: Option<Option<String>>,
    image: FakeImage,
    calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new(analysis: Option<&str>, image: FakeImage) -> Self {
        Self { analysis: Some(analysis.map(Into::into)), image, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing_analysis() -> Self {
        Self { analysis: None, image: FakeImage::Fail, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

#[async_trait]
impl GenerativeService for FakeService {
    async fn analyze(
        &self,
        model: &str,
        prompt: &str,
        image_png: &[u8],
    ) -> Result<Option<String>, GenerationError> {
        self.calls.lock().unwrap().push(Call::Analyze {
            model: model.into(),
            prompt: prompt.into(),
            image: image_png.to_vec(),
        });

        self.analysis.clone().ok_or_else(|| GenerationError::Blocked("OTHER".into()))
    }

    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::GenerateImage { model: model.into(), prompt: prompt.into() });

        match &self.image {
            FakeImage::Images(images, text) => {
                Ok(GeneratedContent { images: images.clone(), text: text.clone() })
            }
            FakeImage::Fail => Err(GenerationError::NoCandidates),
        }
    }
}

pub fn config() -> Config {
    Config::from_lookup(|name| (name == "GEMINI_API_KEY").then(|| "test-key".into())).unwrap()
}

pub fn app_state(service: &Arc<FakeService>, image_capable: bool) -> AppState {
    let config = config();
    let strategy = if image_capable {
        Strategy::ImageCapable(service.clone())
    } else {
        Strategy::VisionOnly
    };

    AppState {
        generator: Arc::new(MemeGenerator::new(
            service.clone(),
            strategy,
            config.image_model,
            config.vision_model,
        )),
        pool: WorkerPool::new(4),
        api_configured: true,
    }
}
