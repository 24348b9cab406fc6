use std::sync::Arc;

use async_trait::async_trait;

use crate::apis::google_aistudio::GenerationError;
use crate::prompts;

const DEFAULT_SUBJECT: &str = "a person";
const FALLBACK_DESCRIPTION: &str = "Meme transformation generated";
const VISION_ONLY_DESCRIPTION: &str = "241543903 meme transformation concept";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GeneratedContent {
    pub images: Vec<Vec<u8>>,
    pub text: Option<String>,
}

#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Runs `prompt` against `image_png` on a vision model and returns the response text.
    async fn analyze(
        &self,
        model: &str,
        prompt: &str,
        image_png: &[u8],
    ) -> Result<Option<String>, GenerationError>;

    /// Asks an image model for image-only output.
    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedContent, GenerationError>;
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub generated_images: Vec<Vec<u8>>,
    pub description: Option<String>,
}

pub enum Strategy {
    ImageCapable(Arc<dyn GenerativeService>),
    VisionOnly,
}

impl Strategy {
    /// Picks the image-capable path when its client could be built.
    pub fn resolve<E: std::fmt::Display>(
        image_client: Result<Arc<dyn GenerativeService>, E>,
    ) -> Self {
        match image_client {
            Ok(service) => Self::ImageCapable(service),
            Err(err) => {
                log::warn!("could not initialize image generation client: {err}, using vision only");
                Self::VisionOnly
            }
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::ImageCapable(_) => "image generation",
            Self::VisionOnly => "vision only",
        }
    }
}

pub struct MemeGenerator {
    vision: Arc<dyn GenerativeService>,
    strategy: Strategy,
    pub image_model: String,
    pub vision_model: String,
}

impl MemeGenerator {
    pub fn new(
        vision: Arc<dyn GenerativeService>,
        strategy: Strategy,
        image_model: String,
        vision_model: String,
    ) -> Self {
        Self { vision, strategy, image_model, vision_model }
    }

    pub async fn generate(
        &self,
        image_png: &[u8],
        meme_prompt: &str,
        request_id: &str,
    ) -> Result<GenerationResult, GenerationError> {
        log::info!("[{request_id}] generating meme using {}", self.strategy.name());

        let Strategy::ImageCapable(image_service) = &self.strategy else {
            let description = self.vision.analyze(&self.vision_model, meme_prompt, image_png).await?;

            return Ok(GenerationResult {
                generated_images: Vec::new(),
                description: Some(description.unwrap_or_else(|| VISION_ONLY_DESCRIPTION.into())),
            });
        };

        let subject = self
            .vision
            .analyze(&self.vision_model, prompts::ANALYSIS_PROMPT, image_png)
            .await?
            .unwrap_or_else(|| DEFAULT_SUBJECT.into());
        log::info!("[{request_id}] image analysis: {}", preview(&subject, 200));

        let full_prompt = prompts::combined_prompt(meme_prompt, &subject);

        match image_service.generate_image(&self.image_model, &full_prompt).await {
            Ok(content) => {
                log::info!("[{request_id}] {} image(s) generated", content.images.len());
                Ok(GenerationResult { generated_images: content.images, description: content.text })
            }
            Err(err) => {
                log::warn!("[{request_id}] image generation failed: {err}, trying fallback");

                let description =
                    self.vision.analyze(&self.vision_model, &full_prompt, image_png).await?;

                Ok(GenerationResult {
                    generated_images: Vec::new(),
                    description: Some(description.unwrap_or_else(|| FALLBACK_DESCRIPTION.into())),
                })
            }
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}…", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
