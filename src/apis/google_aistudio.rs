use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::generation::{GeneratedContent, GenerativeService};
use crate::image_utils;

const IMAGE_MODALITY: &[&str] = &["IMAGE"];

pub enum GenerationError {
    Network(reqwest::Error),
    Url(url::ParseError),
    Google(Error),
    Blocked(String),
    NoCandidates,
    InvalidData(base64::DecodeError),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(err) => write!(f, "network error: {err}"),
            Self::Url(err) => write!(f, "invalid API URL: {err}"),
            Self::Google(err) => err.fmt(f),
            Self::Blocked(reason) => write!(f, "request blocked by Google: {reason}"),
            Self::NoCandidates => write!(f, "no response candidates returned"),
            Self::InvalidData(err) => write!(f, "invalid inline data: {err}"),
        }
    }
}

impl fmt::Debug for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(value: reqwest::Error) -> Self {
        Self::Network(value)
    }
}

impl From<url::ParseError> for GenerationError {
    fn from(value: url::ParseError) -> Self {
        Self::Url(value)
    }
}

impl From<base64::DecodeError> for GenerationError {
    fn from(value: base64::DecodeError) -> Self {
        Self::InvalidData(value)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: &'a [Part<'a>],
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part<'a> {
    Text(Cow<'a, str>),
    InlineData(Blob),
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: &'static str,
    pub data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: &'static [&'static str],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<ContentResponse>,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ContentResponse {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartResponse {
    pub text: Option<String>,
    pub inline_data: Option<BlobResponse>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobResponse {
    pub mime_type: String,
    pub data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ErrorResponse {
    pub error: Error,
}

#[derive(Deserialize)]
pub struct Error {
    pub code: u16,
    #[serde(default)]
    pub status: String,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Google error {}", self.code)?;
        if !self.status.is_empty() {
            write!(f, " ({})", self.status)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl GenerateContentResponse {
    fn check_blocked(&self) -> Result<(), GenerationError> {
        if let Some(block_reason) =
            self.prompt_feedback.as_ref().and_then(|feedback| feedback.block_reason.as_ref())
        {
            return Err(GenerationError::Blocked(block_reason.clone()));
        }

        Ok(())
    }

    fn parts(&self) -> impl Iterator<Item = &PartResponse> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .into_iter()
            .flat_map(|content| content.parts.iter())
            .filter(|part| !part.thought)
    }

    /// Concatenated text of the first candidate, `None` when it has no text parts.
    pub fn text(&self) -> Option<String> {
        let text =
            self.parts().filter_map(|part| part.text.as_deref()).collect::<Vec<_>>().concat();

        if text.is_empty() { None } else { Some(text) }
    }

    /// Inline images and the last text part of the first candidate.
    pub fn into_generated_content(self) -> Result<GeneratedContent, GenerationError> {
        self.check_blocked()?;

        if self.candidates.is_empty() {
            return Err(GenerationError::NoCandidates);
        }

        if let Some(finish_reason) = &self.candidates[0].finish_reason {
            log::debug!("generation finished: {finish_reason}");
        }

        let mut content = GeneratedContent::default();

        for part in self.parts() {
            if let Some(inline_data) = &part.inline_data {
                content.images.push(image_utils::decode_base64(&inline_data.data)?);
                log::debug!("received inline {} payload", inline_data.mime_type);
            } else if let Some(text) = part.text.as_ref().filter(|text| !text.is_empty()) {
                content.text = Some(text.clone());
            }
        }

        Ok(content)
    }
}

pub struct GoogleAiStudio {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleAiStudio {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let mut http_client = Client::builder();

        if let Some(user_agent) = &config.user_agent {
            http_client = http_client.user_agent(user_agent);
        }

        Ok(Self {
            http_client: http_client.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn generate_content(
        &self,
        model: &str,
        parts: &[Part<'_>],
        response_modalities: Option<&'static [&'static str]>,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = Url::parse_with_params(
            &format!("{}/v1beta/models/{model}:generateContent", self.base_url),
            [("key", &self.api_key)],
        )?;

        let response = self
            .http_client
            .post(url)
            .json(&GenerateContentRequest {
                contents: [Content { parts }],
                generation_config: response_modalities
                    .map(|response_modalities| GenerationConfig { response_modalities }),
            })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json().await?);
        }

        let is_json = response.headers().get(CONTENT_TYPE).is_some_and(|header| {
            header.to_str().is_ok_and(|header| header.starts_with("application/json"))
        });

        if is_json {
            Err(GenerationError::Google(response.json::<ErrorResponse>().await?.error))
        } else {
            Err(response.error_for_status().err().map_or(GenerationError::NoCandidates, Into::into))
        }
    }
}

#[async_trait]
impl GenerativeService for GoogleAiStudio {
    async fn analyze(
        &self,
        model: &str,
        prompt: &str,
        image_png: &[u8],
    ) -> Result<Option<String>, GenerationError> {
        let parts = [
            Part::Text(Cow::Borrowed(prompt)),
            Part::InlineData(Blob {
                mime_type: "image/png",
                data: image_utils::encode_base64(image_png),
            }),
        ];

        let response = self.generate_content(model, &parts, None).await?;
        response.check_blocked()?;

        Ok(response.text())
    }

    async fn generate_image(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        let parts = [Part::Text(Cow::Borrowed(prompt))];

        self.generate_content(model, &parts, Some(IMAGE_MODALITY)).await?.into_generated_content()
    }
}
