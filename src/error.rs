use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::image_utils::ImageError;
use crate::worker_pool::WorkerError;

pub const NO_IMAGE_PROVIDED: &str = "No image provided. Use 'file' or 'imageData' parameter";

/// Errors surfaced to the caller as `{"detail": …, "error": …}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    GenerationFailed(String),
    NoImageGenerated(Option<String>),
    Unexpected(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::GenerationFailed(_) | Self::NoImageGenerated(_) | Self::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest(message) => f.write_str(message),
            Self::GenerationFailed(err) => write!(f, "Meme generation failed: {err}"),
            Self::NoImageGenerated(description) => write!(
                f,
                "No image was generated. {}",
                description.as_deref().unwrap_or("Unknown error")
            ),
            Self::Unexpected(err) => write!(f, "Error: {err}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ImageError> for ApiError {
    fn from(value: ImageError) -> Self {
        match value {
            ImageError::TooLarge(size) => {
                log::debug!("rejecting {size} byte upload");
                Self::BadRequest(value.to_string())
            }
            ImageError::Empty | ImageError::Decode(_) => Self::BadRequest(value.to_string()),
            ImageError::Encode(_) => Self::Unexpected(value.to_string()),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(value: WorkerError) -> Self {
        Self::Unexpected(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            log::error!("request failed: {detail} ({self:?})");
        } else {
            log::info!("request rejected: {detail}");
        }

        (status, Json(json!({ "detail": detail, "error": detail }))).into_response()
    }
}
