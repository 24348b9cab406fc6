use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ApiError;
use crate::extract::{self, MAX_BODY_SIZE};
use crate::generation::MemeGenerator;
use crate::image_utils;
use crate::prompts;
use crate::response::MemeResponse;
use crate::worker_pool::WorkerPool;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "POST, OPTIONS"),
    ("access-control-allow-headers", "*"),
];

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<MemeGenerator>,
    pub pool: WorkerPool,
    pub api_configured: bool,
}

/// Preflight `OPTIONS` requests are answered by the CORS layer with an empty body.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/generate-meme", post(generate_meme))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "241543903 Meme Generator - Heads in Freezers",
        "status": "running",
        "models": {
            "image_generation": state.generator.image_model,
            "vision": state.generator.vision_model,
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "image_model": state.generator.image_model,
        "vision_model": state.generator.vision_model,
        "api_configured": state.api_configured,
    }))
}

async fn generate_meme(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let request_id = format!("meme_{:08x}", rand::random::<u32>());
    log::info!("[{request_id}] received meme generation request");

    let input = extract::extract(request).await?;
    log::info!("[{request_id}] image size: {} bytes", input.image.len());

    image_utils::validate_size(&input.image)?;

    log::debug!("[{request_id}] {} workers available", state.pool.available());

    let image_png = state
        .pool
        .run_blocking({
            let request_id = request_id.clone();
            move || {
                let image = image_utils::normalize(&input.image).inspect_err(|err| {
                    log::error!("[{request_id}] failed to open image: {err}");
                })?;
                log::info!("[{request_id}] image opened: {}x{}", image.width(), image.height());
                image_utils::encode_png(&image)
            }
        })
        .await??;
    let image_png = Arc::new(image_png);

    let meme_prompt = prompts::build_prompt(input.prompt.as_deref().unwrap_or_default());

    let result = state
        .pool
        .run({
            let generator = state.generator.clone();
            let image_png = image_png.clone();
            let request_id = request_id.clone();
            async move { generator.generate(&image_png, &meme_prompt, &request_id).await }
        })
        .await
        .map_err(|err| ApiError::GenerationFailed(err.to_string()))?
        .map_err(|err| {
            log::error!("[{request_id}] generation failed: {err}");
            ApiError::GenerationFailed(err.to_string())
        })?;

    // the echoed original is built but not part of the response body
    let original = state.pool.run_blocking(move || image_utils::encode_base64(&image_png)).await?;
    log::debug!("[{request_id}] original image re-encoded: {} base64 bytes", original.len());

    let Some(image) = result.generated_images.first() else {
        return Err(ApiError::NoImageGenerated(result.description));
    };

    log::info!("[{request_id}] returning generated meme");

    Ok((CORS_HEADERS, Json(MemeResponse::png(image))).into_response())
}
