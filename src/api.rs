use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{ResultExtractor, ScriptAssignmentExtractor};
use crate::relay::{RelayClient, RelayError};
use crate::upload::{self, StagedUpload};

#[derive(Clone)]
pub struct AppState {
    pub relay: RelayClient,
    pub extractor: Arc<dyn ResultExtractor>,
    pub upload_dir: Arc<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &Config) -> std::result::Result<Self, RelayError> {
        Ok(Self {
            relay: RelayClient::from_config(config)?,
            extractor: Arc::new(ScriptAssignmentExtractor),
            upload_dir: Arc::new(config.upload_dir.clone()),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub success: bool,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub fn app(config: &Config) -> std::result::Result<Router, RelayError> {
    Ok(router(AppState::new(config)?))
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/ocr", post(ocr_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn ocr_handler(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        log::debug!("Not a multipart upload: {}", rejection);
        Error::no_file()
    })?;

    let image = upload::read_image(&mut multipart).await?;
    log::info!(
        "Received {} ({}, {} bytes)",
        image.file_name,
        image.content_type,
        image.bytes.len()
    );

    // From here on the staged file is removed when `staged` goes out of scope,
    // including on the early returns below.
    let staged = StagedUpload::write(&state.upload_dir, &image).await?;
    let bytes = staged.read().await?;
    let page = state.relay.submit(&image.file_name, bytes).await?;
    let extracted = state.extractor.extract(&page);

    let path = staged.path().to_path_buf();
    if let Err(e) = staged.remove().await {
        log::warn!("Failed to remove staged upload {}: {}", path.display(), e);
    }

    Ok(Json(OcrResponse {
        success: true,
        text: extracted?,
    }))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} {} {:.3}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}
