//! API Handlers
//!
//! HTTP request handlers for each share endpoint.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, ShareError};
use crate::models::{
    parse_rich_text_flag, CreateShareResponse, CreateTextRequest, HealthResponse, ShareResponse,
    StatsResponse,
};
use crate::share::ShareService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Share operations backed by the persistence manager
    pub service: Arc<ShareService>,
    /// Maximum accepted upload body in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Creates a new AppState with the default upload limit.
    pub fn new(service: Arc<ShareService>) -> Self {
        Self {
            service,
            max_upload_bytes: Config::default().max_upload_bytes,
        }
    }

    /// Creates a new AppState using limits from the Config.
    pub fn from_config(service: Arc<ShareService>, config: &Config) -> Self {
        Self {
            service,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    fn present(&self, record: &crate::cache::Record) -> ShareResponse {
        ShareResponse::from_record(record, self.service.manager().ttl())
    }
}

/// Handler for POST /api/share/text
pub async fn create_text_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateTextRequest>,
) -> Result<Json<CreateShareResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ShareError::InvalidInput(error_msg));
    }

    let record = state
        .service
        .create_text(req.text_content, req.rich_text)
        .await?;

    Ok(Json(CreateShareResponse::new(state.present(&record))))
}

/// Handler for POST /api/share/file
///
/// Expects multipart fields `file` (required) and `richText` (optional).
pub async fn create_file_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CreateShareResponse>> {
    let mut upload = None;
    let mut rich_text = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ShareError::InvalidInput(format!("Malformed upload: {}", err)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| ShareError::InvalidInput(format!("Malformed upload: {}", err)))?;
                upload = Some((file_name, content_type, data));
            }
            Some("richText") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|err| ShareError::InvalidInput(format!("Malformed upload: {}", err)))?;
                rich_text = parse_rich_text_flag(&raw);
            }
            other => debug!(field = ?other, "ignoring unknown multipart field"),
        }
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| ShareError::InvalidInput("File cannot be empty".to_string()))?;

    let record = state
        .service
        .upload_file(&file_name, content_type.as_deref(), &data, rich_text)
        .await?;

    Ok(Json(CreateShareResponse::new(state.present(&record))))
}

/// Handler for GET /api/share/:id
///
/// Counts a view on success.
pub async fn get_share_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShareResponse>> {
    let record = state.service.fetch(&id).await?;
    Ok(Json(state.present(&record)))
}

/// Handler for GET /api/share/:id/download
pub async fn download_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let (record, path) = state.service.download(&id).await?;

    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        ShareError::Internal(format!("Failed to read blob for {}: {}", id, err))
    })?;

    let content_type = record
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let file_name = record.file_name().unwrap_or("download").replace(['"', '\\'], "_");
    let disposition = format!("attachment; filename=\"{}\"", file_name);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Handler for GET /api/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.service.manager().stats().await;
    Json(StatsResponse::new(stats, state.service.allocator().fallbacks()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
