//! Error types for the share service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Share Error Enum ==
/// Unified error type for the share service.
#[derive(Error, Debug)]
pub enum ShareError {
    /// Id never existed, expired, was evicted or invalidated
    #[error("Share not found or expired: {0}")]
    NotFound(String),

    /// Empty text, empty upload, or download of a text share
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// Record is file-backed but its blob no longer resolves
    #[error("File missing or deleted: {0}")]
    BlobMissing(String),

    /// Snapshot serialization or atomic replace failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Metadata directory could not be prepared at startup
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ShareError {
    fn into_response(self) -> Response {
        let status = match &self {
            ShareError::NotFound(_) | ShareError::BlobMissing(_) => StatusCode::NOT_FOUND,
            ShareError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ShareError::Persistence(_) | ShareError::StorageInit(_) | ShareError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "success": false,
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the share service.
pub type Result<T> = std::result::Result<T, ShareError>;
