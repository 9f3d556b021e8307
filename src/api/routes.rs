//! API Routes
//!
//! Configures the Axum router with all share endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_file_handler, create_text_handler, download_handler, get_share_handler,
    health_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /api/share/text` - Create a text share
/// - `POST /api/share/file` - Upload a file share (multipart)
/// - `GET /api/share/:id` - Fetch a share by code
/// - `GET /api/share/:id/download` - Download a file share
/// - `GET /api/stats` - Storage statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
/// - Body limit: uploads capped at `AppState::max_upload_bytes`
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/api/share/text", post(create_text_handler))
        .route("/api/share/file", post(create_file_handler))
        .route("/api/share/:id", get(get_share_handler))
        .route("/api/share/:id/download", get(download_handler))
        .route("/api/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
