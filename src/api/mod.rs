//! API Module
//!
//! HTTP handlers and routing for the share service REST API.
//!
//! # Endpoints
//! - `POST /api/share/text` - Create a text share
//! - `POST /api/share/file` - Upload a file share
//! - `GET /api/share/:id` - Fetch a share by code
//! - `GET /api/share/:id/download` - Download a file share
//! - `GET /api/stats` - Storage statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
