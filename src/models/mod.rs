//! Request and Response models for the share API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{parse_rich_text_flag, CreateTextRequest};
pub use responses::{CreateShareResponse, HealthResponse, ShareResponse, StatsResponse};
