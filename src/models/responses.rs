//! Response DTOs for the share API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::Record;
use crate::persistence::PersistenceStats;

/// A share as presented to clients. The blob location stays server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub share_id: String,
    pub is_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub size: u64,
    pub rich_text: bool,
    pub create_time: DateTime<Utc>,
    pub expire_time: DateTime<Utc>,
    pub view_count: u64,
}

impl ShareResponse {
    pub fn from_record(record: &Record, ttl: chrono::Duration) -> Self {
        Self {
            share_id: record.id.clone(),
            is_file: record.is_file(),
            text_content: record.text_content().map(str::to_string),
            file_name: record.file_name().map(str::to_string),
            content_type: record.content_type().map(str::to_string),
            size: record.size(),
            rich_text: record.rich_text,
            create_time: record.created_at,
            expire_time: record.expires_at(ttl),
            view_count: record.view_count,
        }
    }
}

/// Response body for share creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareResponse {
    pub success: bool,
    pub share_id: String,
    pub share: ShareResponse,
}

impl CreateShareResponse {
    pub fn new(share: ShareResponse) -> Self {
        Self {
            success: true,
            share_id: share.share_id.clone(),
            share,
        }
    }
}

/// Response body for the stats endpoint (GET /api/stats)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub live_shares: usize,
    pub total_entries: usize,
    pub evictions: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub flushes: u64,
    pub flush_failures: u64,
    pub pending_flush: bool,
    pub id_fallbacks: u64,
}

impl StatsResponse {
    pub fn new(stats: PersistenceStats, id_fallbacks: u64) -> Self {
        Self {
            live_shares: stats.live_entries,
            total_entries: stats.cache.total_entries,
            evictions: stats.cache.evictions,
            expirations: stats.cache.expirations,
            invalidations: stats.cache.invalidations,
            flushes: stats.flushes,
            flush_failures: stats.flush_failures,
            pending_flush: stats.dirty,
            id_fallbacks,
        }
    }
}

/// Response body for the health check endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status
    pub status: String,
}

impl HealthResponse {
    /// Creates a healthy status response
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}
