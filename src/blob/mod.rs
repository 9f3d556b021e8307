//! Blob Module
//!
//! Storage for uploaded file payloads. Records only hold an opaque
//! `location` handle; blob storage is never transactional with metadata, so a
//! location may stop resolving at any time.

mod fs;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use fs::FsBlobStore;

// == Blob Meta ==
/// What blob storage reports back after storing a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMeta {
    /// Original file name as uploaded
    pub file_name: String,
    /// MIME type reported by the uploader
    pub content_type: Option<String>,
    /// Payload size in bytes
    pub size: u64,
    /// Opaque handle for `resolve`
    pub location: String,
}

/// A payload currently held by blob storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Handle accepted by `resolve`
    pub location: String,
    /// Payload size in bytes
    pub size: u64,
}

// == Blob Store ==
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Persists a payload under a fresh unique name.
    async fn store(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<BlobMeta>;

    /// Resolves a location to an existing file, or `None` if it is gone.
    async fn resolve(&self, location: &str) -> Option<PathBuf>;

    /// Deletes payloads older than `age`. Returns how many were removed.
    async fn purge_older_than(&self, age: Duration) -> usize;

    /// Every payload currently stored, in no particular order.
    async fn list(&self) -> Vec<StoredBlob>;
}
