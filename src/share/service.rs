//! Share Service
//!
//! The interface the request layer talks to: create text and file shares,
//! fetch them by code, resolve blobs for download, and run cleanup.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::blob::{BlobMeta, BlobStore};
use crate::cache::Record;
use crate::error::{Result, ShareError};
use crate::persistence::PersistenceManager;
use crate::share::IdAllocator;
use crate::tasks::CleanupTrigger;

#[derive(Debug)]
pub struct ShareService {
    manager: Arc<PersistenceManager>,
    allocator: IdAllocator,
    blobs: Arc<dyn BlobStore>,
    cleanup: Arc<CleanupTrigger>,
}

impl ShareService {
    pub fn new(
        manager: Arc<PersistenceManager>,
        allocator: IdAllocator,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let cleanup = Arc::new(CleanupTrigger::new(blobs.clone(), manager.clone()));
        Self {
            manager,
            allocator,
            blobs,
            cleanup,
        }
    }

    pub fn manager(&self) -> &Arc<PersistenceManager> {
        &self.manager
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    /// Trigger shared with the periodic cleanup task.
    pub fn cleanup_trigger(&self) -> Arc<CleanupTrigger> {
        self.cleanup.clone()
    }

    // == Create ==
    /// Creates a text share. Empty text is rejected.
    pub async fn create_text(&self, text: String, rich_text: bool) -> Result<Record> {
        if text.is_empty() {
            return Err(ShareError::InvalidInput("Text content cannot be empty".to_string()));
        }
        let now = self.manager.clock().now();
        let record = self
            .insert_new(|id| Record::text(id, text.clone(), rich_text, now))
            .await;

        info!(id = %record.id, chars = record.size(), "created text share");
        Ok(record)
    }

    /// Creates a file share for a blob that is already stored.
    pub async fn create_file(&self, blob: BlobMeta, rich_text: bool) -> Result<Record> {
        if blob.location.is_empty() || blob.size == 0 {
            return Err(ShareError::InvalidInput("File cannot be empty".to_string()));
        }
        let now = self.manager.clock().now();
        let record = self
            .insert_new(|id| Record::file(id, blob.clone(), rich_text, now))
            .await;

        info!(
            id = %record.id,
            file_name = record.file_name().unwrap_or_default(),
            size = record.size(),
            "created file share"
        );
        Ok(record)
    }

    /// Stores an uploaded payload in blob storage, then creates its share.
    pub async fn upload_file(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: &[u8],
        rich_text: bool,
    ) -> Result<Record> {
        if data.is_empty() {
            return Err(ShareError::InvalidInput("File cannot be empty".to_string()));
        }
        let blob = self.blobs.store(file_name, content_type, data).await?;
        self.create_file(blob, rich_text).await
    }

    async fn insert_new(&self, build: impl Fn(String) -> Record) -> Record {
        loop {
            let record = build(self.allocator.allocate().await);
            let created = record.clone();
            match self.manager.insert_vacant(record).await {
                Ok(()) => return created,
                // Another request claimed the id between allocation and insert.
                Err(lost) => warn!(id = %lost.id, "share id taken concurrently, reallocating"),
            }
        }
    }

    // == Fetch ==
    /// Returns a live share and counts the view.
    ///
    /// A file share whose blob no longer resolves is invalidated and
    /// reported as not found.
    pub async fn fetch(&self, id: &str) -> Result<Record> {
        let record = self
            .manager
            .get(id)
            .await
            .ok_or_else(|| ShareError::NotFound(id.to_string()))?;

        if let Some(location) = record.location() {
            if self.blobs.resolve(location).await.is_none() {
                self.manager.invalidate(id).await;
                warn!(id, location, "share references a missing blob, invalidated");
                return Err(ShareError::NotFound(id.to_string()));
            }
        }

        self.manager
            .record_view(id)
            .await
            .ok_or_else(|| ShareError::NotFound(id.to_string()))
    }

    // == Blob Path ==
    /// Resolves the blob behind a file share.
    pub async fn resolve_blob_path(&self, record: &Record) -> Result<PathBuf> {
        let location = record
            .location()
            .ok_or_else(|| ShareError::InvalidInput("Share is not a file".to_string()))?;

        match self.blobs.resolve(location).await {
            Some(path) => Ok(path),
            None => {
                self.manager.invalidate(&record.id).await;
                warn!(id = %record.id, location, "blob missing at download, invalidated");
                Err(ShareError::BlobMissing(record.id.clone()))
            }
        }
    }

    /// Fetches a file share and resolves its blob in one step.
    pub async fn download(&self, id: &str) -> Result<(Record, PathBuf)> {
        let record = self.fetch(id).await?;
        let path = self.resolve_blob_path(&record).await?;
        Ok((record, path))
    }

    // == Cleanup ==
    /// Purges expired blobs and sweeps the cache. Returns blobs purged.
    pub async fn run_cleanup_cycle(&self) -> usize {
        self.cleanup.run_cleanup_cycle().await
    }
}
