//! File-system blob store.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::blob::{BlobMeta, BlobStore, StoredBlob};
use crate::error::{Result, ShareError};

// == Fs Blob Store ==
/// Keeps each payload as `<uuid><ext>` inside a single directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`. Relative roots are anchored at the
    /// current directory so stored locations stay valid if it changes later.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unique_name(file_name: &str) -> String {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        format!("{}{}", Uuid::new_v4(), extension)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<BlobMeta> {
        if data.is_empty() {
            return Err(ShareError::InvalidInput("File cannot be empty".to_string()));
        }

        fs::create_dir_all(&self.root).await.map_err(|err| {
            ShareError::Internal(format!(
                "Failed to create blob directory '{}': {}",
                self.root.display(),
                err
            ))
        })?;

        let path = self.root.join(Self::unique_name(file_name));
        fs::write(&path, data).await.map_err(|err| {
            ShareError::Internal(format!("Failed to write blob '{}': {}", path.display(), err))
        })?;

        info!(path = %path.display(), size = data.len(), "stored blob");

        Ok(BlobMeta {
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
            size: data.len() as u64,
            location: path.to_string_lossy().into_owned(),
        })
    }

    async fn resolve(&self, location: &str) -> Option<PathBuf> {
        if location.is_empty() {
            return None;
        }
        let path = PathBuf::from(location);
        if !path.starts_with(&self.root) {
            warn!(location, "blob location outside storage root");
            return None;
        }
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    async fn purge_older_than(&self, age: Duration) -> usize {
        let cutoff = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) => {
                debug!(root = %self.root.display(), error = %err, "blob directory not readable, nothing to purge");
                return 0;
            }
        };

        let mut deleted = 0;
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to list blob directory");
                    break;
                }
            };

            let stale = match entry.metadata().await {
                Ok(meta) => meta.is_file() && meta.modified().map_or(false, |m| m < cutoff),
                Err(_) => false,
            };
            if !stale {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    deleted += 1;
                    debug!(path = %entry.path().display(), "deleted expired blob");
                }
                Err(err) => warn!(path = %entry.path().display(), error = %err, "failed to delete expired blob"),
            }
        }
        deleted
    }

    async fn list(&self) -> Vec<StoredBlob> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) => {
                debug!(root = %self.root.display(), error = %err, "blob directory not readable, nothing listed");
                return Vec::new();
            }
        };

        let mut blobs = Vec::new();
        loop {
            let entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to list blob directory");
                    break;
                }
            };
            if let Ok(meta) = entry.metadata().await {
                if meta.is_file() {
                    blobs.push(StoredBlob {
                        location: entry.path().to_string_lossy().into_owned(),
                        size: meta.len(),
                    });
                }
            }
        }
        blobs
    }
}
