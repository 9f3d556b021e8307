//! Metadata snapshot file I/O.
//!
//! The snapshot is a JSON object mapping share id to record. It is only ever
//! replaced whole: written to `<file>.tmp`, synced, then renamed over the real
//! file, so a reader never sees a partially written snapshot.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::cache::Record;
use crate::error::{Result, ShareError};

/// Id -> record, ordered so successive snapshots diff cleanly.
pub type Snapshot = BTreeMap<String, Record>;

/// Sibling temp path used for the atomic replace: `<file>.tmp`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("metadata"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Creates the parent directory of `path` if needed.
pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).await.map_err(|err| {
        ShareError::StorageInit(format!(
            "Failed to create metadata directory '{}': {}",
            parent.display(),
            err
        ))
    })
}

/// Reads a snapshot. Absent or blank files yield `Ok(None)`.
pub async fn read_snapshot(path: &Path) -> Result<Option<Snapshot>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(ShareError::Persistence(format!(
                "Failed to read '{}': {}",
                path.display(),
                err
            )))
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(&bytes).map(Some).map_err(|err| {
        ShareError::Persistence(format!("Failed to parse '{}': {}", path.display(), err))
    })
}

/// Serializes `snapshot` and atomically replaces the file at `path`.
pub async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_vec(snapshot)
        .map_err(|err| ShareError::Persistence(format!("Failed to serialize snapshot: {}", err)))?;

    let tmp = temp_path(path);
    let mut file = fs::File::create(&tmp).await.map_err(|err| {
        ShareError::Persistence(format!("Failed to create '{}': {}", tmp.display(), err))
    })?;
    file.write_all(&json).await.map_err(|err| {
        ShareError::Persistence(format!("Failed to write '{}': {}", tmp.display(), err))
    })?;
    file.sync_all().await.map_err(|err| {
        ShareError::Persistence(format!("Failed to sync '{}': {}", tmp.display(), err))
    })?;
    drop(file);

    fs::rename(&tmp, path).await.map_err(|err| {
        ShareError::Persistence(format!(
            "Failed to rename '{}' -> '{}': {}",
            tmp.display(),
            path.display(),
            err
        ))
    })
}
