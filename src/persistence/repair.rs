//! Metadata Repair
//!
//! Opt-in startup pass for file shares whose blob `location` was lost.
//! Hydration drops such records as malformed, so this runs first: each one is
//! relinked to an unreferenced stored blob of the same size, the original
//! snapshot is copied to `<file>.backup.<millis>`, and the repaired snapshot
//! replaces it.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::blob::BlobStore;
use crate::cache::RecordContent;
use crate::clock::Clock;
use crate::error::{Result, ShareError};
use crate::persistence::snapshot;

// == Repair Report ==
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// File shares given a blob location
    pub relinked: usize,
    /// File shares with no size match left among the stored blobs
    pub unmatched: usize,
    /// Copy of the snapshot taken before rewriting, if anything changed
    pub backup: Option<PathBuf>,
}

/// Backup path for a snapshot: `<file>.backup.<millis>`.
pub fn backup_path(path: &Path, millis: i64) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("metadata"));
    name.push(format!(".backup.{}", millis));
    path.with_file_name(name)
}

// == Relink ==
/// Relinks file shares with an empty location to stored blobs by size.
///
/// Blobs already referenced by another record are never reused, and each
/// blob is handed to at most one record. A missing snapshot is a no-op.
pub async fn relink_missing_blobs(
    metadata_file: &Path,
    blobs: &dyn BlobStore,
    clock: &dyn Clock,
) -> Result<RepairReport> {
    let Some(mut loaded) = snapshot::read_snapshot(metadata_file).await? else {
        info!("no metadata snapshot, nothing to repair");
        return Ok(RepairReport::default());
    };

    let referenced: HashSet<String> = loaded
        .values()
        .filter_map(|record| record.location())
        .filter(|location| !location.is_empty())
        .map(str::to_string)
        .collect();

    let mut candidates: Vec<_> = blobs
        .list()
        .await
        .into_iter()
        .filter(|blob| !referenced.contains(&blob.location))
        .collect();
    candidates.sort_by(|a, b| a.location.cmp(&b.location));

    let mut report = RepairReport::default();
    for record in loaded.values_mut() {
        let RecordContent::File {
            file_name,
            size,
            location,
            ..
        } = &mut record.content
        else {
            continue;
        };
        if !location.is_empty() {
            continue;
        }

        match candidates.iter().position(|blob| blob.size == *size) {
            Some(index) => {
                *location = candidates.remove(index).location;
                report.relinked += 1;
                info!(id = %record.id, location = %location, "relinked share to stored blob");
            }
            None => {
                report.unmatched += 1;
                warn!(id = %record.id, file_name = %file_name, size = *size, "no stored blob matches share");
            }
        }
    }

    if report.relinked == 0 {
        info!(unmatched = report.unmatched, "no share metadata needed repair");
        return Ok(report);
    }

    let backup = backup_path(metadata_file, clock.now().timestamp_millis());
    fs::copy(metadata_file, &backup).await.map_err(|err| {
        ShareError::Persistence(format!(
            "Failed to back up '{}' to '{}': {}",
            metadata_file.display(),
            backup.display(),
            err
        ))
    })?;
    snapshot::write_snapshot(metadata_file, &loaded).await?;

    info!(
        relinked = report.relinked,
        unmatched = report.unmatched,
        backup = %backup.display(),
        "repaired share metadata"
    );
    report.backup = Some(backup);
    Ok(report)
}
