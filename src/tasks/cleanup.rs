//! Cleanup Task
//!
//! Periodically purges expired blobs and sweeps expired records from memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::blob::BlobStore;
use crate::persistence::PersistenceManager;

// == Cleanup Trigger ==
/// One cleanup cycle: blob purge followed by a cache sweep.
///
/// Both halves are idempotent and go through their own synchronization, so
/// overlapping cycles and concurrent share traffic are safe.
#[derive(Debug)]
pub struct CleanupTrigger {
    blobs: Arc<dyn BlobStore>,
    manager: Arc<PersistenceManager>,
}

impl CleanupTrigger {
    pub fn new(blobs: Arc<dyn BlobStore>, manager: Arc<PersistenceManager>) -> Self {
        Self { blobs, manager }
    }

    /// Runs one cycle. Returns the number of blobs purged.
    ///
    /// A TTL that is not a positive duration would make every blob look
    /// expired, so the blob purge is skipped and only the sweep runs.
    pub async fn run_cleanup_cycle(&self) -> usize {
        let purged = match self.manager.ttl().to_std() {
            Ok(max_age) if !max_age.is_zero() => self.blobs.purge_older_than(max_age).await,
            _ => {
                warn!(
                    ttl_secs = self.manager.ttl().num_seconds(),
                    "Cleanup: share TTL is not positive, skipping blob purge"
                );
                0
            }
        };
        let swept = self.manager.force_sweep().await;

        if purged > 0 || swept > 0 {
            info!("Cleanup: purged {} blobs, swept {} expired shares", purged, swept);
        } else {
            debug!("Cleanup: nothing expired");
        }
        purged
    }
}

/// Spawns a background task that runs a cleanup cycle every interval.
///
/// Returns a JoinHandle that can be aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cleanup_handle = spawn_cleanup_task(service.cleanup_trigger(), 300);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    trigger: Arc<CleanupTrigger>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;
            trigger.run_cleanup_cycle().await;
        }
    })
}
