//! Write-Behind Persistence Manager
//!
//! Owns the record cache and shadows it to a metadata snapshot file.
//!
//! Mutations touch memory only and raise the `dirty` flag. A single
//! background worker periodically copies the live entries under the shared
//! lock, clears `dirty` while still holding it, and writes the copy to disk
//! with no lock held. The flush interval is therefore the maximum window of
//! changes lost on a crash.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Duration as TtlDuration;
use serde::Serialize;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{BoundedTtlCache, CacheStats, Record};
use crate::clock::Clock;
use crate::error::Result;
use crate::persistence::snapshot::{self, Snapshot};
use crate::tasks::spawn_flush_task;

// == Persistence Config ==
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Snapshot file path
    pub metadata_file: PathBuf,
    /// Cache capacity
    pub max_entries: usize,
    /// Record lifetime measured from `created_at`
    pub ttl: TtlDuration,
    /// Period of the background flush
    pub flush_interval: Duration,
    /// Bound on each wait during `close`
    pub shutdown_timeout: Duration,
}

impl PersistenceConfig {
    pub fn new(metadata_file: impl Into<PathBuf>) -> Self {
        Self {
            metadata_file: metadata_file.into(),
            ..Self::default()
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            metadata_file: PathBuf::from("./data/shares_metadata.json"),
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            ttl: TtlDuration::hours(crate::cache::DEFAULT_TTL_HOURS),
            flush_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

// == Flush Outcome ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing changed since the last successful flush
    Clean,
    /// Snapshot with this many records replaced the file
    Written(usize),
    /// Write failed; `dirty` is re-armed for the next cycle
    Failed,
}

// == Persistence Stats ==
#[derive(Debug, Clone, Serialize)]
pub struct PersistenceStats {
    pub cache: CacheStats,
    pub live_entries: usize,
    pub flushes: u64,
    pub flush_failures: u64,
    pub dirty: bool,
}

// == Close Report ==
/// What happened during `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    /// Result of the final flush, `None` if it was abandoned at the timeout
    pub final_flush: Option<FlushOutcome>,
    /// Whether the flush worker had to be aborted
    pub worker_aborted: bool,
}

struct FlushScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

// == Persistence Manager ==
pub struct PersistenceManager {
    cache: RwLock<BoundedTtlCache>,
    /// Set by every mutation, cleared by the snapshot step of a flush
    dirty: AtomicBool,
    /// Serializes flushes so the timer and `close` never write concurrently
    flush_lock: Mutex<()>,
    metadata_file: PathBuf,
    ttl: TtlDuration,
    clock: Arc<dyn Clock>,
    shutdown_timeout: Duration,
    flushes: AtomicU64,
    flush_failures: AtomicU64,
    scheduler: StdMutex<Option<FlushScheduler>>,
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("metadata_file", &self.metadata_file)
            .field("dirty", &self.dirty.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl PersistenceManager {
    // == Open ==
    /// Hydrates from the snapshot file and starts the flush worker.
    ///
    /// Only failure to create the metadata directory is fatal; a missing,
    /// empty or corrupt snapshot starts an empty cache. Must be called from
    /// within a Tokio runtime.
    pub async fn open(config: PersistenceConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>> {
        snapshot::ensure_parent_dir(&config.metadata_file).await?;

        let manager = Arc::new(Self {
            cache: RwLock::new(BoundedTtlCache::new(config.max_entries, config.ttl)),
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
            metadata_file: config.metadata_file.clone(),
            ttl: config.ttl,
            clock,
            shutdown_timeout: config.shutdown_timeout,
            flushes: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            scheduler: StdMutex::new(None),
        });

        manager.hydrate().await;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = spawn_flush_task(Arc::downgrade(&manager), config.flush_interval, shutdown_rx);
        *manager.scheduler_slot() = Some(FlushScheduler { shutdown, handle });

        info!(
            metadata_file = %config.metadata_file.display(),
            flush_interval_secs = config.flush_interval.as_secs(),
            "persistent share storage ready"
        );
        Ok(manager)
    }

    async fn hydrate(&self) {
        let loaded = match snapshot::read_snapshot(&self.metadata_file).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                info!(metadata_file = %self.metadata_file.display(), "no metadata snapshot, starting empty");
                return;
            }
            Err(err) => {
                warn!(error = %err, "unreadable metadata snapshot, starting empty");
                return;
            }
        };

        let now = self.clock.now();
        let mut cache = self.cache.write().await;
        let (mut live, mut dropped) = (0usize, 0usize);

        for (id, mut record) in loaded {
            if record.id != id {
                record.id = id;
            }
            if !record.is_well_formed() || !record.is_live(now, self.ttl) {
                dropped += 1;
                continue;
            }
            cache.put(record, now);
            live += 1;
        }

        if dropped > 0 {
            self.mark_dirty();
        }
        info!(live, dropped, "hydrated share metadata from snapshot");
    }

    // == Mutations ==
    /// Inserts or overwrites a record. Memory only.
    pub async fn save(&self, record: Record) {
        let id = record.id.clone();
        let mut cache = self.cache.write().await;
        cache.put(record, self.clock.now());
        self.mark_dirty();
        debug!(id = %id, "saved share to cache");
    }

    /// Inserts only if no live record holds the id; gives the record back otherwise.
    pub async fn insert_vacant(&self, record: Record) -> std::result::Result<(), Record> {
        let mut cache = self.cache.write().await;
        cache.put_if_vacant(record, self.clock.now())?;
        self.mark_dirty();
        Ok(())
    }

    /// Increments the view count of a live record and returns the updated copy.
    pub async fn record_view(&self, id: &str) -> Option<Record> {
        let mut cache = self.cache.write().await;
        let record = cache.record_view(id, self.clock.now()).cloned()?;
        self.mark_dirty();
        Some(record)
    }

    /// Removes a record. Returns whether it was present.
    pub async fn invalidate(&self, id: &str) -> bool {
        let mut cache = self.cache.write().await;
        let removed = cache.invalidate(id);
        if removed {
            self.mark_dirty();
            debug!(id, "invalidated share");
        }
        removed
    }

    /// Drops every expired record from memory. Returns the number removed.
    pub async fn force_sweep(&self) -> usize {
        let mut cache = self.cache.write().await;
        let removed = cache.sweep(self.clock.now());
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    // == Reads ==
    /// Returns the record if it is live. Never touches disk.
    pub async fn get(&self, id: &str) -> Option<Record> {
        let cache = self.cache.read().await;
        cache.get(id, self.clock.now()).cloned()
    }

    pub async fn contains_live(&self, id: &str) -> bool {
        let cache = self.cache.read().await;
        cache.contains_live(id, self.clock.now())
    }

    /// Number of live records.
    pub async fn live_count(&self) -> usize {
        let cache = self.cache.read().await;
        cache.live_entries(self.clock.now()).count()
    }

    pub async fn stats(&self) -> PersistenceStats {
        let cache = self.cache.read().await;
        PersistenceStats {
            cache: cache.stats(),
            live_entries: cache.live_entries(self.clock.now()).count(),
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            dirty: self.is_dirty(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn metadata_file(&self) -> &Path {
        &self.metadata_file
    }

    /// Record lifetime.
    pub fn ttl(&self) -> TtlDuration {
        self.ttl
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // == Flush ==
    /// Writes the live records to the snapshot file if anything changed.
    ///
    /// Failures are logged and re-arm `dirty`; they are never surfaced to
    /// callers of the mutation or read methods.
    pub async fn flush_to_disk(&self) -> FlushOutcome {
        let _flushing = self.flush_lock.lock().await;

        if !self.is_dirty() {
            return FlushOutcome::Clean;
        }

        let snapshot: Snapshot = {
            let cache = self.cache.read().await;
            let now = self.clock.now();
            let snapshot = cache
                .live_entries(now)
                .map(|record| (record.id.clone(), record.clone()))
                .collect();
            // Writers are excluded while the read guard is held, so no
            // mutation can land between the copy and the clear.
            self.dirty.store(false, Ordering::Release);
            snapshot
        };

        let count = snapshot.len();
        match snapshot::write_snapshot(&self.metadata_file, &snapshot).await {
            Ok(()) => {
                self.flushes.fetch_add(1, Ordering::Relaxed);
                debug!(count, "flushed share metadata snapshot");
                FlushOutcome::Written(count)
            }
            Err(err) => {
                self.mark_dirty();
                self.flush_failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %err, "failed to flush share metadata, will retry next cycle");
                FlushOutcome::Failed
            }
        }
    }

    // == Close ==
    /// Runs a final flush, then stops the flush worker.
    ///
    /// Each wait is bounded by the shutdown timeout; work still running past
    /// it is abandoned. An abandoned flush leaves `dirty` set, so a later
    /// `close` or flush retries it. Calling `close` twice is harmless.
    pub async fn close(&self) -> CloseReport {
        let final_flush =
            match tokio::time::timeout(self.shutdown_timeout, self.flush_to_disk()).await {
                Ok(outcome) => {
                    if outcome == FlushOutcome::Failed {
                        warn!("final flush failed, recent changes are lost");
                    }
                    Some(outcome)
                }
                Err(_) => {
                    // The cancelled flush may already have cleared `dirty`.
                    self.mark_dirty();
                    warn!(
                        timeout_secs = self.shutdown_timeout.as_secs_f64(),
                        "final flush timed out"
                    );
                    None
                }
            };

        let mut worker_aborted = false;
        let scheduler = self.scheduler_slot().take();
        if let Some(FlushScheduler { shutdown, mut handle }) = scheduler {
            let _ = shutdown.send(true);
            if tokio::time::timeout(self.shutdown_timeout, &mut handle)
                .await
                .is_err()
            {
                handle.abort();
                self.mark_dirty();
                worker_aborted = true;
                warn!("flush worker did not stop in time, aborted");
            }
        }
        info!("persistent share storage closed");

        CloseReport {
            final_flush,
            worker_aborted,
        }
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn scheduler_slot(&self) -> std::sync::MutexGuard<'_, Option<FlushScheduler>> {
        self.scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
