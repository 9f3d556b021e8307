//! Identifier Allocator
//!
//! Hands out short numeric share codes that no live record currently uses.
//!
//! # Collision budget
//! Codes are 4 digits, a space of 10 000. With `L` live records a random
//! candidate collides with probability `L / 10 000`, so all `r` retries
//! collide with probability `(L / 10 000)^r`. The service caps live records
//! at half the space (see `Config::id_space_ratio`), which with 10 retries
//! bounds the fallback rate at about one allocation in a thousand when the
//! cache is completely full, and far lower at typical loads.
//!
//! When every retry collides the allocator falls back to an id derived from
//! the current time in milliseconds. Fallback ids are longer than normal codes
//! but allocation always terminates and never errors.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::{debug, warn};

use crate::persistence::PersistenceManager;

// == Public Constants ==
/// Number of digits in a normal share code
pub const ID_LENGTH: usize = 4;

/// Number of distinct normal share codes
pub const ID_SPACE: u32 = 10_000;

/// Default number of random candidates tried before the fallback
pub const DEFAULT_ID_RETRIES: usize = 10;

// == Candidate Source ==
/// Produces candidate share codes.
pub trait CandidateSource: Send + Sync + std::fmt::Debug {
    fn candidate(&self) -> String;
}

/// Uniformly random zero-padded 4-digit codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDigits;

impl CandidateSource for RandomDigits {
    fn candidate(&self) -> String {
        let n = rand::thread_rng().gen_range(0..ID_SPACE);
        format!("{:0width$}", n, width = ID_LENGTH)
    }
}

/// Replays a fixed list of candidates, then repeats the last one.
///
/// Test seam for deterministic share codes; the server always uses
/// [`RandomDigits`]. Once the list runs dry the last code repeats, which
/// lets a test force every retry to collide.
#[derive(Debug, Default)]
pub struct ScriptedCandidates {
    queue: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl ScriptedCandidates {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(candidates.into_iter().map(Into::into).collect()),
            last: Mutex::new("0000".to_string()),
        }
    }
}

impl CandidateSource for ScriptedCandidates {
    fn candidate(&self) -> String {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = next {
            *last = next;
        }
        last.clone()
    }
}

// == Id Allocator ==
#[derive(Debug)]
pub struct IdAllocator {
    manager: Arc<PersistenceManager>,
    source: Box<dyn CandidateSource>,
    retries: usize,
    fallbacks: AtomicU64,
}

impl IdAllocator {
    /// Random 4-digit codes with `retries` attempts (at least one).
    pub fn new(manager: Arc<PersistenceManager>, retries: usize) -> Self {
        Self::with_source(manager, retries, RandomDigits)
    }

    pub fn with_source(
        manager: Arc<PersistenceManager>,
        retries: usize,
        source: impl CandidateSource + 'static,
    ) -> Self {
        Self {
            manager,
            source: Box::new(source),
            retries: retries.max(1),
            fallbacks: AtomicU64::new(0),
        }
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Number of allocations that needed the time-derived fallback.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    // == Allocate ==
    /// Returns an id with no live record behind it at the time of the check.
    ///
    /// The check and the later insert are not atomic; use
    /// `PersistenceManager::insert_vacant` to claim the id.
    pub async fn allocate(&self) -> String {
        for attempt in 1..=self.retries {
            let candidate = self.source.candidate();
            if !self.manager.contains_live(&candidate).await {
                return candidate;
            }
            debug!(attempt, candidate = %candidate, "share id collision");
        }

        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        let id = self.fallback().await;
        warn!(
            retries = self.retries,
            id = %id,
            "share id space congested, using time-derived id"
        );
        id
    }

    async fn fallback(&self) -> String {
        let base = self.manager.clock().now().timestamp_millis().to_string();
        if !self.manager.contains_live(&base).await {
            return base;
        }
        // Only live records can block a suffix, so this ends after at most
        // one more step than there are live records.
        let mut suffix: u64 = 1;
        loop {
            let candidate = format!("{base}{suffix}");
            if !self.manager.contains_live(&candidate).await {
                return candidate;
            }
            suffix += 1;
        }
    }
}
