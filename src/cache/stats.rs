//! Cache Statistics Module
//!
//! Counters describing how entries leave the cache.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries evicted to stay under capacity
    pub evictions: u64,
    /// Expired entries removed by sweeps or capacity pressure
    pub expirations: u64,
    /// Entries removed explicitly
    pub invalidations: u64,
    /// Entries currently held (live or not yet swept)
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    /// Total entries that have left the cache for any reason.
    pub fn removed(&self) -> u64 {
        self.evictions + self.expirations + self.invalidations
    }
}
