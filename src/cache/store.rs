//! Cache Store Module
//!
//! Bounded in-memory index of records with age-based expiry.
//!
//! # Eviction policy
//! When a put of a new id would exceed `max_entries`, expired entries are
//! swept first; if the cache is still full, the least recently written or
//! viewed entry is evicted. Plain reads through [`BoundedTtlCache::get`] do
//! not update recency (they run under a shared lock), so the policy is LRU
//! over writes and views, an approximation of true LRU.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::cache::{CacheStats, LruTracker, Record};

// == Bounded TTL Cache ==
#[derive(Debug)]
pub struct BoundedTtlCache {
    /// Id -> record
    entries: HashMap<String, Record>,
    /// Recency order for capacity eviction
    lru: LruTracker,
    stats: CacheStats,
    max_entries: usize,
    ttl: Duration,
}

impl BoundedTtlCache {
    // == Constructor ==
    /// Creates an empty cache. A zero capacity is treated as one.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Put ==
    /// Inserts or overwrites the record stored under `record.id`.
    ///
    /// Never fails. Overwriting a live entry keeps the earlier `created_at`,
    /// so re-saving a record can not extend its life. Returns the id evicted
    /// to make room, if any.
    pub fn put(&mut self, mut record: Record, now: DateTime<Utc>) -> Option<String> {
        let existing_live = self
            .entries
            .get(&record.id)
            .filter(|existing| existing.is_live(now, self.ttl));

        if let Some(existing) = existing_live {
            if existing.created_at < record.created_at {
                record.created_at = existing.created_at;
            }
        }

        let mut evicted = None;
        if !self.entries.contains_key(&record.id) && self.entries.len() >= self.max_entries {
            if self.sweep(now) == 0 {
                evicted = self.evict_lru();
            }
        }

        let id = record.id.clone();
        self.entries.insert(id.clone(), record);
        self.lru.touch(&id);
        self.stats.set_total_entries(self.entries.len());

        evicted
    }

    /// Inserts only if no live entry holds the id. Gives the record back otherwise.
    pub fn put_if_vacant(
        &mut self,
        record: Record,
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<String>, Record> {
        if self.contains_live(&record.id, now) {
            return Err(record);
        }
        // An expired entry under the same id belongs to an earlier share.
        if self.entries.remove(&record.id).is_some() {
            self.lru.remove(&record.id);
            self.stats.record_expirations(1);
        }
        Ok(self.put(record, now))
    }

    // == Get ==
    /// Returns the record if present and live at `now`.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Option<&Record> {
        self.entries
            .get(id)
            .filter(|record| record.is_live(now, self.ttl))
    }

    pub fn contains_live(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.get(id, now).is_some()
    }

    // == Record View ==
    /// Increments the view count of a live record and marks it recently used.
    pub fn record_view(&mut self, id: &str, now: DateTime<Utc>) -> Option<&Record> {
        let ttl = self.ttl;
        let record = self
            .entries
            .get_mut(id)
            .filter(|record| record.is_live(now, ttl))?;
        record.view_count += 1;
        self.lru.touch(id);
        self.entries.get(id)
    }

    // == Invalidate ==
    /// Removes an entry unconditionally. Returns whether anything was removed.
    pub fn invalidate(&mut self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.lru.remove(id);
            self.stats.record_invalidation();
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Sweep ==
    /// Removes every entry expired at `now`. Returns the number removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, record)| !record.is_live(now, ttl))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.entries.remove(id);
            self.lru.remove(id);
        }

        let count = expired.len();
        if count > 0 {
            debug!(count, "swept expired cache entries");
        }
        self.stats.record_expirations(count);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Live Snapshot ==
    /// Iterates over entries that are live at `now`.
    pub fn live_entries(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Record> {
        let ttl = self.ttl;
        self.entries
            .values()
            .filter(move |record| record.is_live(now, ttl))
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_lru(&mut self) -> Option<String> {
        let victim = self.lru.evict_oldest()?;
        self.entries.remove(&victim);
        self.stats.record_eviction();
        warn!(id = %victim, max_entries = self.max_entries, "cache full, evicted least recently used share");
        Some(victim)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 24;

    fn ttl() -> Duration {
        Duration::hours(DAY)
    }

    fn text(id: &str, created_at: DateTime<Utc>) -> Record {
        Record::text(id, format!("body of {id}"), false, created_at)
    }

    #[test]
    fn test_cache_new() {
        let cache = BoundedTtlCache::new(100, ttl());
        assert!(cache.is_empty());
        assert_eq!(cache.max_entries(), 100);
        assert_eq!(cache.ttl(), ttl());
    }

    #[test]
    fn test_put_and_get() {
        let now = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());

        assert_eq!(cache.put(text("0007", now), now), None);

        let record = cache.get("0007", now).unwrap();
        assert_eq!(record.text_content(), Some("body of 0007"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_absent() {
        let cache = BoundedTtlCache::new(100, ttl());
        assert!(cache.get("9999", Utc::now()).is_none());
    }

    #[test]
    fn test_get_checks_expiry_without_sweep() {
        let t0 = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());
        cache.put(text("0001", t0), t0);

        assert!(cache.get("0001", t0 + Duration::hours(23)).is_some());
        assert!(cache.get("0001", t0 + Duration::hours(25)).is_none());
        assert_eq!(cache.len(), 1, "expired entry stays until swept");
    }

    #[test]
    fn test_resave_does_not_extend_life() {
        let t0 = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());
        cache.put(text("0001", t0), t0);

        let later = t0 + Duration::hours(20);
        let mut updated = cache.get("0001", later).unwrap().clone();
        updated.view_count = 5;
        updated.created_at = later;
        cache.put(updated, later);

        let stored = cache.get("0001", later).unwrap();
        assert_eq!(stored.created_at, t0);
        assert_eq!(stored.view_count, 5);
        assert!(cache.get("0001", t0 + Duration::hours(24)).is_none());
    }

    #[test]
    fn test_put_over_expired_entry_starts_new_life() {
        let t0 = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());
        cache.put(text("0001", t0), t0);

        let later = t0 + Duration::hours(30);
        cache.put(text("0001", later), later);

        assert_eq!(cache.get("0001", later).unwrap().created_at, later);
    }

    #[test]
    fn test_put_if_vacant() {
        let t0 = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());

        assert!(cache.put_if_vacant(text("0001", t0), t0).is_ok());
        let rejected = cache.put_if_vacant(text("0001", t0), t0).unwrap_err();
        assert_eq!(rejected.id, "0001");

        let later = t0 + Duration::hours(25);
        assert!(cache.put_if_vacant(text("0001", later), later).is_ok());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_record_view_increments() {
        let now = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());
        cache.put(text("0007", now), now);

        assert_eq!(cache.record_view("0007", now).unwrap().view_count, 1);
        assert_eq!(cache.record_view("0007", now).unwrap().view_count, 2);
        assert!(cache.record_view("0007", now + Duration::hours(25)).is_none());
        assert!(cache.record_view("nope", now).is_none());
    }

    #[test]
    fn test_invalidate() {
        let now = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());
        cache.put(text("0001", now), now);

        assert!(cache.invalidate("0001"));
        assert!(!cache.invalidate("0001"));
        assert!(cache.get("0001", now).is_none());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let t0 = Utc::now();
        let mut cache = BoundedTtlCache::new(100, ttl());
        cache.put(text("old", t0), t0);
        cache.put(text("new", t0 + Duration::hours(10)), t0 + Duration::hours(10));

        let now = t0 + Duration::hours(24);
        assert_eq!(cache.sweep(now), 1);
        assert_eq!(cache.sweep(now), 0);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new", now).is_some());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_capacity_evicts_least_recently_written() {
        let now = Utc::now();
        let mut cache = BoundedTtlCache::new(3, ttl());
        cache.put(text("a", now), now);
        cache.put(text("b", now), now);
        cache.put(text("c", now), now);

        assert_eq!(cache.put(text("d", now), now), Some("a".to_string()));
        assert_eq!(cache.len(), 3);
        assert!(cache.get("a", now).is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_capacity_view_protects_entry() {
        let now = Utc::now();
        let mut cache = BoundedTtlCache::new(3, ttl());
        cache.put(text("a", now), now);
        cache.put(text("b", now), now);
        cache.put(text("c", now), now);
        cache.record_view("a", now);

        assert_eq!(cache.put(text("d", now), now), Some("b".to_string()));
        assert!(cache.get("a", now).is_some());
    }

    #[test]
    fn test_capacity_prefers_dropping_expired() {
        let t0 = Utc::now();
        let mut cache = BoundedTtlCache::new(2, ttl());
        cache.put(text("fresh", t0 + Duration::hours(20)), t0 + Duration::hours(20));
        cache.put(text("stale", t0), t0);

        let now = t0 + Duration::hours(25);
        assert_eq!(cache.put(text("new", now), now), None);
        assert!(cache.get("fresh", now).is_some());
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let now = Utc::now();
        let mut cache = BoundedTtlCache::new(2, ttl());
        cache.put(text("a", now), now);
        cache.put(text("b", now), now);

        assert_eq!(cache.put(text("a", now), now), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_live_entries_filters_expired() {
        let t0 = Utc::now();
        let mut cache = BoundedTtlCache::new(10, ttl());
        cache.put(text("old", t0), t0);
        cache.put(text("new", t0 + Duration::hours(12)), t0 + Duration::hours(12));

        let ids: Vec<&str> = cache
            .live_entries(t0 + Duration::hours(30))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["new"]);
    }
}
