//! Cache Module
//!
//! In-memory index of share records with age-based expiry and a capacity bound.

mod lru;
mod record;
mod stats;
mod store;


// Re-export public types
pub use lru::LruTracker;
pub use record::{Record, RecordContent};
pub use stats::CacheStats;
pub use store::BoundedTtlCache;

// == Public Constants ==
/// Default record lifetime in hours
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Default maximum number of cached records
pub const DEFAULT_MAX_ENTRIES: usize = 5000;
