//! Persistence Module
//!
//! Write-behind shadow of the record cache on local disk.

mod manager;
pub mod repair;
pub mod snapshot;

pub use manager::{
    CloseReport, FlushOutcome, PersistenceConfig, PersistenceManager, PersistenceStats,
};
pub use repair::{relink_missing_blobs, RepairReport};
pub use snapshot::Snapshot;
