//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Flush: writes the share cache to the metadata snapshot (write-behind)
//! - Cleanup: purges expired blobs and sweeps expired shares

mod cleanup;
mod flush;

pub use cleanup::{spawn_cleanup_task, CleanupTrigger};
pub use flush::spawn_flush_task;
