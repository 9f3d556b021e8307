//! Quickshare - short-lived text and file sharing
//!
//! Shares live for 24 hours in a bounded in-memory cache that is written
//! behind to a metadata snapshot on disk and hydrated from it on startup.

pub mod api;
pub mod blob;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod share;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{Result, ShareError};
pub use persistence::{PersistenceConfig, PersistenceManager};
pub use share::{IdAllocator, ShareService};
pub use tasks::{spawn_cleanup_task, CleanupTrigger};
