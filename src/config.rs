//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_HOURS};
use crate::persistence::PersistenceConfig;
use crate::share::{DEFAULT_ID_RETRIES, ID_SPACE};

/// Largest live-records to id-space ratio considered healthy for allocation.
pub const MAX_ID_SPACE_RATIO: f64 = 0.5;

/// Lower bound for `SHARE_TTL_HOURS`; the upper bound is one year.
pub const MIN_TTL_HOURS: i64 = 1;
/// Upper bound for `SHARE_TTL_HOURS`.
pub const MAX_TTL_HOURS: i64 = 24 * 365;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Metadata snapshot file
    pub metadata_file: PathBuf,
    /// Directory holding uploaded blobs
    pub storage_path: PathBuf,
    /// Maximum number of cached shares
    pub max_entries: usize,
    /// Share lifetime in hours
    pub ttl_hours: i64,
    /// Write-behind flush interval in seconds; also the crash loss window
    pub flush_interval: u64,
    /// Cleanup cycle interval in seconds
    pub cleanup_interval: u64,
    /// Bound on each shutdown wait in seconds
    pub shutdown_timeout: u64,
    /// Random share code attempts before the time-derived fallback
    pub id_retries: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Maximum accepted upload body in bytes
    pub max_upload_bytes: usize,
    /// Relink file shares with a lost blob location before hydration
    pub repair_metadata: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `METADATA_FILE` - Snapshot path (default: ./data/shares_metadata.json)
    /// - `STORAGE_PATH` - Blob directory (default: ./files)
    /// - `MAX_ENTRIES` - Maximum cached shares (default: 5000)
    /// - `SHARE_TTL_HOURS` - Share lifetime, 1 to 8760 (default: 24)
    /// - `FLUSH_INTERVAL` - Flush frequency in seconds (default: 30)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 300)
    /// - `SHUTDOWN_TIMEOUT` - Shutdown wait bound in seconds (default: 5)
    /// - `ID_RETRIES` - Share code attempts (default: 10)
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `MAX_UPLOAD_BYTES` - Upload size limit (default: 50 MiB)
    /// - `REPAIR_METADATA` - Run the blob relink pass at startup (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            metadata_file: env::var("METADATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_file),
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            ttl_hours: checked_ttl_hours(parse_var("SHARE_TTL_HOURS"), defaults.ttl_hours),
            flush_interval: parse_var("FLUSH_INTERVAL").unwrap_or(defaults.flush_interval),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            shutdown_timeout: parse_var("SHUTDOWN_TIMEOUT").unwrap_or(defaults.shutdown_timeout),
            id_retries: parse_var("ID_RETRIES").unwrap_or(defaults.id_retries),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            repair_metadata: parse_var("REPAIR_METADATA").unwrap_or(defaults.repair_metadata),
        }
    }

    /// Settings for the persistence manager.
    ///
    /// `ttl_hours` is clamped to `MIN_TTL_HOURS..=MAX_TTL_HOURS` here as
    /// well, since the field is public and may bypass `from_env`.
    pub fn persistence(&self) -> PersistenceConfig {
        let ttl_hours = self.ttl_hours.clamp(MIN_TTL_HOURS, MAX_TTL_HOURS);
        PersistenceConfig {
            metadata_file: self.metadata_file.clone(),
            max_entries: self.max_entries,
            ttl: chrono::Duration::hours(ttl_hours),
            flush_interval: Duration::from_secs(self.flush_interval),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout),
        }
    }

    /// Maximum live shares relative to the number of 4-digit codes.
    pub fn id_space_ratio(&self) -> f64 {
        self.max_entries as f64 / ID_SPACE as f64
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Keeps a configured TTL inside the accepted range, else uses `default`.
fn checked_ttl_hours(raw: Option<i64>, default: i64) -> i64 {
    match raw {
        None => default,
        Some(hours) if (MIN_TTL_HOURS..=MAX_TTL_HOURS).contains(&hours) => hours,
        Some(hours) => {
            warn!(
                ttl_hours = hours,
                default,
                "SHARE_TTL_HOURS must be between {} and {}, using default",
                MIN_TTL_HOURS,
                MAX_TTL_HOURS
            );
            default
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metadata_file: PathBuf::from("./data/shares_metadata.json"),
            storage_path: PathBuf::from("./files"),
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_hours: DEFAULT_TTL_HOURS,
            flush_interval: 30,
            cleanup_interval: 300,
            shutdown_timeout: 5,
            id_retries: DEFAULT_ID_RETRIES,
            server_port: 8080,
            max_upload_bytes: 50 * 1024 * 1024,
            repair_metadata: false,
        }
    }
}
