//! Application configuration.
//!
//! Secrets are deliberately absent: the database encryption key and the
//! remote service key live in the platform secret store, not in files or
//! environment variables.

pub mod loader;

use serde::{Deserialize, Serialize};

use harbor_domain::constants::{BASE_BACKOFF_MS, MAX_BATCH_SIZE, MAX_RETRY_COUNT, SYNC_INTERVAL};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncSettings,
}

/// Local database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path.
    pub path: String,
    /// Connection pool size.
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "harbor.db".to_string(), pool_size: 4 }
    }
}

/// Remote store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote store.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:54321".to_string(), timeout_secs: 30 }
    }
}

/// Sync engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Seconds between periodic sync runs.
    pub interval_secs: u64,
    /// Maximum queue items per batch.
    pub batch_size: usize,
    /// Failed attempts before an item is parked.
    pub max_retries: u32,
    /// Base backoff delay in milliseconds.
    pub base_backoff_ms: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval_secs: SYNC_INTERVAL.as_secs(),
            batch_size: MAX_BATCH_SIZE,
            max_retries: MAX_RETRY_COUNT,
            base_backoff_ms: BASE_BACKOFF_MS,
        }
    }
}
