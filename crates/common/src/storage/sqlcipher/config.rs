//! SQLCipher pool configuration.

use std::time::Duration;

/// Configuration for [`super::SqlCipherPool`].
#[derive(Debug, Clone)]
pub struct SqlCipherPoolConfig {
    /// Maximum pooled connections.
    pub max_size: u32,
    /// How long to wait for a free connection.
    pub connection_timeout: Duration,
    /// SQLite busy timeout applied to every connection, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Enable WAL journaling for concurrent readers.
    pub enable_wal: bool,
}

impl Default for SqlCipherPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(30),
            busy_timeout_ms: 5_000,
            enable_wal: true,
        }
    }
}
