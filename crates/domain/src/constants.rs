//! Domain constants shared by the sync queue and sync engine.

use std::time::Duration;

/// Maximum failed attempts before an item is parked for diagnosis.
pub const MAX_RETRY_COUNT: u32 = 3;

/// Maximum number of queue items processed per sync run.
pub const MAX_BATCH_SIZE: usize = 50;

/// Timeout applied to every remote store call.
pub const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Base delay for exponential retry backoff, in milliseconds.
pub const BASE_BACKOFF_MS: i64 = 1_000;

/// Interval between periodic sync runs while the network is reachable.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(300);
