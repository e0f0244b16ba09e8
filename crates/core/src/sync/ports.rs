//! Port interfaces for sync operations.

use async_trait::async_trait;
use harbor_domain::{Result, SyncOperation, SyncQueueItem, SyncTable};

/// Trait for the durable queue of pending mutations.
///
/// The domain-write path creates entries (through its repository, inside the
/// same transaction as the domain write); the sync engine consumes and
/// deletes them. No other component mutates the queue.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Insert or supersede the pending entry for `(table, record_id)`.
    ///
    /// A superseding enqueue resets the retry budget: the new mutation gets
    /// `retry_count = 0` and cleared failure bookkeeping.
    async fn enqueue_upsert(
        &self,
        table: SyncTable,
        record_id: &str,
        operation: SyncOperation,
    ) -> Result<()>;

    /// Enqueue a delete, capturing `remote_id` before the local row is gone.
    ///
    /// When `remote_id` is `None` the record never synced; any pending entry
    /// is dropped and nothing is enqueued.
    async fn enqueue_delete(
        &self,
        table: SyncTable,
        record_id: &str,
        remote_id: Option<String>,
    ) -> Result<()>;

    /// Up to `limit` eligible items, oldest first.
    ///
    /// Excludes items at or above the retry cap and items whose backoff
    /// window (`next_attempt_at`) extends past `now_ms`.
    async fn next_batch(&self, limit: usize, now_ms: i64) -> Result<Vec<SyncQueueItem>>;

    /// Record a failed attempt: bump `retry_count`, store the sanitized
    /// error class, schedule the next attempt with exponential backoff.
    async fn record_failure(&self, item_id: &str, error_class: &str, now_ms: i64) -> Result<()>;

    /// Delete an entry after confirmed remote success.
    async fn remove(&self, item_id: &str) -> Result<()>;

    /// Number of items parked at the retry cap, for passive UI display.
    async fn exhausted_count(&self) -> Result<u64>;
}

/// Loads the current local row as the upsert payload.
///
/// The queue row carries no payload; an upsert always transmits the latest
/// local state, so a superseded edit never resurrects stale data. Encrypted
/// fields pass through opaque - nothing is decrypted on this path.
#[async_trait]
pub trait SyncRowSource: Send + Sync {
    /// The remote-row JSON for `(table, record_id)`, or `None` when the
    /// local row no longer exists.
    async fn load_row(
        &self,
        table: SyncTable,
        record_id: &str,
    ) -> Result<Option<serde_json::Value>>;
}
