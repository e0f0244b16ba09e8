//! Batch processor draining the sync queue against the remote store.
//!
//! One engine value is constructed at process start and shared by every
//! trigger source (periodic timer, app-foreground, network-reconnect,
//! manual). All triggers funnel into [`SyncEngine::process_sync_queue`];
//! an in-flight flag makes redundant triggers safe no-ops, so at most one
//! batch run executes at a time. Domain writes may enqueue concurrently -
//! the queue table stays consistent because each write commits atomically
//! with its enqueue, and the engine simply picks new items up next run.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use harbor_core::{SyncQueue, SyncRowSource};
use harbor_domain::constants::{MAX_BATCH_SIZE, NETWORK_TIMEOUT};
use harbor_domain::{SyncQueueItem, SyncReport, SyncTable};
use tracing::{debug, error, info, instrument, warn};

use crate::sync::errors::SyncError;

/// Interface to the remote store.
///
/// Upserts must be keyed by the stable record id so a retried attempt that
/// already landed server-side does not create a duplicate row; deletes must
/// succeed when the remote row is already absent.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert-or-update one row.
    async fn upsert(&self, table: SyncTable, row: serde_json::Value) -> Result<(), SyncError>;

    /// Delete one row by its remote identifier.
    async fn delete(&self, table: SyncTable, remote_id: &str) -> Result<(), SyncError>;
}

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Maximum queue items fetched per run.
    pub batch_size: usize,
    /// Timeout applied to each remote call.
    pub network_timeout: std::time::Duration,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self { batch_size: MAX_BATCH_SIZE, network_timeout: NETWORK_TIMEOUT }
    }
}

/// Result of one trigger invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A batch run executed with the given counts.
    Ran(SyncReport),
    /// Another run was in flight; this trigger was a no-op.
    AlreadyRunning,
}

enum ItemOutcome {
    Succeeded,
    Skipped,
}

/// The batch sync engine.
pub struct SyncEngine {
    queue: Arc<dyn SyncQueue>,
    rows: Arc<dyn SyncRowSource>,
    remote: Arc<dyn RemoteStore>,
    config: SyncEngineConfig,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    /// Create an engine over the queue, row source, and remote store.
    pub fn new(
        queue: Arc<dyn SyncQueue>,
        rows: Arc<dyn SyncRowSource>,
        remote: Arc<dyn RemoteStore>,
        config: SyncEngineConfig,
    ) -> Self {
        Self { queue, rows, remote, config, in_flight: AtomicBool::new(false) }
    }

    /// Entry point shared by every trigger source.
    ///
    /// Returns [`SyncOutcome::AlreadyRunning`] without touching the queue
    /// when a run is in flight. A fatal error (auth rejected, remote
    /// unreachable) aborts the run: items already confirmed stay removed,
    /// the rest stay queued untouched.
    #[instrument(skip(self))]
    pub async fn process_sync_queue(&self) -> Result<SyncOutcome, SyncError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync run already in flight; trigger is a no-op");
            return Ok(SyncOutcome::AlreadyRunning);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let report = self.run_batch().await?;
        Ok(SyncOutcome::Ran(report))
    }

    async fn run_batch(&self) -> Result<SyncReport, SyncError> {
        let now_ms = Utc::now().timestamp_millis();
        let mut items = self.queue.next_batch(self.config.batch_size, now_ms).await?;

        if items.is_empty() {
            debug!("no pending items to process");
            return Ok(SyncReport::default());
        }

        // Deletes go first so a delete-then-recreate sequence cannot
        // resurrect a removed record; FIFO within each class.
        items.sort_by_key(|item| (!item.operation.is_delete(), item.created_at));

        info!(count = items.len(), "processing sync batch");

        let mut report = SyncReport::default();

        for item in items {
            report.processed += 1;

            match self.process_item(&item).await {
                Ok(ItemOutcome::Succeeded) => {
                    self.queue.remove(&item.id).await?;
                    report.succeeded += 1;
                }
                Ok(ItemOutcome::Skipped) => {
                    self.queue.remove(&item.id).await?;
                    report.skipped += 1;
                }
                Err(err) if err.is_fatal() => {
                    // The failing item keeps its retry budget; fatality says
                    // nothing about the item itself.
                    error!(
                        item_id = %item.id,
                        error = %err,
                        "fatal sync failure, aborting batch run"
                    );
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        item_id = %item.id,
                        table = %item.table,
                        error_class = err.error_class(),
                        "sync item failed"
                    );
                    let failed_at = Utc::now().timestamp_millis();
                    self.queue.record_failure(&item.id, err.error_class(), failed_at).await?;
                    report.failed += 1;
                }
            }
        }

        debug!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "sync batch completed"
        );

        Ok(report)
    }

    async fn process_item(&self, item: &SyncQueueItem) -> Result<ItemOutcome, SyncError> {
        if item.operation.is_delete() {
            let Some(remote_id) = item.remote_id.as_deref() else {
                // Never synced; nothing to delete remotely.
                warn!(item_id = %item.id, "delete item without remote id, dropping");
                return Ok(ItemOutcome::Skipped);
            };
            self.with_timeout(self.remote.delete(item.table, remote_id)).await?;
        } else {
            let Some(row) = self.rows.load_row(item.table, &item.record_id).await? else {
                // Local row vanished without a superseding delete entry.
                warn!(item_id = %item.id, "upsert item without local row, dropping");
                return Ok(ItemOutcome::Skipped);
            };
            self.with_timeout(self.remote.upsert(item.table, row)).await?;
        }

        Ok(ItemOutcome::Succeeded)
    }

    async fn with_timeout<F>(&self, call: F) -> Result<(), SyncError>
    where
        F: Future<Output = Result<(), SyncError>>,
    {
        tokio::time::timeout(self.config.network_timeout, call)
            .await
            .map_err(|_| SyncError::Timeout(self.config.network_timeout))?
    }

    /// Number of items parked at the retry cap, for passive UI display.
    pub async fn exhausted_count(&self) -> Result<u64, SyncError> {
        Ok(self.queue.exhausted_count().await?)
    }
}
