//! Periodic sync trigger with explicit lifecycle management.
//!
//! The worker is one of four trigger sources (periodic timer,
//! app-foreground, network-reconnect, manual); the other three call
//! [`crate::sync::SyncEngine::process_sync_queue`] directly. Join handles
//! are tracked, cancellation is explicit, and the engine's own in-flight
//! flag makes overlapping triggers harmless.

use std::sync::Arc;
use std::time::Duration;

use harbor_domain::constants::SYNC_INTERVAL;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::sync::engine::{SyncEngine, SyncOutcome};

/// Configuration for the sync worker.
#[derive(Debug, Clone)]
pub struct SyncWorkerConfig {
    /// Interval between periodic sync runs.
    pub poll_interval: Duration,
    /// Join timeout when stopping.
    pub join_timeout: Duration,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self { poll_interval: SYNC_INTERVAL, join_timeout: Duration::from_secs(5) }
    }
}

/// Background worker invoking the sync engine on a fixed interval.
pub struct SyncWorker {
    engine: Arc<SyncEngine>,
    config: SyncWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Create a new worker over a shared engine.
    pub fn new(engine: Arc<SyncEngine>, config: SyncWorkerConfig) -> Self {
        Self { engine, config, cancellation: CancellationToken::new(), task_handle: None }
    }

    /// Start the worker, spawning the background processing task.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), String> {
        if self.is_running() {
            return Err("Worker already running".to_string());
        }

        info!(interval_secs = self.config.poll_interval.as_secs(), "Starting sync worker");

        // Fresh token so the worker can be restarted after a stop.
        self.cancellation = CancellationToken::new();

        let engine = Arc::clone(&self.engine);
        let poll_interval = self.config.poll_interval;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::process_loop(engine, poll_interval, cancel).await;
        });

        self.task_handle = Some(handle);
        info!("Sync worker started");

        Ok(())
    }

    /// Stop the worker and wait for the processing task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), String> {
        if !self.is_running() {
            return Err("Worker not running".to_string());
        }

        info!("Stopping sync worker");

        self.cancellation.cancel();

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Worker task panicked: {}", e);
                    return Err("Worker task panicked".to_string());
                }
                Err(_) => {
                    warn!("Worker task did not complete within timeout");
                    return Err("Worker task timeout".to_string());
                }
            }
        }

        info!("Sync worker stopped");
        Ok(())
    }

    /// Returns true when a worker instance is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Background processing loop.
    async fn process_loop(
        engine: Arc<SyncEngine>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync worker process loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(poll_interval) => {
                    match engine.process_sync_queue().await {
                        Ok(SyncOutcome::Ran(report)) => {
                            debug!(
                                processed = report.processed,
                                succeeded = report.succeeded,
                                failed = report.failed,
                                skipped = report.skipped,
                                "periodic sync run completed"
                            );
                        }
                        Ok(SyncOutcome::AlreadyRunning) => {
                            debug!("periodic trigger skipped; run already in flight");
                        }
                        Err(e) => {
                            // Fatal failures are not retried faster than the
                            // next natural trigger.
                            error!(error = %e, "periodic sync run failed");
                        }
                    }
                }
            }
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncWorker dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
