//! # Harbor Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Database implementations (SQLCipher repositories, schema management)
//! - The sync engine, its periodic worker, and the remote store client
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `harbor-core`
//! - Contains all "impure" code (I/O, network)

pub mod config;
pub mod database;
pub mod sync;

// Re-export commonly used items
pub use database::manager::DbManager;
pub use database::journal_repository::SqlCipherJournalRepository;
pub use database::sync_queue_repository::SqlCipherSyncQueueRepository;
pub use sync::engine::{RemoteStore, SyncEngine, SyncEngineConfig, SyncOutcome};
pub use sync::errors::SyncError;
pub use sync::supabase::{SupabaseClient, SupabaseConfig};
pub use sync::worker::{SyncWorker, SyncWorkerConfig};
