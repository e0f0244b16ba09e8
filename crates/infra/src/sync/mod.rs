//! Sync infrastructure for Harbor.
//!
//! This module drains the durable mutation queue against the remote store:
//! - `SyncEngine`: one batch run - deletes before upserts, bounded retries,
//!   exponential backoff, fatal-abort semantics
//! - `SyncWorker`: periodic background trigger with explicit lifecycle
//! - `SupabaseClient`: PostgREST-style remote store client
//! - `SyncError`: error taxonomy driving retry decisions

pub mod engine;
pub mod errors;
pub mod supabase;
pub mod worker;

pub use engine::{RemoteStore, SyncEngine, SyncEngineConfig, SyncOutcome};
pub use errors::SyncError;
pub use supabase::{SupabaseClient, SupabaseConfig};
pub use worker::{SyncWorker, SyncWorkerConfig};
