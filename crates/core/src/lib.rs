//! # Harbor Core
//!
//! Ports and domain services for the Harbor sync core.
//!
//! This crate contains:
//! - Port traits implemented by `harbor-infra` (sync queue, row source,
//!   journal store)
//! - The domain-write service that encrypts sensitive fields before
//!   anything is persisted or queued
//!
//! ## Architecture
//! - Depends only on `harbor-domain` and `harbor-common`
//! - No I/O; all side effects live behind ports

pub mod journal;
pub mod sync;

// Re-export commonly used items
pub use journal::ports::JournalStore;
pub use journal::service::{
    CheckInDraft, CravingLogDraft, JournalEntryDraft, JournalService,
};
pub use sync::ports::{SyncQueue, SyncRowSource};
