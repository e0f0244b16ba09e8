//! Port interface for the journal store.
//!
//! Implementations must pair every mutation with its sync-queue bookkeeping
//! inside a single storage transaction: the domain row and the queue entry
//! commit together or not at all.

use async_trait::async_trait;
use harbor_domain::{CheckIn, CravingLog, JournalEntry, Result};

/// Persistence port for the recovery-journal tables.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Write (or replace) a journal entry and enqueue its sync mutation.
    async fn upsert_journal_entry(&self, entry: &JournalEntry) -> Result<()>;

    /// Fetch a journal entry by id.
    async fn get_journal_entry(&self, id: &str) -> Result<Option<JournalEntry>>;

    /// All journal entries, newest first.
    async fn list_journal_entries(&self) -> Result<Vec<JournalEntry>>;

    /// Remove a journal entry and enqueue (or drop) its delete mutation.
    async fn delete_journal_entry(&self, id: &str) -> Result<()>;

    /// Write (or replace) a check-in and enqueue its sync mutation.
    async fn upsert_check_in(&self, check_in: &CheckIn) -> Result<()>;

    /// Fetch a check-in by id.
    async fn get_check_in(&self, id: &str) -> Result<Option<CheckIn>>;

    /// Remove a check-in and enqueue (or drop) its delete mutation.
    async fn delete_check_in(&self, id: &str) -> Result<()>;

    /// Write (or replace) a craving log and enqueue its sync mutation.
    async fn upsert_craving_log(&self, log: &CravingLog) -> Result<()>;

    /// Fetch a craving log by id.
    async fn get_craving_log(&self, id: &str) -> Result<Option<CravingLog>>;

    /// Remove a craving log and enqueue (or drop) its delete mutation.
    async fn delete_craving_log(&self, id: &str) -> Result<()>;
}
