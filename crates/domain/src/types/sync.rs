//! Sync queue types.
//!
//! A queue item records one pending mutation against a domain table. Items
//! are created in the same local transaction as the domain write they
//! describe, consumed by the sync engine, and deleted on confirmed remote
//! success. At most one pending item exists per `(table, record_id)` pair;
//! a newer mutation supersedes the pending entry instead of duplicating it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Raised when a persisted sync field cannot be parsed back into its enum.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sync {kind}: {value}")]
pub struct SyncFieldParseError {
    /// Which field failed to parse ("table" or "operation").
    pub kind: &'static str,
    /// The raw value found in storage.
    pub value: String,
}

/// The closed set of domain tables that participate in sync.
///
/// Dispatch over tables is exhaustive pattern matching; a table that is not
/// a member of this enum cannot be enqueued in the first place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    JournalEntries,
    CheckIns,
    CravingLogs,
}

impl SyncTable {
    /// All tables, in a stable order.
    pub const ALL: [SyncTable; 3] =
        [SyncTable::JournalEntries, SyncTable::CheckIns, SyncTable::CravingLogs];

    /// Canonical table name as persisted in the queue and used remotely.
    pub fn as_str(self) -> &'static str {
        match self {
            SyncTable::JournalEntries => "journal_entries",
            SyncTable::CheckIns => "check_ins",
            SyncTable::CravingLogs => "craving_logs",
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTable {
    type Err = SyncFieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "journal_entries" => Ok(SyncTable::JournalEntries),
            "check_ins" => Ok(SyncTable::CheckIns),
            "craving_logs" => Ok(SyncTable::CravingLogs),
            other => Err(SyncFieldParseError { kind: "table", value: other.to_string() }),
        }
    }
}

/// Mutation kind recorded in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Insert,
    Update,
    Delete,
}

impl SyncOperation {
    /// Canonical name as persisted in the queue.
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOperation::Insert => "insert",
            SyncOperation::Update => "update",
            SyncOperation::Delete => "delete",
        }
    }

    /// Whether this mutation removes the remote row.
    pub fn is_delete(self) -> bool {
        matches!(self, SyncOperation::Delete)
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = SyncFieldParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(SyncOperation::Insert),
            "update" => Ok(SyncOperation::Update),
            "delete" => Ok(SyncOperation::Delete),
            other => Err(SyncFieldParseError { kind: "operation", value: other.to_string() }),
        }
    }
}

/// One pending mutation awaiting transmission to the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Identifier of the queue entry itself (not the record it describes).
    pub id: String,
    /// Domain table the mutation targets.
    pub table: SyncTable,
    /// Local identifier of the affected record.
    pub record_id: String,
    /// Mutation kind.
    pub operation: SyncOperation,
    /// Remote identifier, captured at delete-enqueue time so a delete can
    /// still be sent after the local row is gone.
    pub remote_id: Option<String>,
    /// Failed attempts so far; monotone until the item is deleted.
    pub retry_count: u32,
    /// Sanitized class of the last failure. Never contains field values.
    pub last_error: Option<String>,
    /// Enqueue time in epoch milliseconds; defines FIFO order.
    pub created_at: i64,
    /// Earliest time the item is eligible again, epoch milliseconds.
    pub next_attempt_at: Option<i64>,
}

impl SyncQueueItem {
    /// Build a fresh upsert item for `(table, record_id)`.
    pub fn new_upsert(
        table: SyncTable,
        record_id: impl Into<String>,
        operation: SyncOperation,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            table,
            record_id: record_id.into(),
            operation,
            remote_id: None,
            retry_count: 0,
            last_error: None,
            created_at: now_ms,
            next_attempt_at: None,
        }
    }

    /// Build a fresh delete item carrying the captured remote identifier.
    pub fn new_delete(
        table: SyncTable,
        record_id: impl Into<String>,
        remote_id: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            table,
            record_id: record_id.into(),
            operation: SyncOperation::Delete,
            remote_id: Some(remote_id.into()),
            retry_count: 0,
            last_error: None,
            created_at: now_ms,
            next_attempt_at: None,
        }
    }

    /// Whether the item still has attempt budget left.
    pub fn can_retry(&self, max_retries: u32) -> bool {
        self.retry_count < max_retries
    }

    /// Next eligibility time after the attempt counted by `retry_count`.
    ///
    /// The delay doubles per attempt: `base * 2^(retry_count - 1)`, so the
    /// first failure waits one base period, the second two, the third four.
    /// The exponent is capped to keep the arithmetic safe for pathological
    /// counters.
    pub fn backoff_until(&self, base_backoff_ms: i64, now_ms: i64) -> i64 {
        let exp = self.retry_count.saturating_sub(1).min(16);
        let delay = base_backoff_ms.saturating_mul(1_i64 << exp);
        now_ms.saturating_add(delay)
    }
}

/// Aggregate counts produced by one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Items taken from the queue this run.
    pub processed: u32,
    /// Items confirmed remotely and removed from the queue.
    pub succeeded: u32,
    /// Items that failed and were re-queued (or exhausted their budget).
    pub failed: u32,
    /// Items dropped without a remote call (stale upsert, unsynced delete).
    pub skipped: u32,
}

#[cfg(test)]
mod tests {
    //! Unit tests for sync queue types.
    use super::*;

    #[test]
    fn table_round_trips_through_str() {
        for table in SyncTable::ALL {
            assert_eq!(table.as_str().parse::<SyncTable>(), Ok(table));
        }
    }

    #[test]
    fn unknown_table_fails_to_parse() {
        let err = "user_profiles".parse::<SyncTable>().unwrap_err();
        assert_eq!(err.kind, "table");
        assert_eq!(err.value, "user_profiles");
    }

    #[test]
    fn operation_round_trips_through_str() {
        for op in [SyncOperation::Insert, SyncOperation::Update, SyncOperation::Delete] {
            assert_eq!(op.as_str().parse::<SyncOperation>(), Ok(op));
        }
    }

    #[test]
    fn new_upsert_starts_with_zero_retries() {
        let item =
            SyncQueueItem::new_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert, 10);

        assert_eq!(item.retry_count, 0);
        assert!(item.last_error.is_none());
        assert!(item.next_attempt_at.is_none());
        assert_eq!(item.created_at, 10);
    }

    #[test]
    fn new_delete_carries_remote_id() {
        let item = SyncQueueItem::new_delete(SyncTable::CheckIns, "rec-2", "remote-2", 20);

        assert_eq!(item.operation, SyncOperation::Delete);
        assert_eq!(item.remote_id.as_deref(), Some("remote-2"));
    }

    #[test]
    fn can_retry_respects_cap() {
        let mut item =
            SyncQueueItem::new_upsert(SyncTable::CravingLogs, "rec-3", SyncOperation::Update, 0);

        assert!(item.can_retry(3));
        item.retry_count = 2;
        assert!(item.can_retry(3));
        item.retry_count = 3;
        assert!(!item.can_retry(3));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let mut item =
            SyncQueueItem::new_upsert(SyncTable::JournalEntries, "rec-4", SyncOperation::Insert, 0);

        item.retry_count = 1;
        assert_eq!(item.backoff_until(1_000, 0), 1_000);
        item.retry_count = 2;
        assert_eq!(item.backoff_until(1_000, 0), 2_000);
        item.retry_count = 3;
        assert_eq!(item.backoff_until(1_000, 0), 4_000);
    }

    #[test]
    fn backoff_is_offset_from_now() {
        let mut item =
            SyncQueueItem::new_upsert(SyncTable::JournalEntries, "rec-5", SyncOperation::Insert, 0);
        item.retry_count = 1;

        assert_eq!(item.backoff_until(1_000, 5_000), 6_000);
    }
}
