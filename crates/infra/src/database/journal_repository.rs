//! SQLCipher-backed journal store.
//!
//! Every mutation pairs the domain row write with its sync-queue entry in
//! one transaction, so a crash between the two cannot leave a row without
//! its pending mutation (or vice versa). Reads also serve the sync engine
//! through [`SyncRowSource`]: an upsert payload is always the latest local
//! row state, serialized with encrypted fields untouched.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use harbor_common::storage::StorageError;
use harbor_core::{JournalStore, SyncRowSource};
use harbor_domain::{
    CheckIn, CravingLog, HarborError, JournalEntry, Result as DomainResult, SyncOperation,
    SyncTable,
};
use rusqlite::{OptionalExtension, Row, ToSql, Transaction};
use tokio::task;

use super::manager::{map_storage_error, DbManager};
use super::sync_queue_repository::{map_join_error, queue_sql};

const JOURNAL_COLUMNS: &str = "id, remote_id, body, mood_score, created_at, updated_at";
const CHECK_IN_COLUMNS: &str =
    "id, remote_id, note, craving_level, checked_on, created_at, updated_at";
const CRAVING_COLUMNS: &str =
    "id, remote_id, intensity, trigger_note, coping_action, logged_at, created_at, updated_at";

/// SQLCipher-backed implementation of [`JournalStore`] and
/// [`SyncRowSource`].
pub struct SqlCipherJournalRepository {
    db: Arc<DbManager>,
}

impl SqlCipherJournalRepository {
    /// Construct a repository backed by the shared SQLCipher manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn blocking<T, F>(&self, f: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DbManager) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || f(&db)).await.map_err(map_join_error)?
    }
}

#[async_trait]
impl JournalStore for SqlCipherJournalRepository {
    async fn upsert_journal_entry(&self, entry: &JournalEntry) -> DomainResult<()> {
        let entry = entry.clone();
        let now_ms = Utc::now().timestamp_millis();

        self.blocking(move |db| {
            let mut conn = db.get_connection()?;
            conn.with_transaction(|tx| {
                let operation = upsert_operation(tx, "journal_entries", &entry.id)?;
                let params: [&dyn ToSql; 6] = [
                    &entry.id,
                    &entry.remote_id,
                    &entry.body,
                    &entry.mood_score,
                    &entry.created_at,
                    &entry.updated_at,
                ];
                tx.execute(
                    "INSERT OR REPLACE INTO journal_entries
                     (id, remote_id, body, mood_score, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params.as_slice(),
                )
                .map_err(StorageError::from)?;

                queue_sql::enqueue_upsert(
                    tx,
                    SyncTable::JournalEntries,
                    &entry.id,
                    operation,
                    now_ms,
                )
                .map_err(StorageError::from)?;
                Ok(())
            })
            .map_err(map_storage_error)
        })
        .await
    }

    async fn get_journal_entry(&self, id: &str) -> DomainResult<Option<JournalEntry>> {
        let id = id.to_string();
        self.blocking(move |db| {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {JOURNAL_COLUMNS} FROM journal_entries WHERE id = ?1");
            let params: [&dyn ToSql; 1] = [&id];
            conn.query_one_optional(&sql, params.as_slice(), map_journal_row)
                .map_err(map_storage_error)
        })
        .await
    }

    async fn list_journal_entries(&self) -> DomainResult<Vec<JournalEntry>> {
        self.blocking(move |db| {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {JOURNAL_COLUMNS} FROM journal_entries ORDER BY created_at DESC"
            );
            conn.query_all(&sql, &[], map_journal_row).map_err(map_storage_error)
        })
        .await
    }

    async fn delete_journal_entry(&self, id: &str) -> DomainResult<()> {
        let id = id.to_string();
        let now_ms = Utc::now().timestamp_millis();

        self.blocking(move |db| {
            let mut conn = db.get_connection()?;
            conn.with_transaction(|tx| {
                delete_row(tx, SyncTable::JournalEntries, "journal_entries", &id, now_ms)
            })
            .map_err(map_storage_error)
        })
        .await
    }

    async fn upsert_check_in(&self, check_in: &CheckIn) -> DomainResult<()> {
        let check_in = check_in.clone();
        let now_ms = Utc::now().timestamp_millis();

        self.blocking(move |db| {
            let mut conn = db.get_connection()?;
            conn.with_transaction(|tx| {
                let operation = upsert_operation(tx, "check_ins", &check_in.id)?;
                let params: [&dyn ToSql; 7] = [
                    &check_in.id,
                    &check_in.remote_id,
                    &check_in.note,
                    &check_in.craving_level,
                    &check_in.checked_on,
                    &check_in.created_at,
                    &check_in.updated_at,
                ];
                tx.execute(
                    "INSERT OR REPLACE INTO check_ins
                     (id, remote_id, note, craving_level, checked_on, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params.as_slice(),
                )
                .map_err(StorageError::from)?;

                queue_sql::enqueue_upsert(tx, SyncTable::CheckIns, &check_in.id, operation, now_ms)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .map_err(map_storage_error)
        })
        .await
    }

    async fn get_check_in(&self, id: &str) -> DomainResult<Option<CheckIn>> {
        let id = id.to_string();
        self.blocking(move |db| {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE id = ?1");
            let params: [&dyn ToSql; 1] = [&id];
            conn.query_one_optional(&sql, params.as_slice(), map_check_in_row)
                .map_err(map_storage_error)
        })
        .await
    }

    async fn delete_check_in(&self, id: &str) -> DomainResult<()> {
        let id = id.to_string();
        let now_ms = Utc::now().timestamp_millis();

        self.blocking(move |db| {
            let mut conn = db.get_connection()?;
            conn.with_transaction(|tx| delete_row(tx, SyncTable::CheckIns, "check_ins", &id, now_ms))
                .map_err(map_storage_error)
        })
        .await
    }

    async fn upsert_craving_log(&self, log: &CravingLog) -> DomainResult<()> {
        let log = log.clone();
        let now_ms = Utc::now().timestamp_millis();

        self.blocking(move |db| {
            let mut conn = db.get_connection()?;
            conn.with_transaction(|tx| {
                let operation = upsert_operation(tx, "craving_logs", &log.id)?;
                let params: [&dyn ToSql; 8] = [
                    &log.id,
                    &log.remote_id,
                    &log.intensity,
                    &log.trigger_note,
                    &log.coping_action,
                    &log.logged_at,
                    &log.created_at,
                    &log.updated_at,
                ];
                tx.execute(
                    "INSERT OR REPLACE INTO craving_logs
                     (id, remote_id, intensity, trigger_note, coping_action, logged_at,
                      created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params.as_slice(),
                )
                .map_err(StorageError::from)?;

                queue_sql::enqueue_upsert(tx, SyncTable::CravingLogs, &log.id, operation, now_ms)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .map_err(map_storage_error)
        })
        .await
    }

    async fn get_craving_log(&self, id: &str) -> DomainResult<Option<CravingLog>> {
        let id = id.to_string();
        self.blocking(move |db| {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {CRAVING_COLUMNS} FROM craving_logs WHERE id = ?1");
            let params: [&dyn ToSql; 1] = [&id];
            conn.query_one_optional(&sql, params.as_slice(), map_craving_row)
                .map_err(map_storage_error)
        })
        .await
    }

    async fn delete_craving_log(&self, id: &str) -> DomainResult<()> {
        let id = id.to_string();
        let now_ms = Utc::now().timestamp_millis();

        self.blocking(move |db| {
            let mut conn = db.get_connection()?;
            conn.with_transaction(|tx| {
                delete_row(tx, SyncTable::CravingLogs, "craving_logs", &id, now_ms)
            })
            .map_err(map_storage_error)
        })
        .await
    }
}

#[async_trait]
impl SyncRowSource for SqlCipherJournalRepository {
    async fn load_row(
        &self,
        table: SyncTable,
        record_id: &str,
    ) -> DomainResult<Option<serde_json::Value>> {
        let record_id = record_id.to_string();
        self.blocking(move |db| {
            let conn = db.get_connection()?;
            let params: [&dyn ToSql; 1] = [&record_id];

            let value = match table {
                SyncTable::JournalEntries => {
                    let sql =
                        format!("SELECT {JOURNAL_COLUMNS} FROM journal_entries WHERE id = ?1");
                    conn.query_one_optional(&sql, params.as_slice(), map_journal_row)
                        .map_err(map_storage_error)?
                        .map(|row| serde_json::to_value(row))
                }
                SyncTable::CheckIns => {
                    let sql = format!("SELECT {CHECK_IN_COLUMNS} FROM check_ins WHERE id = ?1");
                    conn.query_one_optional(&sql, params.as_slice(), map_check_in_row)
                        .map_err(map_storage_error)?
                        .map(|row| serde_json::to_value(row))
                }
                SyncTable::CravingLogs => {
                    let sql = format!("SELECT {CRAVING_COLUMNS} FROM craving_logs WHERE id = ?1");
                    conn.query_one_optional(&sql, params.as_slice(), map_craving_row)
                        .map_err(map_storage_error)?
                        .map(|row| serde_json::to_value(row))
                }
            };

            value
                .transpose()
                .map_err(|e| HarborError::Database(format!("row serialization failed: {e}")))
        })
        .await
    }
}

/// Pick insert vs update for the queue entry based on row existence.
fn upsert_operation(
    tx: &Transaction<'_>,
    table: &str,
    id: &str,
) -> Result<SyncOperation, StorageError> {
    let params: [&dyn ToSql; 1] = [&id];
    let exists: bool = tx
        .query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
            params.as_slice(),
            |row| row.get(0),
        )
        .map_err(StorageError::from)?;

    Ok(if exists { SyncOperation::Update } else { SyncOperation::Insert })
}

/// Remove a domain row and enqueue (or drop) its delete mutation.
fn delete_row(
    tx: &Transaction<'_>,
    sync_table: SyncTable,
    table: &str,
    id: &str,
    now_ms: i64,
) -> Result<(), StorageError> {
    let params: [&dyn ToSql; 1] = [&id];
    let remote_id: Option<Option<String>> = tx
        .query_row(
            &format!("SELECT remote_id FROM {table} WHERE id = ?1"),
            params.as_slice(),
            |row| row.get(0),
        )
        .optional()
        .map_err(StorageError::from)?;

    let Some(remote_id) = remote_id else {
        // Row already gone locally; make sure no stale mutation lingers.
        return queue_sql::drop_pending(tx, sync_table, id).map_err(StorageError::from);
    };

    tx.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params.as_slice())
        .map_err(StorageError::from)?;

    queue_sql::enqueue_delete(tx, sync_table, id, remote_id.as_deref(), now_ms)
        .map_err(StorageError::from)
}

fn map_journal_row(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        body: row.get(2)?,
        mood_score: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_check_in_row(row: &Row<'_>) -> rusqlite::Result<CheckIn> {
    Ok(CheckIn {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        note: row.get(2)?,
        craving_level: row.get(3)?,
        checked_on: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_craving_row(row: &Row<'_>) -> rusqlite::Result<CravingLog> {
    Ok(CravingLog {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        intensity: row.get(2)?,
        trigger_note: row.get(3)?,
        coping_action: row.get(4)?,
        logged_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
