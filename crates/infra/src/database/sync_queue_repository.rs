//! SQLCipher-backed implementation of the sync queue port.
//!
//! The queue SQL lives in free helpers that take a plain connection, so the
//! journal repository can run the same statements inside its own
//! transaction (domain write + enqueue commit together). This repository
//! wraps those helpers behind the async [`SyncQueue`] port for the sync
//! engine.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use harbor_core::SyncQueue as SyncQueuePort;
use harbor_domain::constants::{BASE_BACKOFF_MS, MAX_RETRY_COUNT};
use harbor_domain::{
    HarborError, Result as DomainResult, SyncOperation, SyncQueueItem, SyncTable,
};
use rusqlite::{Connection, Row, ToSql};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_storage_error, DbManager};

const QUEUE_COLUMNS: &str = "id, table_name, record_id, operation, remote_id, retry_count, \
                             last_error, created_at, next_attempt_at";

const QUEUE_ENQUEUE_SQL: &str = "INSERT INTO sync_queue (
        id, table_name, record_id, operation, remote_id, retry_count, last_error,
        created_at, next_attempt_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, NULL)
    ON CONFLICT (table_name, record_id) DO UPDATE SET
        operation = excluded.operation,
        remote_id = COALESCE(excluded.remote_id, sync_queue.remote_id),
        retry_count = 0,
        last_error = NULL,
        created_at = excluded.created_at,
        next_attempt_at = NULL";

/// Queue statements shared with the journal repository's transactions.
pub(crate) mod queue_sql {
    use super::{Connection, SyncOperation, SyncTable, ToSql, Uuid, QUEUE_ENQUEUE_SQL};

    /// Insert or supersede the pending entry for `(table, record_id)`.
    pub fn enqueue_upsert(
        conn: &Connection,
        table: SyncTable,
        record_id: &str,
        operation: SyncOperation,
        now_ms: i64,
    ) -> rusqlite::Result<()> {
        let id = Uuid::new_v4().to_string();
        let params: [&dyn ToSql; 6] = [
            &id,
            &table.as_str(),
            &record_id,
            &operation.as_str(),
            &None::<String>,
            &now_ms,
        ];
        conn.execute(QUEUE_ENQUEUE_SQL, params.as_slice()).map(|_| ())
    }

    /// Enqueue a delete carrying the captured remote id.
    ///
    /// A record that never synced (`remote_id` = `None`) has nothing to
    /// delete remotely: any pending entry is dropped and nothing is
    /// enqueued.
    pub fn enqueue_delete(
        conn: &Connection,
        table: SyncTable,
        record_id: &str,
        remote_id: Option<&str>,
        now_ms: i64,
    ) -> rusqlite::Result<()> {
        let Some(remote_id) = remote_id else {
            return drop_pending(conn, table, record_id);
        };

        let id = Uuid::new_v4().to_string();
        let params: [&dyn ToSql; 6] = [
            &id,
            &table.as_str(),
            &record_id,
            &SyncOperation::Delete.as_str(),
            &remote_id,
            &now_ms,
        ];
        conn.execute(QUEUE_ENQUEUE_SQL, params.as_slice()).map(|_| ())
    }

    /// Remove the pending entry for `(table, record_id)`, if any.
    pub fn drop_pending(
        conn: &Connection,
        table: SyncTable,
        record_id: &str,
    ) -> rusqlite::Result<()> {
        let params: [&dyn ToSql; 2] = [&table.as_str(), &record_id];
        conn.execute(
            "DELETE FROM sync_queue WHERE table_name = ?1 AND record_id = ?2",
            params.as_slice(),
        )
        .map(|_| ())
    }
}

/// SQLCipher-backed sync queue repository.
pub struct SqlCipherSyncQueueRepository {
    db: Arc<DbManager>,
}

impl SqlCipherSyncQueueRepository {
    /// Construct a repository backed by the shared SQLCipher manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncQueuePort for SqlCipherSyncQueueRepository {
    async fn enqueue_upsert(
        &self,
        table: SyncTable,
        record_id: &str,
        operation: SyncOperation,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let record_id = record_id.to_string();
        let now_ms = chrono::Utc::now().timestamp_millis();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            queue_sql::enqueue_upsert(&conn, table, &record_id, operation, now_ms)
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn enqueue_delete(
        &self,
        table: SyncTable,
        record_id: &str,
        remote_id: Option<String>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let record_id = record_id.to_string();
        let now_ms = chrono::Utc::now().timestamp_millis();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            queue_sql::enqueue_delete(&conn, table, &record_id, remote_id.as_deref(), now_ms)
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn next_batch(&self, limit: usize, now_ms: i64) -> DomainResult<Vec<SyncQueueItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let db = Arc::clone(&self.db);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncQueueItem>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {QUEUE_COLUMNS} FROM sync_queue
                 WHERE retry_count < ?1 AND (next_attempt_at IS NULL OR next_attempt_at <= ?2)
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?3"
            );
            let params: [&dyn ToSql; 3] = [&MAX_RETRY_COUNT, &now_ms, &limit];
            conn.query_all(&sql, params.as_slice(), map_queue_row).map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn record_failure(
        &self,
        item_id: &str,
        error_class: &str,
        now_ms: i64,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let item_id = item_id.to_string();
        let error_class = error_class.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            conn.with_transaction(|tx| {
                let params: [&dyn ToSql; 1] = [&item_id];
                let sql = format!("SELECT {QUEUE_COLUMNS} FROM sync_queue WHERE id = ?1");
                let mut item = tx
                    .query_row(&sql, params.as_slice(), map_queue_row)
                    .map_err(harbor_common::storage::StorageError::from)?;

                item.retry_count += 1;
                let next_attempt_at = item.backoff_until(BASE_BACKOFF_MS, now_ms);

                let params: [&dyn ToSql; 4] =
                    [&item.retry_count, &error_class, &next_attempt_at, &item_id];
                tx.execute(
                    "UPDATE sync_queue
                     SET retry_count = ?1, last_error = ?2, next_attempt_at = ?3
                     WHERE id = ?4",
                    params.as_slice(),
                )
                .map_err(harbor_common::storage::StorageError::from)?;
                Ok(())
            })
            .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn remove(&self, item_id: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let item_id = item_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let params: [&dyn ToSql; 1] = [&item_id];
            conn.execute("DELETE FROM sync_queue WHERE id = ?1", params.as_slice())
                .map(|_| ())
                .map_err(map_storage_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn exhausted_count(&self) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let params: [&dyn ToSql; 1] = [&MAX_RETRY_COUNT];
            let count: i64 = conn
                .query_one(
                    "SELECT COUNT(*) FROM sync_queue WHERE retry_count >= ?1",
                    params.as_slice(),
                    |row| row.get(0),
                )
                .map_err(map_storage_error)?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
        .map_err(map_join_error)?
    }
}

pub(crate) fn map_queue_row(row: &Row<'_>) -> rusqlite::Result<SyncQueueItem> {
    let table_raw: String = row.get(1)?;
    let operation_raw: String = row.get(3)?;

    let table = SyncTable::from_str(&table_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let operation = SyncOperation::from_str(&operation_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(SyncQueueItem {
        id: row.get(0)?,
        table,
        record_id: row.get(2)?,
        operation,
        remote_id: row.get(4)?,
        retry_count: row.get(5)?,
        last_error: row.get(6)?,
        created_at: row.get(7)?,
        next_attempt_at: row.get(8)?,
    })
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> HarborError {
    HarborError::Database(err.to_string())
}

pub(crate) fn map_join_error(err: task::JoinError) -> HarborError {
    if err.is_cancelled() {
        HarborError::Internal("database task cancelled".into())
    } else {
        HarborError::Internal(format!("database task panic: {err}"))
    }
}
