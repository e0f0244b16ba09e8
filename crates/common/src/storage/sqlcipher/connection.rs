//! SQLCipher connection wrapper.
//!
//! Exposes the storage contract used by repositories: `query_all`,
//! `query_one` (plus an optional-row variant), `execute`, and
//! `with_transaction`. The connection returns to the pool when dropped.

use std::ops::{Deref, DerefMut};

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{
    Connection as RusqliteConnection, OptionalExtension, Row, ToSql,
    Transaction as RusqliteTransaction,
};
use tracing::instrument;

use crate::storage::error::{StorageError, StorageResult};

/// Pooled SQLCipher connection.
pub struct SqlCipherConnection {
    inner: PooledConnection<SqliteConnectionManager>,
}

impl SqlCipherConnection {
    /// Wrap a pooled connection.
    pub fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self { inner: conn }
    }

    /// Execute a SQL statement that returns no rows.
    #[instrument(skip(self, params), fields(sql = %sql))]
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> StorageResult<usize> {
        self.inner.execute(sql, params).map_err(StorageError::from)
    }

    /// Run a query expected to return exactly one row.
    #[instrument(skip(self, params, f), fields(sql = %sql))]
    pub fn query_one<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> StorageResult<T>
    where
        F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        self.inner.query_row(sql, params, f).map_err(StorageError::from)
    }

    /// Run a query returning one row or none.
    #[instrument(skip(self, params, f), fields(sql = %sql))]
    pub fn query_one_optional<T, F>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        f: F,
    ) -> StorageResult<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        self.inner.query_row(sql, params, f).optional().map_err(StorageError::from)
    }

    /// Run a query and collect every row through the mapper.
    #[instrument(skip(self, params, f), fields(sql = %sql))]
    pub fn query_all<T, F>(&self, sql: &str, params: &[&dyn ToSql], mut f: F) -> StorageResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
    {
        let mut stmt = self.inner.prepare(sql)?;
        let rows = stmt.query_map(params, |row| f(row))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StorageError::from)
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`; any `Err` (or panic) rolls the
    /// transaction back before propagating, so a multi-statement write
    /// either lands completely or not at all.
    #[instrument(skip(self, f))]
    pub fn with_transaction<T, F>(&mut self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&RusqliteTransaction<'_>) -> StorageResult<T>,
    {
        let tx = self
            .inner
            .transaction()
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(|e| StorageError::TransactionFailed(e.to_string()))?;
                Ok(value)
            }
            // Dropping the transaction rolls it back.
            Err(e) => Err(e),
        }
    }
}

// Allow using SqlCipherConnection as RusqliteConnection
impl Deref for SqlCipherConnection {
    type Target = RusqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for SqlCipherConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
