//! SQLCipher connection pool.
//!
//! r2d2-based pooling over encrypted SQLite connections. Every connection
//! runs the key pragma and the standard pragmas before it is handed out,
//! and pool creation verifies that the key actually opens the database so
//! a wrong key surfaces as [`StorageError::WrongKeyOrNotEncrypted`] instead
//! of a later query failure.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection as RusqliteConnection;
use tracing::{debug, info, instrument, warn};

use super::config::SqlCipherPoolConfig;
use super::connection::SqlCipherConnection;
use crate::storage::error::{StorageError, StorageResult};

/// SQLCipher connection pool.
#[derive(Debug)]
pub struct SqlCipherPool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlCipherPoolConfig,
}

impl SqlCipherPool {
    /// Create a new pool over the database at `path`.
    #[instrument(skip(encryption_key), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn new(
        path: &Path,
        encryption_key: String,
        config: SqlCipherPoolConfig,
    ) -> StorageResult<Self> {
        info!("Creating SQLCipher connection pool");

        let init_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_cipher_key(conn, &encryption_key)
                .and_then(|()| apply_connection_pragmas(conn, &init_config))
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| classify_open_error(&e.to_string()))?;

        // Verify the key before handing the pool out.
        {
            let conn = pool.get().map_err(|e| classify_open_error(&e.to_string()))?;
            verify_encryption(&conn)?;
            debug!("Encryption verified successfully");
        }

        info!(max_connections = config.max_size, "SQLCipher pool created");

        Ok(Self { pool, config })
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> StorageResult<SqlCipherConnection> {
        match self.pool.get() {
            Ok(conn) => Ok(SqlCipherConnection::new(conn)),
            Err(e) => {
                let err_str = e.to_string().to_lowercase();
                if err_str.contains("timeout") || err_str.contains("timed out") {
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    warn!("Connection error: {}", e);
                    Err(StorageError::Connection(format!("Failed to get connection: {e}")))
                }
            }
        }
    }

    /// Maximum pool size.
    pub fn max_size(&self) -> u32 {
        self.config.max_size
    }
}

fn apply_cipher_key(conn: &RusqliteConnection, key: &str) -> StorageResult<()> {
    conn.pragma_update(None, "key", key).map_err(StorageError::from)
}

fn apply_connection_pragmas(
    conn: &RusqliteConnection,
    config: &SqlCipherPoolConfig,
) -> StorageResult<()> {
    conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    if config.enable_wal {
        // journal_mode returns the resulting mode as a row.
        let _mode: String =
            conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }

    Ok(())
}

/// Run a trivial query; a wrong key makes SQLCipher report the file as not
/// being a database.
fn verify_encryption(conn: &RusqliteConnection) -> StorageResult<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(|e| classify_open_error(&e.to_string()))
}

fn classify_open_error(message: &str) -> StorageError {
    let lowered = message.to_lowercase();
    if lowered.contains("file is not a database")
        || lowered.contains("file is encrypted")
        || lowered.contains("database disk image is malformed")
        || lowered.contains("notadb")
    {
        StorageError::WrongKeyOrNotEncrypted
    } else {
        StorageError::Connection(message.to_string())
    }
}
