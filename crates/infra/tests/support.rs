//! Shared helpers for infra integration tests.

use std::sync::Arc;

use harbor_infra::DbManager;
use tempfile::TempDir;

pub const TEST_KEY: &str = "test_key_64_chars_long_aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

pub struct TestDb {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

pub fn setup_db() -> TestDb {
    let _ = tracing_subscriber::fmt().with_env_filter("harbor_infra=debug").try_init();

    let temp_dir = TempDir::new().expect("temp dir created");
    let db_path = temp_dir.path().join("test.db");

    let manager = DbManager::new(&db_path, 4, Some(TEST_KEY)).expect("manager created");
    manager.run_migrations().expect("migrations applied");

    TestDb { manager: Arc::new(manager), _temp_dir: temp_dir }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Number of rows currently in the sync queue.
pub fn queue_len(manager: &DbManager) -> i64 {
    let conn = manager.get_connection().expect("connection acquired");
    conn.query_one("SELECT COUNT(*) FROM sync_queue", &[], |row| row.get(0))
        .expect("count query")
}

/// `(operation, retry_count, last_error)` for the queue entry of a record.
pub fn queue_state(manager: &DbManager, record_id: &str) -> Option<(String, i64, Option<String>)> {
    let conn = manager.get_connection().expect("connection acquired");
    conn.query_one_optional(
        "SELECT operation, retry_count, last_error FROM sync_queue WHERE record_id = ?1",
        &[&record_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .expect("queue state query")
}

/// Make every queued item immediately eligible, collapsing backoff windows
/// so tests do not have to sleep through them.
pub fn clear_backoff(manager: &DbManager) {
    let conn = manager.get_connection().expect("connection acquired");
    conn.execute("UPDATE sync_queue SET next_attempt_at = NULL", &[]).expect("clear backoff");
}

/// Pin a queue entry's enqueue time for deterministic FIFO assertions.
pub fn set_created_at(manager: &DbManager, record_id: &str, created_at: i64) {
    let conn = manager.get_connection().expect("connection acquired");
    conn.execute(
        "UPDATE sync_queue SET created_at = ?1 WHERE record_id = ?2",
        &[&created_at, &record_id],
    )
    .expect("set created_at");
}
