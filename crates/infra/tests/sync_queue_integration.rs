//! Integration tests for the SQLCipher sync queue repository.
//!
//! Covers the queue invariants: one pending entry per `(table, record_id)`
//! with supersede-on-conflict, FIFO batches, backoff gating, retry
//! exhaustion, and the never-synced delete edge case.

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use harbor_core::SyncQueue;
use harbor_domain::{SyncOperation, SyncTable};
use harbor_infra::SqlCipherSyncQueueRepository;

#[tokio::test(flavor = "multi_thread")]
async fn enqueue_is_unique_per_table_and_record() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert)
        .await
        .expect("first enqueue");
    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Update)
        .await
        .expect("second enqueue");

    assert_eq!(support::queue_len(&db.manager), 1);

    let (operation, retry_count, last_error) =
        support::queue_state(&db.manager, "rec-1").expect("entry exists");
    assert_eq!(operation, "update");
    assert_eq!(retry_count, 0);
    assert!(last_error.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn same_record_in_different_tables_queues_separately() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert)
        .await
        .expect("journal enqueue");
    repo.enqueue_upsert(SyncTable::CheckIns, "rec-1", SyncOperation::Insert)
        .await
        .expect("check-in enqueue");

    assert_eq!(support::queue_len(&db.manager), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn superseding_enqueue_resets_retry_bookkeeping() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert)
        .await
        .expect("enqueue");

    let now = support::now_ms();
    let batch = repo.next_batch(10, now).await.expect("batch");
    repo.record_failure(&batch[0].id, "server_error", now).await.expect("record failure");

    let (_, retry_count, last_error) =
        support::queue_state(&db.manager, "rec-1").expect("entry exists");
    assert_eq!(retry_count, 1);
    assert_eq!(last_error.as_deref(), Some("server_error"));

    // A fresh edit deserves a fresh attempt budget.
    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Update)
        .await
        .expect("superseding enqueue");

    let (_, retry_count, last_error) =
        support::queue_state(&db.manager, "rec-1").expect("entry exists");
    assert_eq!(retry_count, 0);
    assert!(last_error.is_none());

    // The backoff window went with the old attempt.
    let batch = repo.next_batch(10, now).await.expect("batch after supersede");
    assert_eq!(batch.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn next_batch_is_fifo_and_bounded() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    for record in ["rec-a", "rec-b", "rec-c"] {
        repo.enqueue_upsert(SyncTable::JournalEntries, record, SyncOperation::Insert)
            .await
            .expect("enqueue");
    }
    support::set_created_at(&db.manager, "rec-a", 1_000);
    support::set_created_at(&db.manager, "rec-b", 2_000);
    support::set_created_at(&db.manager, "rec-c", 3_000);

    let batch = repo.next_batch(2, support::now_ms()).await.expect("batch");

    let ids: Vec<_> = batch.iter().map(|item| item.record_id.as_str()).collect();
    assert_eq!(ids, vec!["rec-a", "rec-b"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn backoff_gates_eligibility_exponentially() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::CravingLogs, "rec-1", SyncOperation::Insert)
        .await
        .expect("enqueue");

    let t0 = 1_000_000;
    let batch = repo.next_batch(10, t0).await.expect("initial batch");
    let item_id = batch[0].id.clone();

    // First failure: eligible again after ~1s.
    repo.record_failure(&item_id, "network_timeout", t0).await.expect("failure 1");
    assert!(repo.next_batch(10, t0 + 999).await.expect("gated").is_empty());
    assert_eq!(repo.next_batch(10, t0 + 1_000).await.expect("due").len(), 1);

    // Second failure: ~2s.
    let t1 = t0 + 1_000;
    repo.record_failure(&item_id, "network_timeout", t1).await.expect("failure 2");
    assert!(repo.next_batch(10, t1 + 1_999).await.expect("gated").is_empty());
    assert_eq!(repo.next_batch(10, t1 + 2_000).await.expect("due").len(), 1);

    // Third failure exhausts the budget: excluded no matter how late.
    let t2 = t1 + 2_000;
    repo.record_failure(&item_id, "network_timeout", t2).await.expect("failure 3");
    assert!(repo.next_batch(10, i64::MAX).await.expect("exhausted").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_items_are_parked_not_deleted() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert)
        .await
        .expect("enqueue");

    let now = support::now_ms();
    let item_id = repo.next_batch(10, now).await.expect("batch")[0].id.clone();

    for _ in 0..3 {
        repo.record_failure(&item_id, "server_error", now).await.expect("failure");
    }

    // Excluded from batches but still present as a diagnostic artifact.
    assert!(repo.next_batch(10, i64::MAX).await.expect("batch").is_empty());
    assert_eq!(support::queue_len(&db.manager), 1);
    assert_eq!(repo.exhausted_count().await.expect("count"), 1);

    let (_, retry_count, _) = support::queue_state(&db.manager, "rec-1").expect("entry exists");
    assert_eq!(retry_count, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_enqueue_captures_remote_id() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_delete(SyncTable::CheckIns, "rec-1", Some("remote-1".to_string()))
        .await
        .expect("enqueue delete");

    let batch = repo.next_batch(10, support::now_ms()).await.expect("batch");
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].operation, SyncOperation::Delete);
    assert_eq!(batch[0].remote_id.as_deref(), Some("remote-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_of_never_synced_record_is_dropped() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    // Pending insert for a record that never reached the remote store.
    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert)
        .await
        .expect("enqueue insert");
    assert_eq!(support::queue_len(&db.manager), 1);

    // The delete removes the pending entry and enqueues nothing.
    repo.enqueue_delete(SyncTable::JournalEntries, "rec-1", None).await.expect("enqueue delete");
    assert_eq!(support::queue_len(&db.manager), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_supersedes_pending_upsert() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Update)
        .await
        .expect("enqueue update");
    repo.enqueue_delete(SyncTable::JournalEntries, "rec-1", Some("remote-1".to_string()))
        .await
        .expect("enqueue delete");

    assert_eq!(support::queue_len(&db.manager), 1);
    let (operation, _, _) = support::queue_state(&db.manager, "rec-1").expect("entry exists");
    assert_eq!(operation, "delete");
}

#[tokio::test(flavor = "multi_thread")]
async fn removed_items_are_gone() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert)
        .await
        .expect("enqueue");
    let item_id = repo.next_batch(10, support::now_ms()).await.expect("batch")[0].id.clone();

    repo.remove(&item_id).await.expect("remove");

    assert_eq!(support::queue_len(&db.manager), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_limit_returns_empty_batch() {
    let db = support::setup_db();
    let repo = SqlCipherSyncQueueRepository::new(db.manager.clone());

    repo.enqueue_upsert(SyncTable::JournalEntries, "rec-1", SyncOperation::Insert)
        .await
        .expect("enqueue");

    assert!(repo.next_batch(0, support::now_ms()).await.expect("batch").is_empty());
}
