//! Domain-write service for the recovery journal.
//!
//! Sensitive fields are encrypted here, before the store or the sync queue
//! ever see them. Encryption failures are not caught: the save itself
//! fails, which is what keeps plaintext personal-recovery content from
//! being persisted or queued. The store below receives only opaque
//! `iv:ciphertext` strings.

use std::sync::Arc;

use chrono::Utc;
use harbor_common::crypto::{CryptoError, EncryptionService};
use harbor_domain::{CheckIn, CravingLog, HarborError, JournalEntry, Result};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::journal::ports::JournalStore;

/// Plaintext input for a new or edited journal entry.
#[derive(Debug, Clone)]
pub struct JournalEntryDraft {
    /// Free-text body; encrypted before persistence.
    pub body: String,
    /// Self-reported mood, 1-10.
    pub mood_score: Option<i32>,
}

/// Plaintext input for a daily check-in.
#[derive(Debug, Clone)]
pub struct CheckInDraft {
    /// Optional note; encrypted before persistence.
    pub note: Option<String>,
    /// Self-reported craving intensity, 0-10.
    pub craving_level: i32,
    /// Civil date the check-in covers, `YYYY-MM-DD`.
    pub checked_on: String,
}

/// Plaintext input for a craving log.
#[derive(Debug, Clone)]
pub struct CravingLogDraft {
    /// Craving intensity, 0-10.
    pub intensity: i32,
    /// What triggered the craving; encrypted before persistence.
    pub trigger_note: Option<String>,
    /// What the user did about it; encrypted before persistence.
    pub coping_action: Option<String>,
    /// When the craving happened, epoch milliseconds.
    pub logged_at: i64,
}

/// Service coordinating encryption and journal persistence.
pub struct JournalService {
    store: Arc<dyn JournalStore>,
    crypto: Arc<EncryptionService>,
}

impl JournalService {
    /// Create the service over a store and a ready encryption service.
    pub fn new(store: Arc<dyn JournalStore>, crypto: Arc<EncryptionService>) -> Self {
        Self { store, crypto }
    }

    /// Create and persist a new journal entry.
    #[instrument(skip(self, draft))]
    pub async fn save_journal_entry(&self, draft: JournalEntryDraft) -> Result<JournalEntry> {
        let now = Utc::now().timestamp_millis();
        let id = Uuid::new_v4().to_string();

        let entry = JournalEntry {
            remote_id: Some(id.clone()),
            id,
            body: self.encrypt(&draft.body)?,
            mood_score: draft.mood_score,
            created_at: now,
            updated_at: now,
        };

        self.store.upsert_journal_entry(&entry).await?;
        debug!(entry_id = %entry.id, "journal entry saved");
        Ok(entry)
    }

    /// Re-encrypt and persist an edit to an existing journal entry.
    #[instrument(skip(self, draft))]
    pub async fn update_journal_entry(
        &self,
        id: &str,
        draft: JournalEntryDraft,
    ) -> Result<JournalEntry> {
        let existing = self
            .store
            .get_journal_entry(id)
            .await?
            .ok_or_else(|| HarborError::NotFound(format!("journal entry {id}")))?;

        let entry = JournalEntry {
            body: self.encrypt(&draft.body)?,
            mood_score: draft.mood_score,
            updated_at: Utc::now().timestamp_millis(),
            ..existing
        };

        self.store.upsert_journal_entry(&entry).await?;
        Ok(entry)
    }

    /// Delete a journal entry.
    #[instrument(skip(self))]
    pub async fn delete_journal_entry(&self, id: &str) -> Result<()> {
        self.store.delete_journal_entry(id).await
    }

    /// Fetch a journal entry; the body stays encrypted.
    pub async fn get_journal_entry(&self, id: &str) -> Result<Option<JournalEntry>> {
        self.store.get_journal_entry(id).await
    }

    /// Create and persist a daily check-in.
    #[instrument(skip(self, draft))]
    pub async fn save_check_in(&self, draft: CheckInDraft) -> Result<CheckIn> {
        let now = Utc::now().timestamp_millis();
        let id = Uuid::new_v4().to_string();

        let check_in = CheckIn {
            remote_id: Some(id.clone()),
            id,
            note: draft.note.as_deref().map(|n| self.encrypt(n)).transpose()?,
            craving_level: draft.craving_level,
            checked_on: draft.checked_on,
            created_at: now,
            updated_at: now,
        };

        self.store.upsert_check_in(&check_in).await?;
        debug!(check_in_id = %check_in.id, "check-in saved");
        Ok(check_in)
    }

    /// Delete a check-in.
    pub async fn delete_check_in(&self, id: &str) -> Result<()> {
        self.store.delete_check_in(id).await
    }

    /// Create and persist a craving log.
    #[instrument(skip(self, draft))]
    pub async fn save_craving_log(&self, draft: CravingLogDraft) -> Result<CravingLog> {
        let now = Utc::now().timestamp_millis();
        let id = Uuid::new_v4().to_string();

        let log = CravingLog {
            remote_id: Some(id.clone()),
            id,
            intensity: draft.intensity,
            trigger_note: draft.trigger_note.as_deref().map(|n| self.encrypt(n)).transpose()?,
            coping_action: draft.coping_action.as_deref().map(|n| self.encrypt(n)).transpose()?,
            logged_at: draft.logged_at,
            created_at: now,
            updated_at: now,
        };

        self.store.upsert_craving_log(&log).await?;
        debug!(craving_log_id = %log.id, "craving log saved");
        Ok(log)
    }

    /// Delete a craving log.
    pub async fn delete_craving_log(&self, id: &str) -> Result<()> {
        self.store.delete_craving_log(id).await
    }

    /// Decrypt a stored field for display.
    pub fn decrypt_field(&self, payload: &str) -> Result<String> {
        self.crypto.decrypt(payload).map_err(map_crypto_error)
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.crypto.encrypt(plaintext).map_err(map_crypto_error)
    }
}

fn map_crypto_error(e: CryptoError) -> HarborError {
    HarborError::Security(e.to_string())
}
