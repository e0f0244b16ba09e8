//! Stored row types for the recovery journal.
//!
//! Sensitive fields (`body`, `note`, `trigger_note`, `coping_action`) hold
//! opaque `iv:ciphertext` strings produced by the encryption service before
//! the row is written. Nothing below this layer knows the field is
//! encrypted; the queue and the sync engine forward the string as-is.
//!
//! `remote_id` mirrors the client-generated `id` for rows that participate
//! in sync (the remote upsert is keyed by the same uuid). A null `remote_id`
//! marks a row that never entered the sync path; deleting such a row never
//! produces a remote call.

use serde::{Deserialize, Serialize};

/// A free-text journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    #[serde(skip)]
    pub remote_id: Option<String>,
    /// Encrypted payload string.
    pub body: String,
    /// Self-reported mood, 1-10.
    pub mood_score: Option<i32>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A daily check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: String,
    #[serde(skip)]
    pub remote_id: Option<String>,
    /// Encrypted payload string.
    pub note: Option<String>,
    /// Self-reported craving intensity, 0-10.
    pub craving_level: i32,
    /// Civil date the check-in covers, `YYYY-MM-DD`.
    pub checked_on: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// An urge/craving log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CravingLog {
    pub id: String,
    #[serde(skip)]
    pub remote_id: Option<String>,
    /// Craving intensity, 0-10.
    pub intensity: i32,
    /// Encrypted payload string.
    pub trigger_note: Option<String>,
    /// Encrypted payload string.
    pub coping_action: Option<String>,
    pub logged_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    //! Unit tests for journal row types.
    use super::*;

    #[test]
    fn remote_payload_omits_remote_id() {
        let entry = JournalEntry {
            id: "entry-1".into(),
            remote_id: Some("entry-1".into()),
            body: "aGVsbG8=:Y2lwaGVy".into(),
            mood_score: Some(7),
            created_at: 1,
            updated_at: 2,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("remote_id").is_none());
        assert_eq!(value["id"], "entry-1");
        assert_eq!(value["body"], "aGVsbG8=:Y2lwaGVy");
    }
}
