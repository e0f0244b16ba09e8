//! Test doubles shared across the workspace.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::security::{KeychainError, SecretStore};

/// In-memory [`SecretStore`] so key-management paths can be exercised
/// without touching a real platform vault.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| KeychainError::AccessFailed(format!("lock poisoned: {e}")))?;
        entries.get(key).cloned().ok_or(KeychainError::NotFound)
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| KeychainError::AccessFailed(format!("lock poisoned: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| KeychainError::AccessFailed(format!("lock poisoned: {e}")))?;
        entries.remove(key);
        Ok(())
    }
}

/// A [`SecretStore`] whose every call fails, simulating a revoked or
/// unavailable platform vault.
pub struct UnavailableSecretStore;

impl SecretStore for UnavailableSecretStore {
    fn get_secret(&self, _key: &str) -> Result<String, KeychainError> {
        Err(KeychainError::AccessFailed("vault unavailable".to_string()))
    }

    fn set_secret(&self, _key: &str, _value: &str) -> Result<(), KeychainError> {
        Err(KeychainError::AccessFailed("vault unavailable".to_string()))
    }

    fn delete_secret(&self, _key: &str) -> Result<(), KeychainError> {
        Err(KeychainError::AccessFailed("vault unavailable".to_string()))
    }

    fn secret_exists(&self, _key: &str) -> bool {
        false
    }
}
