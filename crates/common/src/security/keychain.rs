//! Platform secret store access.
//!
//! [`SecretStore`] is the narrow contract the rest of the workspace codes
//! against; [`KeychainProvider`] implements it over the platform credential
//! vault (macOS Keychain, Windows Credential Manager, Linux Secret Service)
//! via the `keyring` crate. Tests use the in-memory implementation from
//! [`crate::testing`].

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, vault unavailable, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Entry not found in keychain
    #[error("Entry not found")]
    NotFound,

    /// Underlying keyring library error
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Narrow contract for secure credential storage.
pub trait SecretStore: Send + Sync {
    /// Retrieve a secret value.
    fn get_secret(&self, key: &str) -> Result<String, KeychainError>;

    /// Store a secret value.
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Delete a secret. Idempotent: deleting an absent entry succeeds.
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    /// Check whether a secret exists.
    fn secret_exists(&self, key: &str) -> bool {
        self.get_secret(key).is_ok()
    }
}

/// Secret store backed by the platform credential vault.
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    /// Create a provider scoped to a service identifier
    /// (e.g. `"Harbor.encryption"`).
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}

impl SecretStore for KeychainProvider {
    fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        entry.get_password().map_err(|e| {
            if matches!(e, keyring::Error::NoEntry) {
                KeychainError::NotFound
            } else {
                KeychainError::AccessFailed(format!("Failed to retrieve secret for {key}: {e}"))
            }
        })
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        if let Err(e) = entry.delete_credential() {
            if !matches!(e, keyring::Error::NoEntry) {
                return Err(KeychainError::AccessFailed(format!(
                    "Failed to delete secret for {key}: {e}"
                )));
            }
        }

        Ok(())
    }
}
