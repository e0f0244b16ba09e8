//! Per-installation encryption key lifecycle.
//!
//! The raw 256-bit field-encryption key lives in the platform secret store,
//! hex-encoded, under a fixed account name. It is generated on first run,
//! loaded on every subsequent run, and held in memory read-only for the
//! process lifetime. Deleting the key makes all previously encrypted
//! content permanently unrecoverable; that operation exists for an
//! explicit, user-confirmed reset only.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{info, warn};

use crate::crypto::{CryptoError, CryptoResult, EncryptionService};
use crate::security::keychain::{KeychainError, SecretStore};

const KEY_NAME: &str = "field_encryption_key";
const SALT_NAME: &str = "field_encryption_salt";
const DB_KEY_NAME: &str = "database_encryption_key";

/// Manages the field-encryption key held in the secret store.
pub struct KeyManager {
    store: Arc<dyn SecretStore>,
}

impl KeyManager {
    /// Create a manager over the given secret store.
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Load the existing key or generate and persist a new one, returning a
    /// ready [`EncryptionService`].
    ///
    /// Fails with [`CryptoError::KeyUnavailable`] when the secret store is
    /// inaccessible; callers must treat that as fatal for any
    /// encryption/decryption call.
    pub fn initialize_key(&self) -> CryptoResult<EncryptionService> {
        match self.store.get_secret(KEY_NAME) {
            Ok(encoded) => {
                let key = hex::decode(&encoded)
                    .map_err(|e| CryptoError::InvalidKey(format!("stored key not hex: {e}")))?;
                EncryptionService::new(&key)
            }
            Err(KeychainError::NotFound) => {
                info!("no field encryption key found, generating one");

                let key = EncryptionService::generate_key();
                self.store
                    .set_secret(KEY_NAME, &hex::encode(key))
                    .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))?;

                EncryptionService::new(&key)
            }
            Err(e) => Err(CryptoError::KeyUnavailable(e.to_string())),
        }
    }

    /// Derive the key from a passphrase instead of storing raw key material.
    ///
    /// The Argon2 salt is generated once per installation and persisted in
    /// the secret store beside the key reference; it is never hardcoded.
    pub fn initialize_from_passphrase(&self, passphrase: &str) -> CryptoResult<EncryptionService> {
        let salt = match self.store.get_secret(SALT_NAME) {
            Ok(salt) => salt,
            Err(KeychainError::NotFound) => {
                let salt = EncryptionService::generate_salt();
                self.store
                    .set_secret(SALT_NAME, &salt)
                    .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))?;
                salt
            }
            Err(e) => return Err(CryptoError::KeyUnavailable(e.to_string())),
        };

        EncryptionService::from_passphrase(passphrase, &salt)
    }

    /// Load or generate the SQLCipher database key, hex-encoded.
    ///
    /// Separate from the field key: rotating or deleting one must not
    /// affect the other.
    pub fn initialize_database_key(&self) -> CryptoResult<String> {
        match self.store.get_secret(DB_KEY_NAME) {
            Ok(key) => Ok(key),
            Err(KeychainError::NotFound) => {
                info!("no database encryption key found, generating one");

                let key = Self::generate_encoded_key();
                self.store
                    .set_secret(DB_KEY_NAME, &key)
                    .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))?;
                Ok(key)
            }
            Err(e) => Err(CryptoError::KeyUnavailable(e.to_string())),
        }
    }

    /// Whether a key is present in the secret store.
    pub fn has_key(&self) -> bool {
        self.store.secret_exists(KEY_NAME)
    }

    /// Delete the stored key and salt.
    ///
    /// Irreversible: everything encrypted under the key becomes
    /// unrecoverable. The UI must gate this behind explicit confirmation.
    pub fn delete_key(&self) -> CryptoResult<()> {
        warn!("deleting field encryption key; encrypted content becomes unrecoverable");

        self.store
            .delete_secret(KEY_NAME)
            .and_then(|()| self.store.delete_secret(SALT_NAME))
            .map_err(|e| CryptoError::KeyUnavailable(e.to_string()))
    }

    /// Generate a fresh random key, hex-encoded (test and tooling helper).
    pub fn generate_encoded_key() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        hex::encode(key)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for security::key_manager.
    use super::*;
    use crate::testing::{MemorySecretStore, UnavailableSecretStore};

    #[test]
    fn initialize_creates_key_on_first_run() {
        let store = Arc::new(MemorySecretStore::new());
        let manager = KeyManager::new(store.clone());

        assert!(!manager.has_key());
        manager.initialize_key().unwrap();
        assert!(manager.has_key());

        let stored = store.get_secret(KEY_NAME).unwrap();
        assert_eq!(hex::decode(stored).unwrap().len(), 32);
    }

    #[test]
    fn initialize_reuses_existing_key() {
        let store = Arc::new(MemorySecretStore::new());
        let manager = KeyManager::new(store);

        let first = manager.initialize_key().unwrap();
        let payload = first.encrypt("persisted").unwrap();

        let second = manager.initialize_key().unwrap();
        assert_eq!(second.decrypt(&payload).unwrap(), "persisted");
    }

    #[test]
    fn initialize_fails_when_store_unavailable() {
        let manager = KeyManager::new(Arc::new(UnavailableSecretStore));

        let result = manager.initialize_key();
        assert!(matches!(result, Err(CryptoError::KeyUnavailable(_))));
    }

    #[test]
    fn delete_key_makes_content_unrecoverable() {
        let store = Arc::new(MemorySecretStore::new());
        let manager = KeyManager::new(store);

        let service = manager.initialize_key().unwrap();
        let payload = service.encrypt("gone after reset").unwrap();

        manager.delete_key().unwrap();
        assert!(!manager.has_key());

        // A re-initialized key cannot read the old payload.
        let fresh = manager.initialize_key().unwrap();
        assert!(matches!(fresh.decrypt(&payload), Err(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn database_key_is_stable_and_independent_of_field_key() {
        let store = Arc::new(MemorySecretStore::new());
        let manager = KeyManager::new(store);

        let first = manager.initialize_database_key().unwrap();
        let second = manager.initialize_database_key().unwrap();
        assert_eq!(first, second);
        assert_eq!(hex::decode(&first).unwrap().len(), 32);

        // Deleting the field key leaves the database key in place.
        manager.initialize_key().unwrap();
        manager.delete_key().unwrap();
        assert_eq!(manager.initialize_database_key().unwrap(), first);
    }

    #[test]
    fn passphrase_salt_persists_across_initializations() {
        let store = Arc::new(MemorySecretStore::new());
        let manager = KeyManager::new(store.clone());

        let first = manager.initialize_from_passphrase("one day at a time").unwrap();
        let payload = first.encrypt("derived").unwrap();

        let second = manager.initialize_from_passphrase("one day at a time").unwrap();
        assert_eq!(second.decrypt(&payload).unwrap(), "derived");

        assert!(store.secret_exists(SALT_NAME));
    }
}
