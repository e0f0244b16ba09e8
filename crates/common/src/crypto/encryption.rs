//! Field-level encryption for sensitive journal content.
//!
//! Provides AES-256-GCM encryption of string payloads. Every call draws a
//! fresh random 12-byte nonce, so encrypting the same plaintext twice under
//! the same key yields different payloads. The output encoding is
//! `base64(nonce) ":" base64(ciphertext)`; the nonce travels with the
//! ciphertext and is not secret.
//!
//! Keys are either generated directly (256 random bits from the OS CSPRNG)
//! or derived from a passphrase with Argon2id and a random per-installation
//! salt. Key material lives in the platform secret store, never in the
//! relational database — see [`crate::security::KeyManager`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::SaltString;
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// Nonce size mandated by AES-256-GCM.
const NONCE_LEN: usize = 12;

/// Errors surfaced by the encryption service.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The secure key store could not produce key material. Fatal for any
    /// encrypt/decrypt caller.
    #[error("encryption key unavailable: {0}")]
    KeyUnavailable(String),

    /// Key material exists but has the wrong shape.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// The payload does not follow the `iv:ciphertext` structure.
    #[error("malformed encrypted payload")]
    MalformedPayload,

    /// The cipher rejected the payload (wrong key, corrupted ciphertext, or
    /// authentication tag mismatch).
    #[error("decryption failed")]
    DecryptionFailed,

    /// The cipher operation itself errored while encrypting.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Passphrase-based key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// AES-256-GCM encryption service over opaque string payloads.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("key", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// Create a service from a raw 32-byte key.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// Generate a random 256-bit key from the OS CSPRNG.
    pub fn generate_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Generate a random salt for passphrase derivation, base64-encoded for
    /// persistence beside the key reference.
    pub fn generate_salt() -> String {
        SaltString::generate(OsRng).to_string()
    }

    /// Derive the key from a passphrase with Argon2id and a persisted salt.
    ///
    /// The salt must be unique per installation; callers obtain it from
    /// [`Self::generate_salt`] on first run and store it in the secret
    /// store.
    pub fn from_passphrase(passphrase: &str, salt: &str) -> CryptoResult<Self> {
        let salt = SaltString::from_b64(salt)
            .map_err(|e| CryptoError::KeyDerivation(format!("invalid salt: {e}")))?;

        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), salt.as_str().as_bytes(), &mut key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        Self::new(&key)
    }

    /// Encrypt a plaintext string into an `iv:ciphertext` payload.
    ///
    /// A fresh nonce is drawn per call; two encryptions of the same
    /// plaintext never produce the same payload.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce), plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok(format!("{}:{}", BASE64.encode(nonce), BASE64.encode(ciphertext)))
    }

    /// Decrypt an `iv:ciphertext` payload back into the plaintext string.
    pub fn decrypt(&self, payload: &str) -> CryptoResult<String> {
        let (nonce_b64, ciphertext_b64) =
            payload.split_once(':').ok_or(CryptoError::MalformedPayload)?;

        let nonce_bytes =
            BASE64.decode(nonce_b64).map_err(|_| CryptoError::MalformedPayload)?;
        let ciphertext =
            BASE64.decode(ciphertext_b64).map_err(|_| CryptoError::MalformedPayload)?;

        let nonce: [u8; NONCE_LEN] =
            nonce_bytes.as_slice().try_into().map_err(|_| CryptoError::MalformedPayload)?;

        let plaintext = self
            .cipher
            .decrypt(&Nonce::from(nonce), ciphertext.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
    }
}
