//! SQLCipher-backed storage adapter.
//!
//! The adapter exposes a deliberately thin contract: `query_all`,
//! `query_one`, `execute`, and `with_transaction` (atomic multi-statement
//! scope with guaranteed rollback on error). Higher layers never see the
//! pool or pragma details.

pub mod error;
pub mod sqlcipher;

pub use error::{StorageError, StorageResult};
pub use sqlcipher::{SqlCipherConnection, SqlCipherPool, SqlCipherPoolConfig};
