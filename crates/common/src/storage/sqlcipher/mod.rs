//! SQLCipher pool and connection wrappers.

pub mod config;
pub mod connection;
pub mod pool;

pub use config::SqlCipherPoolConfig;
pub use connection::SqlCipherConnection;
pub use pool::SqlCipherPool;
