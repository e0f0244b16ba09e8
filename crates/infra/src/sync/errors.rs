//! Sync-specific error types
//!
//! Provides error classification for sync operations. Retryable and
//! permanent failures deliberately share one retry counter (distinguishing
//! them reliably is unsafe without remote schema introspection); only the
//! fatal class - the whole remote store unreachable or authentication
//! rejected - short-circuits a batch run.

use harbor_domain::HarborError;
use thiserror::Error;

/// Categories of sync errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorCategory {
    /// Authentication errors (401, 403) - fatal for the run
    Authentication,
    /// Remote store unreachable (connect failure) - fatal for the run
    Unreachable,
    /// Rate limiting errors (429) - retryable
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except auth) - still retried up to the cap
    Client,
    /// Network/timeout errors - retryable
    Network,
    /// Local database errors
    Database,
    /// Configuration errors
    Config,
}

/// Sync operation errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Get the error category for this error
    pub fn category(&self) -> SyncErrorCategory {
        match self {
            Self::Auth(_) => SyncErrorCategory::Authentication,
            Self::Unreachable(_) => SyncErrorCategory::Unreachable,
            Self::RateLimit(_) => SyncErrorCategory::RateLimit,
            Self::Server(_) => SyncErrorCategory::Server,
            Self::Client(_) => SyncErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => SyncErrorCategory::Network,
            Self::Database(_) => SyncErrorCategory::Database,
            Self::Config(_) | Self::Cancelled => SyncErrorCategory::Config,
        }
    }

    /// Whether the failure aborts the whole batch run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            SyncErrorCategory::Authentication | SyncErrorCategory::Unreachable
        )
    }

    /// Sanitized class label stored as `last_error` on the queue item.
    ///
    /// Never derived from message content, so diagnostics can never leak
    /// field values.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth_rejected",
            Self::Unreachable(_) => "remote_unreachable",
            Self::RateLimit(_) => "rate_limited",
            Self::Server(_) => "server_error",
            Self::Client(_) => "client_error",
            Self::Network(_) => "network_error",
            Self::Database(_) => "database_error",
            Self::Config(_) => "config_error",
            Self::Timeout(_) => "network_timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Convert from HarborError to SyncError
impl From<HarborError> for SyncError {
    fn from(err: HarborError) -> Self {
        match err {
            HarborError::Database(message) => Self::Database(message),
            HarborError::Config(message) => Self::Config(message),
            HarborError::Network(message) => Self::Network(message),
            HarborError::Security(message) => Self::Auth(message),
            HarborError::NotFound(message) | HarborError::InvalidInput(message) => {
                Self::Client(message)
            }
            HarborError::Internal(message) => Self::Server(message),
        }
    }
}
