//! PostgREST-style remote store client.
//!
//! Upserts POST the row to `/rest/v1/{table}?on_conflict=id` with
//! `Prefer: resolution=merge-duplicates`, so a retried attempt that already
//! landed server-side merges into the existing row instead of duplicating
//! it. Deletes filter on the remote id and succeed even when the row is
//! already gone. The service key lives in the platform secret store, never
//! in the relational database or a config file.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use harbor_common::security::SecretStore;
use harbor_domain::SyncTable;
use reqwest::{Response, StatusCode};
use tracing::{debug, instrument, warn};

use crate::sync::engine::RemoteStore;
use crate::sync::errors::SyncError;

const SERVICE_KEY_NAME: &str = "remote_service_key";

/// Configuration for the remote store client.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Base URL of the remote store (e.g. `https://xyz.supabase.co`).
    pub base_url: String,
    /// Timeout for API requests.
    pub timeout: Duration,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:54321".to_string(), timeout: Duration::from_secs(30) }
    }
}

/// Remote store client over the PostgREST API.
pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
    secrets: Arc<dyn SecretStore>,
}

impl SupabaseClient {
    /// Create a client; the service key is fetched from the secret store
    /// per call so a rotated key takes effect without a restart.
    pub fn new(config: SupabaseConfig, secrets: Arc<dyn SecretStore>) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, secrets })
    }

    /// Store the remote service key in the secret store.
    pub fn set_service_key(&self, key: &str) -> Result<(), SyncError> {
        self.secrets
            .set_secret(SERVICE_KEY_NAME, key)
            .map_err(|e| SyncError::Config(format!("failed to store service key: {e}")))
    }

    fn service_key(&self) -> Result<String, SyncError> {
        self.secrets
            .get_secret(SERVICE_KEY_NAME)
            .map_err(|e| SyncError::Auth(format!("failed to get service key: {e}")))
    }

    fn table_url(&self, table: SyncTable) -> String {
        format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, SyncError> {
        let response = request.send().await.map_err(classify_transport_error)?;
        classify_status(response)
    }
}

#[async_trait]
impl RemoteStore for SupabaseClient {
    #[instrument(skip(self, row), fields(table = %table))]
    async fn upsert(&self, table: SyncTable, row: serde_json::Value) -> Result<(), SyncError> {
        let key = self.service_key()?;
        let url = format!("{}?on_conflict=id", self.table_url(table));

        debug!(url = %url, "upserting row");

        let request = self
            .http
            .post(&url)
            .header("apikey", &key)
            .header("Authorization", format!("Bearer {key}"))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);

        self.send(request).await.map(|_| ())
    }

    #[instrument(skip(self), fields(table = %table))]
    async fn delete(&self, table: SyncTable, remote_id: &str) -> Result<(), SyncError> {
        let key = self.service_key()?;
        let url = format!("{}?id=eq.{remote_id}", self.table_url(table));

        debug!(url = %url, "deleting row");

        let request = self
            .http
            .delete(&url)
            .header("apikey", &key)
            .header("Authorization", format!("Bearer {key}"))
            .header("Prefer", "return=minimal");

        // PostgREST deletes are idempotent: filtering on an absent id
        // matches zero rows and still returns success.
        self.send(request).await.map(|_| ())
    }
}

fn classify_transport_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        SyncError::Unreachable(err.to_string())
    } else {
        SyncError::Network(err.to_string())
    }
}

fn classify_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    warn!(status = %status, "remote store rejected request");

    let message = format!("remote store returned {status}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SyncError::Auth(message)),
        StatusCode::TOO_MANY_REQUESTS => Err(SyncError::RateLimit(message)),
        StatusCode::REQUEST_TIMEOUT => Err(SyncError::Network(message)),
        _ if status.is_server_error() => Err(SyncError::Server(message)),
        _ => Err(SyncError::Client(message)),
    }
}

#[cfg(test)]
mod tests {
    use harbor_common::testing::MemorySecretStore;
    use wiremock::matchers::{header, headers, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client_for(server: &MockServer) -> SupabaseClient {
        let secrets = Arc::new(MemorySecretStore::new());
        let client = SupabaseClient::new(
            SupabaseConfig { base_url: server.uri(), timeout: Duration::from_secs(5) },
            secrets,
        )
        .unwrap();
        client.set_service_key("test-service-key").unwrap();
        client
    }

    #[tokio::test]
    async fn upsert_posts_with_merge_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/journal_entries"))
            .and(query_param("on_conflict", "id"))
            .and(headers("Prefer", vec!["resolution=merge-duplicates", "return=minimal"]))
            .and(header("apikey", "test-service-key"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let row = serde_json::json!({ "id": "rec-1", "body": "cipher" });

        client.upsert(SyncTable::JournalEntries, row).await.unwrap();
    }

    #[tokio::test]
    async fn delete_filters_on_remote_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/check_ins"))
            .and(query_param("id", "eq.rec-9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;

        client.delete(SyncTable::CheckIns, "rec-9").await.unwrap();
    }

    #[tokio::test]
    async fn unauthorized_maps_to_fatal_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let row = serde_json::json!({ "id": "rec-1" });

        let err = client.upsert(SyncTable::JournalEntries, row).await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn server_error_is_retryable_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let row = serde_json::json!({ "id": "rec-1" });

        let err = client.upsert(SyncTable::JournalEntries, row).await.unwrap_err();
        assert!(matches!(err, SyncError::Server(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn missing_service_key_is_auth_error() {
        let server = MockServer::start().await;
        let client = SupabaseClient::new(
            SupabaseConfig { base_url: server.uri(), timeout: Duration::from_secs(5) },
            Arc::new(MemorySecretStore::new()),
        )
        .unwrap();

        let err =
            client.delete(SyncTable::CravingLogs, "rec-1").await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
    }

    #[tokio::test]
    async fn connection_refused_is_unreachable() {
        let secrets = Arc::new(MemorySecretStore::new());
        let client = SupabaseClient::new(
            // Reserved port that nothing listens on.
            SupabaseConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout: Duration::from_secs(2),
            },
            secrets,
        )
        .unwrap();
        client.set_service_key("k").unwrap();

        let err = client.delete(SyncTable::CheckIns, "rec-1").await.unwrap_err();
        assert!(err.is_fatal());
    }
}
