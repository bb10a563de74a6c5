//! Firestore REST API client.
//!
//! Every request goes through [`FirestoreClient::send_authorized`], which
//! re-sends once with a fresh token when Google reports an expired one, and
//! through `execute_request`, which wraps it in a span and records metrics.
//! Nothing here retries on server errors: a commit that may have been applied
//! must not be replayed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::token_cache::TokenCache;
use crate::types::{CommitRequest, CommitResponse, Document, Write};

const DEFAULT_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Bearer value the emulator accepts for full access.
const EMULATOR_TOKEN: &str = "owner";

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// REST root, `https://firestore.googleapis.com/v1` outside the emulator
    pub api_base: String,
    /// Talk to an emulator: no service account, fixed bearer token
    pub emulator: bool,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                FirestoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access Firestore",
                )
            })?;

        if project_id.is_empty() {
            return Err(FirestoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let emulator_host = std::env::var("FIRESTORE_EMULATOR_HOST")
            .ok()
            .filter(|h| !h.is_empty());

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            api_base: match &emulator_host {
                Some(host) => format!("http://{}/v1", host),
                None => DEFAULT_API_BASE.to_string(),
            },
            emulator: emulator_host.is_some(),
        })
    }
}

/// Firestore REST API client.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    token_cache: Arc<TokenCache>,
}

impl FirestoreClient {
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let token_cache = if config.emulator {
            TokenCache::fixed(EMULATOR_TOKEN)
        } else {
            TokenCache::new(Self::create_auth_provider()?)
        };
        Self::with_token_cache(config, token_cache)
    }

    /// Build a client around an existing token source.
    pub fn with_token_cache(config: FirestoreConfig, token_cache: TokenCache) -> FirestoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("dscan-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "{}/projects/{}/databases/{}/documents",
            config.api_base.trim_end_matches('/'),
            config.project_id,
            config.database_id
        );

        Ok(Self {
            http,
            config,
            base_url,
            token_cache: Arc::new(token_cache),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            FirestoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(FirestoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Resource name used inside commit writes.
    pub fn full_document_name(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, collection, doc_id
        )
    }

    /// Send a request built by `build`, refreshing the token once on expiry.
    ///
    /// A 401 means the request was rejected before execution, so re-sending
    /// is safe for every operation.
    async fn send_authorized<F>(&self, url: &str, build: F) -> FirestoreResult<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.token_cache.get_token().await?;
        let response = build(&token).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(
                StatusCode::UNAUTHORIZED.as_u16(),
                format!("{} failed: {}", url, body),
            ));
        }

        debug!("Firestore token expired, refreshing");
        self.token_cache.invalidate().await;
        let token = self.token_cache.get_token().await?;
        Ok(build(&token).send().await?)
    }

    /// Get a document, `None` if it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(&url, |token| self.http.get(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(Some(response.json::<Document>().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Atomically apply `writes`.
    pub async fn commit(&self, collection: &str, writes: Vec<Write>) -> FirestoreResult<CommitResponse> {
        if writes.is_empty() {
            return Err(FirestoreError::request_failed("commit without writes"));
        }

        let url = format!("{}:commit", self.base_url);
        let request = CommitRequest { writes };

        self.execute_request("commit", collection, None, async {
            let response = self
                .send_authorized(&url, |token| {
                    self.http.post(&url).bearer_auth(token).json(&request)
                })
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json::<CommitResponse>().await?),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    async fn execute_request<T, F>(
        &self,
        operation: &'static str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = match doc_id {
            Some(id) => info_span!("firestore_request", operation, collection = %collection, doc_id = %id),
            None => info_span!("firestore_request", operation, collection = %collection),
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(status: StatusCode, url: &str, response: Response) -> FirestoreError {
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_validates_project_id() {
        std::env::remove_var("GCP_PROJECT_ID");
        std::env::remove_var("FIREBASE_PROJECT_ID");
        assert!(FirestoreConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_config_default_values() {
        std::env::set_var("GCP_PROJECT_ID", "test-project");
        std::env::remove_var("FIRESTORE_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("FIRESTORE_EMULATOR_HOST");

        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.database_id, "(default)");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(!config.emulator);

        std::env::remove_var("GCP_PROJECT_ID");
    }

    #[test]
    #[serial]
    fn test_config_emulator() {
        std::env::set_var("FIREBASE_PROJECT_ID", "demo-project");
        std::env::remove_var("GCP_PROJECT_ID");
        std::env::set_var("FIRESTORE_EMULATOR_HOST", "localhost:8080");

        let config = FirestoreConfig::from_env().unwrap();
        assert_eq!(config.project_id, "demo-project");
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert!(config.emulator);

        std::env::remove_var("FIREBASE_PROJECT_ID");
        std::env::remove_var("FIRESTORE_EMULATOR_HOST");
    }
}
