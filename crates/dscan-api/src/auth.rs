//! Firebase ID token authentication.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Google JWKS URL for Firebase Auth.
const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const FIREBASE_ISSUER_PREFIX: &str = "https://securetoken.google.com/";

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Decoded Firebase ID token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseClaims {
    /// User ID
    pub sub: String,
    pub email: Option<String>,
    pub iss: String,
    /// Firebase project ID
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
}

impl From<FirebaseClaims> for AuthUser {
    fn from(claims: FirebaseClaims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
        }
    }
}

/// Turns a bearer token into a caller identity.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthUser, ApiError>;
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkKey {
    kid: String,
    n: String,
    e: String,
}

/// Google signing keys, refreshed hourly.
pub struct JwksCache {
    http: Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
    last_refresh: RwLock<Instant>,
    project_id: String,
}

impl JwksCache {
    pub async fn new(project_id: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building JWKS HTTP client")?;

        let cache = Self {
            http,
            keys: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(Instant::now()),
            project_id: project_id.into(),
        };

        cache.refresh_keys().await?;

        Ok(cache)
    }

    /// Build from `FIREBASE_PROJECT_ID`, falling back to `GCP_PROJECT_ID`.
    pub async fn from_env() -> anyhow::Result<Self> {
        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .or_else(|_| std::env::var("GCP_PROJECT_ID"))
            .context("FIREBASE_PROJECT_ID or GCP_PROJECT_ID must be set")?;
        Self::new(project_id).await
    }

    async fn refresh_keys(&self) -> anyhow::Result<()> {
        debug!("Refreshing JWKS keys");

        let jwks: JwksResponse = self
            .http
            .get(GOOGLE_JWKS_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)?;
            keys.insert(jwk.kid, key);
        }

        let key_count = keys.len();
        *self.keys.write().await = keys;
        *self.last_refresh.write().await = Instant::now();

        debug!("Refreshed {} JWKS keys", key_count);
        Ok(())
    }

    async fn get_key(&self, kid: &str) -> Option<DecodingKey> {
        let needs_refresh = self.last_refresh.read().await.elapsed() > JWKS_CACHE_TTL;

        if needs_refresh {
            if let Err(e) = self.refresh_keys().await {
                warn!("Failed to refresh JWKS keys: {}", e);
            }
        }

        self.keys.read().await.get(kid).cloned()
    }
}

#[async_trait]
impl TokenVerifier for JwksCache {
    async fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let header = decode_header(token)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token header: {}", e)))?;

        let kid = header
            .kid
            .ok_or_else(|| ApiError::unauthorized("Token missing key ID"))?;

        let key = self
            .get_key(&kid)
            .await
            .ok_or_else(|| ApiError::unauthorized("Unknown key ID"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[format!("{}{}", FIREBASE_ISSUER_PREFIX, self.project_id)]);
        validation.set_audience(&[&self.project_id]);

        let token_data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {}", e)))?;

        if token_data.claims.sub.is_empty() {
            return Err(ApiError::unauthorized("Token has no subject"));
        }

        Ok(AuthUser::from(token_data.claims))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state.verifier.verify(token).await
    }
}
