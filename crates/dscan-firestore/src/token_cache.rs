//! Access token caching for Firestore requests.
//!
//! Tokens are refreshed a minute before expiry under a write lock, so
//! concurrent requests trigger a single refresh. When a refresh fails the
//! previous token is reused for as long as it is still valid.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL assumed when the provider reports an unusable expiry.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for Firestore REST access.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

enum TokenSource {
    Provider(Arc<dyn TokenProvider>),
    /// Fixed bearer value, used against the emulator
    Static(String),
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    source: TokenSource,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            source: TokenSource::Provider(auth),
            cache: RwLock::new(None),
        }
    }

    /// A cache that always hands out `token`.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            cache: RwLock::new(None),
        }
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Get a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        let auth = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Provider(auth) => auth,
        };

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.access_token.clone());
        }

        match auth.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();
                let now = Utc::now();
                let exp = token.expires_at();
                let expires_at = if exp > now {
                    Instant::now() + (exp - now).to_std().unwrap_or(TOKEN_DEFAULT_TTL)
                } else {
                    Instant::now()
                };

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });

                debug!("Refreshed Firestore access token");
                Ok(access_token)
            }
            Err(e) => match cache.as_ref().filter(|c| c.is_usable()) {
                Some(cached) => {
                    warn!("Token refresh failed, using existing token: {}", e);
                    Ok(cached.access_token.clone())
                }
                None => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                ))),
            },
        }
    }
}
