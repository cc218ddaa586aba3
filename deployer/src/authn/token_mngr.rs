//! Access token management

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::authn::service_account::{ServiceAccountKey, CLOUD_PLATFORM_SCOPE};
use crate::errors::DeployError;
use crate::http::client::HttpClient;

/// Refresh tokens this close to expiry
const REFRESH_MARGIN_SECS: i64 = 60;

/// An OAuth2 bearer token
pub struct AccessToken {
    raw: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(raw: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            raw: SecretString::from(raw.into()),
            expires_at,
        }
    }

    /// The bearer value
    pub fn secret(&self) -> &str {
        self.raw.expose_secret()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token expires within the given number of seconds
    pub fn expires_within(&self, seconds: i64) -> bool {
        self.expires_at < Utc::now() + Duration::seconds(seconds)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Source of bearer tokens for remote calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<Arc<AccessToken>, DeployError>;
}

/// Token manager backed by a service account key
pub struct TokenManager {
    key: Arc<ServiceAccountKey>,
    http_client: Arc<HttpClient>,
    cached_token: RwLock<Option<Arc<AccessToken>>>,
}

impl TokenManager {
    pub fn new(key: Arc<ServiceAccountKey>, http_client: Arc<HttpClient>) -> Self {
        Self {
            key,
            http_client,
            cached_token: RwLock::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<Arc<AccessToken>, DeployError> {
        info!(client_email = %self.key.client_email, "Requesting access token");

        let now = Utc::now();
        let assertion = self.key.assertion(CLOUD_PLATFORM_SCOPE, now.timestamp())?;
        let response = self
            .http_client
            .exchange_assertion(&self.key.token_uri, &assertion)
            .await?;

        let token = Arc::new(AccessToken::new(
            response.access_token,
            now + Duration::seconds(response.expires_in),
        ));
        debug!(expires_at = %token.expires_at(), "Access token acquired");
        Ok(token)
    }
}

#[async_trait]
impl TokenSource for TokenManager {
    async fn access_token(&self) -> Result<Arc<AccessToken>, DeployError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.expires_within(REFRESH_MARGIN_SECS) {
                    return Ok(token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(REFRESH_MARGIN_SECS) {
                return Ok(token.clone());
            }
        }

        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// A fixed token, for callers that already hold one
pub struct StaticToken(Arc<AccessToken>);

impl StaticToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Arc::new(AccessToken::new(
            raw,
            DateTime::<Utc>::MAX_UTC,
        )))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<Arc<AccessToken>, DeployError> {
        Ok(self.0.clone())
    }
}
