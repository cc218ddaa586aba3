//! Service account key material

use std::fmt;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Scope granting access to every Google Cloud API the key's roles allow
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime of a signed assertion; the token endpoint caps it at one hour
pub const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Deserialize)]
struct RawKey {
    #[serde(rename = "type", default)]
    key_type: Option<String>,
    project_id: String,
    #[serde(default)]
    private_key_id: Option<String>,
    private_key: String,
    client_email: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A parsed service account key
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key_id: Option<String>,
    pub token_uri: String,
    private_key: SecretString,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// JWT-bearer grant claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ServiceAccountKey {
    /// Parse the JSON key file content
    pub fn from_json(json: &str) -> Result<Self, DeployError> {
        let raw: RawKey = serde_json::from_str(json).map_err(|e| {
            DeployError::AuthError(format!("Service account key is not valid JSON: {}", e))
        })?;

        if let Some(key_type) = raw.key_type.as_deref() {
            if key_type != "service_account" {
                return Err(DeployError::AuthError(format!(
                    "Expected a service_account key, got '{}'",
                    key_type
                )));
            }
        }
        if raw.project_id.trim().is_empty() {
            return Err(DeployError::AuthError(
                "Service account key has no project_id".to_string(),
            ));
        }

        Ok(Self {
            project_id: raw.project_id,
            client_email: raw.client_email,
            private_key_id: raw.private_key_id,
            token_uri: raw
                .token_uri
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            private_key: SecretString::from(raw.private_key),
        })
    }

    pub fn claims(&self, scope: &str, now: i64) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign an RS256 assertion to exchange for an access token
    pub fn assertion(&self, scope: &str, now: i64) -> Result<String, DeployError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| DeployError::AuthError(format!("Invalid service account private key: {}", e)))?;

        encode(&header, &self.claims(scope, now), &key)
            .map_err(|e| DeployError::TokenError(format!("Failed to sign assertion: {}", e)))
    }
}
