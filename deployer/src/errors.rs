//! Error types for the deployer

use http::StatusCode;
use thiserror::Error;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote error ({status}): {message}")]
    RemoteError { status: u16, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Report error: {0}")]
    ReportError(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    ServiceFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}

/// How a failure should be treated by the component that observed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retried within the owning component's poll policy
    Transient,
    /// The addressed resource does not exist
    NotFound,
    /// Credential or identity failure
    FatalAuth,
    /// Any other remote or local failure
    FatalRemote,
    /// A poll budget ran out while the condition was still transient
    Timeout,
}

impl DeployError {
    /// Build an error from a non-success HTTP status and the response body
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = run_api::ErrorResponse::message_from(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("no response body")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

        match status {
            StatusCode::NOT_FOUND => DeployError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                DeployError::AuthError(format!("{}: {}", status, message))
            }
            _ => DeployError::RemoteError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            DeployError::NotFound(_) => ErrorClass::NotFound,
            DeployError::AuthError(_) | DeployError::TokenError(_) => ErrorClass::FatalAuth,
            DeployError::Timeout(_) => ErrorClass::Timeout,
            _ => ErrorClass::FatalRemote,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}
