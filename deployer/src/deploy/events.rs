//! Progress events produced by the reconciler

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::DeployError;

/// Phase of a deployment or teardown, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ProbingImage,
    Upserting,
    WaitingReady,
    Ready,
    ImageNotFound,
    Timeout,
    ServiceError,
    Deleting,
    Deleted,
}

impl Phase {
    /// No further phase follows
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Ready | Phase::ImageNotFound | Phase::Timeout | Phase::ServiceError | Phase::Deleted
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Phase::ImageNotFound | Phase::Timeout | Phase::ServiceError)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::ProbingImage => "Waiting for image",
            Phase::Upserting => "Deploying service",
            Phase::WaitingReady => "Waiting for service to become ready",
            Phase::Ready => "Service is ready",
            Phase::ImageNotFound => "Image not found",
            Phase::Timeout => "Timed out",
            Phase::ServiceError => "Deployment failed",
            Phase::Deleting => "Deleting service",
            Phase::Deleted => "Service deleted",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of the append-only progress history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub detail: String,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(phase: Phase, detail: impl Into<String>) -> Self {
        Self {
            phase,
            detail: detail.into(),
            at: Utc::now(),
        }
    }
}

/// Consumer of progress events; rendering and persistence are its business
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: &ProgressEvent) -> Result<(), DeployError>;
}

/// Sink used when there is nowhere to report to but the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn emit(&self, event: &ProgressEvent) -> Result<(), DeployError> {
        if event.phase.is_failure() {
            warn!(phase = ?event.phase, "{}: {}", event.phase, event.detail);
        } else {
            info!(phase = ?event.phase, "{}: {}", event.phase, event.detail);
        }
        Ok(())
    }
}
