//! Polls a service until its latest revision is serving or has failed

use std::sync::Arc;

use run_api::Service;
use tracing::{debug, info, warn};

use crate::deploy::platform::{ServiceLocation, ServicePlatform};
use crate::deploy::poll::{poll, Check, PollOutcome, PollPolicy};
use crate::errors::DeployError;

/// A service that is serving traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyService {
    pub endpoint_url: String,
    pub logs_url: String,
}

/// What a single status snapshot says about readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    InProgress,
    Ready(String),
    Failed(String),
}

/// Judge one snapshot of the service
pub fn assess(service: &Service) -> Readiness {
    if !service.status_is_current() {
        return Readiness::InProgress;
    }

    let Some(condition) = service.ready_condition() else {
        return Readiness::InProgress;
    };

    if condition.is_unknown() {
        return Readiness::InProgress;
    }

    match service.url() {
        Some(url) if condition.is_true() => Readiness::Ready(url.to_string()),
        _ => Readiness::Failed(
            condition
                .message
                .clone()
                .or_else(|| condition.reason.clone())
                .unwrap_or_else(|| format!("Service reported {} = {}", condition.condition_type, condition.status)),
        ),
    }
}

pub struct ReadinessPoller {
    platform: Arc<dyn ServicePlatform>,
    policy: PollPolicy,
}

impl ReadinessPoller {
    pub fn new(platform: Arc<dyn ServicePlatform>, policy: PollPolicy) -> Self {
        Self { platform, policy }
    }

    /// Returns as soon as the service is ready with a URL. Fails with
    /// `ServiceFailed` on a terminal failed condition and with `Timeout` when
    /// the budget runs out while still in progress.
    pub async fn wait_for_ready(&self, location: &ServiceLocation) -> Result<ReadyService, DeployError> {
        info!(service = %location.name, "Waiting for service to become ready");

        let outcome = poll(&self.policy, "service-readiness", |attempt| async move {
            let service = match self.platform.get_service(location).await {
                Ok(service) => service,
                Err(e) if e.is_not_found() => {
                    debug!(service = %location.name, attempt, "Service not visible yet");
                    return Ok(Check::Pending);
                }
                Err(e) => return Err(e),
            };

            match assess(&service) {
                Readiness::InProgress => {
                    debug!(service = %location.name, attempt, "Service not ready yet");
                    Ok(Check::Pending)
                }
                Readiness::Ready(url) => Ok(Check::Done(url)),
                Readiness::Failed(message) => {
                    warn!(service = %location.name, attempt, %message, "Service failed to become ready");
                    Err(DeployError::ServiceFailed(message))
                }
            }
        })
        .await?;

        match outcome {
            PollOutcome::Done { value, attempts } => {
                info!(service = %location.name, url = %value, attempts, "Service is ready");
                Ok(ReadyService {
                    endpoint_url: value,
                    logs_url: location.logs_url(),
                })
            }
            PollOutcome::Exhausted { attempts } => Err(DeployError::Timeout(format!(
                "Service {} did not become ready after {} attempts. Check the Cloud Run deployment for errors.",
                location.name, attempts
            ))),
        }
    }
}
