//! Drives one deployment from image probe to a ready service

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::deploy::access::AccessPolicySetter;
use crate::deploy::delete::{DeleteResult, ServiceDeleter};
use crate::deploy::events::{Phase, ProgressEvent, ProgressSink};
use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm};
use crate::deploy::platform::{ImageRegistry, ServiceLocation, ServicePlatform};
use crate::deploy::poll::PollPolicy;
use crate::deploy::probe::RegistryAvailabilityProbe;
use crate::deploy::readiness::ReadinessPoller;
use crate::deploy::request::DeploymentRequest;
use crate::deploy::spec::build_descriptor;
use crate::deploy::upsert::ServiceUpserter;
use crate::errors::DeployError;

/// Final result of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Ready { endpoint_url: String, logs_url: String },
    ImageNotFound,
    ServiceError { message: String },
    Timeout,
}

impl ReconciliationOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReconciliationOutcome::Ready { .. })
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationOutcome::Ready { endpoint_url, logs_url } => {
                write!(f, "Service is ready at {} ([logs]({}))", endpoint_url, logs_url)
            }
            ReconciliationOutcome::ImageNotFound => {
                f.write_str("Image did not appear in the registry in time")
            }
            ReconciliationOutcome::ServiceError { message } => {
                write!(f, "Deployment failed: {}", message)
            }
            ReconciliationOutcome::Timeout => f.write_str(
                "Unable to retrieve service URL! Check the Cloud Run deployment for errors.",
            ),
        }
    }
}

/// Reconciler settings
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub image_poll: PollPolicy,
    pub readiness_poll: PollPolicy,
    pub allow_unauthenticated: bool,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            image_poll: PollPolicy::default(),
            readiness_poll: PollPolicy::readiness(),
            allow_unauthenticated: false,
        }
    }
}

/// Sequences probe, upsert, access policy and readiness
///
/// Each step owns its retry policy; a failed step ends the invocation.
pub struct DeploymentReconciler {
    probe: RegistryAvailabilityProbe,
    upserter: ServiceUpserter,
    access: AccessPolicySetter,
    readiness: ReadinessPoller,
    deleter: ServiceDeleter,
    sink: Arc<dyn ProgressSink>,
}

impl DeploymentReconciler {
    pub fn new(
        platform: Arc<dyn ServicePlatform>,
        registry: Arc<dyn ImageRegistry>,
        sink: Arc<dyn ProgressSink>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            probe: RegistryAvailabilityProbe::new(registry, settings.image_poll),
            upserter: ServiceUpserter::new(platform.clone()),
            access: AccessPolicySetter::new(platform.clone(), settings.allow_unauthenticated),
            readiness: ReadinessPoller::new(platform.clone(), settings.readiness_poll),
            deleter: ServiceDeleter::new(platform),
            sink,
        }
    }

    /// Deploy `request` into `project`
    pub async fn reconcile(&self, request: &DeploymentRequest, project: &str) -> ReconciliationOutcome {
        let mut fsm = DeploymentFsm::new();
        let location = ServiceLocation::for_request(project, request);

        info!(service = %location.name, image = %request.image, "Starting deployment");

        self.advance(
            &mut fsm,
            DeploymentEvent::Probe,
            format!("Waiting for image `{}` to become available", request.image),
        )
        .await;

        match self.probe.probe(&request.image).await {
            Ok(true) => {}
            Ok(false) => {
                let outcome = ReconciliationOutcome::ImageNotFound;
                self.advance(&mut fsm, DeploymentEvent::ImageMissing, outcome.to_string())
                    .await;
                return outcome;
            }
            Err(e) => return self.fail(&mut fsm, e).await,
        }

        let descriptor = build_descriptor(request, project);
        self.advance(
            &mut fsm,
            DeploymentEvent::ImageFound,
            format!(
                "Deploying `{}` to service `{}` in `{}`",
                request.image, location.name, location.region
            ),
        )
        .await;

        match descriptor.digest() {
            Ok(digest) => info!(service = %location.name, %digest, "Applying service descriptor"),
            Err(e) => warn!(error = %e, "Could not compute descriptor digest"),
        }

        match self.upserter.upsert(&descriptor).await {
            Ok(result) => info!(service = %location.name, created = result.created, "Upsert done"),
            Err(e) => return self.fail(&mut fsm, e).await,
        }
        self.advance(&mut fsm, DeploymentEvent::Upserted, String::new()).await;

        self.access.allow_unauthenticated(&location).await;
        self.advance(
            &mut fsm,
            DeploymentEvent::AccessPolicyDone,
            format!("Waiting for service `{}` to become ready", location.name),
        )
        .await;

        match self.readiness.wait_for_ready(&location).await {
            Ok(ready) => {
                let outcome = ReconciliationOutcome::Ready {
                    endpoint_url: ready.endpoint_url,
                    logs_url: ready.logs_url,
                };
                self.advance(&mut fsm, DeploymentEvent::Ready, outcome.to_string())
                    .await;
                outcome
            }
            Err(DeployError::Timeout(message)) => {
                warn!(service = %location.name, %message, "Readiness timed out");
                let outcome = ReconciliationOutcome::Timeout;
                self.advance(&mut fsm, DeploymentEvent::TimedOut, outcome.to_string())
                    .await;
                outcome
            }
            Err(e) => self.fail(&mut fsm, e).await,
        }
    }

    /// Delete the service addressed by `request`
    pub async fn teardown(
        &self,
        request: &DeploymentRequest,
        project: &str,
    ) -> Result<DeleteResult, DeployError> {
        let location = ServiceLocation::for_request(project, request);

        self.emit(ProgressEvent::new(
            Phase::Deleting,
            format!("Deleting service `{}` in `{}`", location.name, location.region),
        ))
        .await;

        match self.deleter.delete(&location).await {
            Ok(result) => {
                let detail = if result.deleted {
                    format!("Service `{}` deleted", location.name)
                } else {
                    format!("Service `{}` did not exist", location.name)
                };
                self.emit(ProgressEvent::new(Phase::Deleted, detail)).await;
                Ok(result)
            }
            Err(e) => {
                self.emit(ProgressEvent::new(Phase::ServiceError, e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn fail(&self, fsm: &mut DeploymentFsm, err: DeployError) -> ReconciliationOutcome {
        let message = match err {
            DeployError::ServiceFailed(message) => message,
            other => other.to_string(),
        };
        error!(%message, "Deployment failed");

        let outcome = ReconciliationOutcome::ServiceError { message: message.clone() };
        self.advance(fsm, DeploymentEvent::Failed(message), outcome.to_string())
            .await;
        outcome
    }

    /// Transition and report the phase being entered
    async fn advance(&self, fsm: &mut DeploymentFsm, event: DeploymentEvent, detail: String) {
        let phase = match fsm.process(event) {
            Ok(state) => state.phase(),
            Err(e) => {
                error!("{}", e);
                return;
            }
        };

        if let Some(phase) = phase {
            self.emit(ProgressEvent::new(phase, detail)).await;
        }
    }

    /// Reporting never affects the outcome
    async fn emit(&self, event: ProgressEvent) {
        if let Err(e) = self.sink.emit(&event).await {
            warn!(phase = ?event.phase, error = %e, "Failed to report progress");
        }
    }
}
