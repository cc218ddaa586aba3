//! Finite State Machine for one deployment attempt

use serde::Serialize;

use crate::deploy::events::Phase;

/// Deployment state
///
/// Strictly linear: every state has at most one successor on success and the
/// terminal states accept no further events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// Nothing done yet
    Start,

    /// Waiting for the image to be resolvable
    ProbingImage,

    /// Creating or replacing the service
    Upserting,

    /// Granting public access, best effort
    SettingAccessPolicy,

    /// Polling the service status
    WaitingReady,

    /// Serving
    Ready,

    /// The image never showed up
    ImageNotFound,

    /// The service never reported a terminal status
    Timeout,

    /// A remote call or the service itself failed
    ServiceError,
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Ready
                | DeploymentState::ImageNotFound
                | DeploymentState::Timeout
                | DeploymentState::ServiceError
        )
    }

    /// The user-visible phase of this state, if it has one
    pub fn phase(&self) -> Option<Phase> {
        match self {
            DeploymentState::Start | DeploymentState::SettingAccessPolicy => None,
            DeploymentState::ProbingImage => Some(Phase::ProbingImage),
            DeploymentState::Upserting => Some(Phase::Upserting),
            DeploymentState::WaitingReady => Some(Phase::WaitingReady),
            DeploymentState::Ready => Some(Phase::Ready),
            DeploymentState::ImageNotFound => Some(Phase::ImageNotFound),
            DeploymentState::Timeout => Some(Phase::Timeout),
            DeploymentState::ServiceError => Some(Phase::ServiceError),
        }
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Start looking for the image
    Probe,

    /// The image resolves
    ImageFound,

    /// The image poll budget ran out
    ImageMissing,

    /// The service was created or replaced
    Upserted,

    /// The access policy step finished, whatever its result
    AccessPolicyDone,

    /// The service is serving
    Ready,

    /// The readiness poll budget ran out
    TimedOut,

    /// Fatal failure in the current step
    Failed(String),
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    state: DeploymentState,
    error: Option<String>,
}

impl DeploymentFsm {
    /// Create a new FSM in the start state
    pub fn new() -> Self {
        Self {
            state: DeploymentState::Start,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<&DeploymentState, String> {
        let new_state = match (&self.state, &event) {
            (DeploymentState::Start, DeploymentEvent::Probe) => DeploymentState::ProbingImage,

            (DeploymentState::ProbingImage, DeploymentEvent::ImageFound) => DeploymentState::Upserting,
            (DeploymentState::ProbingImage, DeploymentEvent::ImageMissing) => {
                DeploymentState::ImageNotFound
            }

            (DeploymentState::Upserting, DeploymentEvent::Upserted) => {
                DeploymentState::SettingAccessPolicy
            }

            (DeploymentState::SettingAccessPolicy, DeploymentEvent::AccessPolicyDone) => {
                DeploymentState::WaitingReady
            }

            (DeploymentState::WaitingReady, DeploymentEvent::Ready) => DeploymentState::Ready,
            (DeploymentState::WaitingReady, DeploymentEvent::TimedOut) => DeploymentState::Timeout,

            (
                DeploymentState::ProbingImage
                | DeploymentState::Upserting
                | DeploymentState::WaitingReady,
                DeploymentEvent::Failed(err),
            ) => {
                self.error = Some(err.clone());
                DeploymentState::ServiceError
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(&self.state)
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
