//! Waits for a freshly pushed image to become resolvable in its registry

use std::sync::Arc;

use tracing::{debug, info};

use crate::deploy::platform::ImageRegistry;
use crate::deploy::poll::{poll, Check, PollOutcome, PollPolicy};
use crate::errors::DeployError;
use crate::models::image::ImageReference;

pub struct RegistryAvailabilityProbe {
    registry: Arc<dyn ImageRegistry>,
    policy: PollPolicy,
}

impl RegistryAvailabilityProbe {
    pub fn new(registry: Arc<dyn ImageRegistry>, policy: PollPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// `Ok(true)` once the manifest resolves, `Ok(false)` when every attempt saw
    /// "not found". Any other error aborts immediately.
    pub async fn probe(&self, image: &ImageReference) -> Result<bool, DeployError> {
        info!(image = %image, "Waiting for image to appear in the registry");

        let outcome = poll(&self.policy, "image-visibility", |attempt| async move {
            match self.registry.manifest_exists(image).await {
                Ok(()) => Ok(Check::Done(())),
                Err(e) if e.is_not_found() => {
                    debug!(image = %image, attempt, "Image not visible yet");
                    Ok(Check::Pending)
                }
                Err(e) => Err(e),
            }
        })
        .await?;

        match outcome {
            PollOutcome::Done { attempts, .. } => {
                info!(image = %image, attempts, "Image is available");
                Ok(true)
            }
            PollOutcome::Exhausted { attempts } => {
                info!(image = %image, attempts, "Image did not appear in time");
                Ok(false)
            }
        }
    }
}
