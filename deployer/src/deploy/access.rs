//! Grants unauthenticated invoke access, best effort

use std::sync::Arc;

use run_api::Policy;
use tracing::{debug, info, warn};

use crate::deploy::platform::{ServiceLocation, ServicePlatform};

pub struct AccessPolicySetter {
    platform: Arc<dyn ServicePlatform>,
    enabled: bool,
}

impl AccessPolicySetter {
    pub fn new(platform: Arc<dyn ServicePlatform>, enabled: bool) -> Self {
        Self { platform, enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Never fails: errors are logged and the deployment carries on
    pub async fn allow_unauthenticated(&self, location: &ServiceLocation) {
        if !self.enabled {
            debug!(service = %location.name, "Unauthenticated access not requested");
            return;
        }

        match self
            .platform
            .set_iam_policy(location, &Policy::public_invoker())
            .await
        {
            Ok(()) => info!(service = %location.name, "Allowed unauthenticated invocations"),
            Err(e) => warn!(
                service = %location.name,
                error = %e,
                "Failed to allow unauthenticated invocations"
            ),
        }
    }
}
