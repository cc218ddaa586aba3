//! Creates the service or replaces its whole spec

use std::sync::Arc;

use tracing::{debug, info};

use crate::deploy::platform::ServicePlatform;
use crate::deploy::spec::ServiceDescriptor;
use crate::errors::DeployError;

/// Which write path the upsert took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertResult {
    pub created: bool,
}

pub struct ServiceUpserter {
    platform: Arc<dyn ServicePlatform>,
}

impl ServiceUpserter {
    pub fn new(platform: Arc<dyn ServicePlatform>) -> Self {
        Self { platform }
    }

    /// Exactly one remote write: a create when the service is absent, a full
    /// replace otherwise. Attempted once; failures propagate.
    pub async fn upsert(&self, descriptor: &ServiceDescriptor) -> Result<UpsertResult, DeployError> {
        let location = descriptor.location();
        debug!(service = %location.name, path = %location.namespace_path(), "Checking if service exists");

        match self.platform.get_service(location).await {
            Ok(_) => {
                info!(service = %location.name, "Replacing service");
                self.platform
                    .replace_service(location, descriptor.resource())
                    .await?;
                info!(service = %location.name, "Service replaced");
                Ok(UpsertResult { created: false })
            }
            Err(e) if e.is_not_found() => {
                info!(service = %location.name, "Creating service");
                self.platform
                    .create_service(location, descriptor.resource())
                    .await?;
                info!(service = %location.name, "Service created");
                Ok(UpsertResult { created: true })
            }
            Err(e) => Err(e),
        }
    }
}
