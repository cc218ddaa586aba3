//! Tears a service down

use std::sync::Arc;

use tracing::info;

use crate::deploy::platform::{ServiceLocation, ServicePlatform};
use crate::errors::DeployError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted: bool,
}

pub struct ServiceDeleter {
    platform: Arc<dyn ServicePlatform>,
}

impl ServiceDeleter {
    pub fn new(platform: Arc<dyn ServicePlatform>) -> Self {
        Self { platform }
    }

    /// Deleting an absent service succeeds with `deleted = false`
    pub async fn delete(&self, location: &ServiceLocation) -> Result<DeleteResult, DeployError> {
        info!(service = %location.name, "Deleting service");

        match self.platform.delete_service(location).await {
            Ok(()) => {
                info!(service = %location.name, "Service deleted");
                Ok(DeleteResult { deleted: true })
            }
            Err(e) if e.is_not_found() => {
                info!(service = %location.name, "Service does not exist, nothing to delete");
                Ok(DeleteResult { deleted: false })
            }
            Err(e) => Err(e),
        }
    }
}
