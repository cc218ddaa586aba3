//! Seams to the remote control plane and registry

use async_trait::async_trait;
use run_api::{Policy, Service};

use crate::deploy::request::{DeploymentRequest, ServiceName};
use crate::errors::DeployError;
use crate::models::image::ImageReference;

/// Address of one service resource
///
/// Built once per invocation from the normalized name; every remote call for
/// the service goes through the same location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocation {
    pub project: String,
    pub region: String,
    pub name: ServiceName,
}

impl ServiceLocation {
    pub fn new(project: impl Into<String>, region: impl Into<String>, name: ServiceName) -> Self {
        Self {
            project: project.into(),
            region: region.into(),
            name,
        }
    }

    pub fn for_request(project: impl Into<String>, request: &DeploymentRequest) -> Self {
        Self::new(project, request.region.clone(), request.service_name.clone())
    }

    /// Knative-style path: `namespaces/{project}/services/{name}`
    pub fn namespace_path(&self) -> String {
        format!("namespaces/{}/services/{}", self.project, self.name)
    }

    /// Resource path used by the IAM endpoints
    pub fn resource_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/services/{}",
            self.project, self.region, self.name
        )
    }

    /// Console page with the service logs; needs no remote call
    pub fn logs_url(&self) -> String {
        format!(
            "https://console.cloud.google.com/run/detail/{}/{}/logs?project={}",
            self.region, self.name, self.project
        )
    }
}

/// Cloud Run service operations
#[async_trait]
pub trait ServicePlatform: Send + Sync {
    /// Fetch the service; `DeployError::NotFound` when it does not exist
    async fn get_service(&self, location: &ServiceLocation) -> Result<Service, DeployError>;

    async fn create_service(
        &self,
        location: &ServiceLocation,
        service: &Service,
    ) -> Result<Service, DeployError>;

    /// Replace the whole spec of an existing service
    async fn replace_service(
        &self,
        location: &ServiceLocation,
        service: &Service,
    ) -> Result<Service, DeployError>;

    /// Delete the service; `DeployError::NotFound` when it does not exist
    async fn delete_service(&self, location: &ServiceLocation) -> Result<(), DeployError>;

    async fn set_iam_policy(
        &self,
        location: &ServiceLocation,
        policy: &Policy,
    ) -> Result<(), DeployError>;
}

/// Container registry operations
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Succeeds when the manifest resolves; `DeployError::NotFound` when it does not
    async fn manifest_exists(&self, image: &ImageReference) -> Result<(), DeployError>;
}
