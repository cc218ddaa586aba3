//! Cloud Run admin API client

use std::sync::Arc;

use async_trait::async_trait;
use run_api::{Policy, Service, SetIamPolicyRequest};
use url::Url;

use crate::authn::token_mngr::TokenSource;
use crate::deploy::platform::{ServiceLocation, ServicePlatform};
use crate::errors::DeployError;
use crate::http::client::HttpClient;

const KNATIVE_API_PATH: &str = "apis/serving.knative.dev/v1";

/// Where the admin API lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEndpoints {
    /// Fixed base for the namespaced API; regional endpoints are used when unset
    pub namespaced_base: Option<String>,

    /// Base of the v1 projects API (IAM)
    pub projects_base: String,
}

impl Default for RunEndpoints {
    fn default() -> Self {
        Self {
            namespaced_base: None,
            projects_base: "https://run.googleapis.com".to_string(),
        }
    }
}

impl RunEndpoints {
    /// Point both APIs at one base URL (emulators, proxies)
    pub fn with_base(base: &str) -> Result<Self, DeployError> {
        let base = Url::parse(base)
            .map_err(|e| DeployError::ConfigError(format!("Invalid endpoint '{}': {}", base, e)))?;
        let base = base.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            namespaced_base: Some(base.clone()),
            projects_base: base,
        })
    }

    fn namespaced_root(&self, region: &str) -> String {
        match &self.namespaced_base {
            Some(base) => base.clone(),
            None => format!("https://{}-run.googleapis.com", region),
        }
    }

    /// `.../namespaces/{project}/services/{name}`
    pub fn service_url(&self, location: &ServiceLocation) -> String {
        format!(
            "{}/{}/{}",
            self.namespaced_root(&location.region),
            KNATIVE_API_PATH,
            location.namespace_path()
        )
    }

    /// `.../namespaces/{project}/services`
    pub fn services_url(&self, location: &ServiceLocation) -> String {
        format!(
            "{}/{}/namespaces/{}/services",
            self.namespaced_root(&location.region),
            KNATIVE_API_PATH,
            location.project
        )
    }

    /// `.../v1/projects/{project}/locations/{region}/services/{name}:setIamPolicy`
    pub fn set_iam_policy_url(&self, location: &ServiceLocation) -> String {
        format!(
            "{}/v1/{}:setIamPolicy",
            self.projects_base,
            location.resource_path()
        )
    }
}

/// Cloud Run client
pub struct RunClient {
    http_client: Arc<HttpClient>,
    tokens: Arc<dyn TokenSource>,
    endpoints: RunEndpoints,
}

impl RunClient {
    pub fn new(http_client: Arc<HttpClient>, tokens: Arc<dyn TokenSource>, endpoints: RunEndpoints) -> Self {
        Self {
            http_client,
            tokens,
            endpoints,
        }
    }
}

#[async_trait]
impl ServicePlatform for RunClient {
    async fn get_service(&self, location: &ServiceLocation) -> Result<Service, DeployError> {
        let token = self.tokens.access_token().await?;
        self.http_client
            .get(&self.endpoints.service_url(location), token.secret())
            .await
    }

    async fn create_service(
        &self,
        location: &ServiceLocation,
        service: &Service,
    ) -> Result<Service, DeployError> {
        let token = self.tokens.access_token().await?;
        self.http_client
            .post(&self.endpoints.services_url(location), token.secret(), service)
            .await
    }

    async fn replace_service(
        &self,
        location: &ServiceLocation,
        service: &Service,
    ) -> Result<Service, DeployError> {
        let token = self.tokens.access_token().await?;
        self.http_client
            .put(&self.endpoints.service_url(location), token.secret(), service)
            .await
    }

    async fn delete_service(&self, location: &ServiceLocation) -> Result<(), DeployError> {
        let token = self.tokens.access_token().await?;
        self.http_client
            .delete(&self.endpoints.service_url(location), token.secret())
            .await
    }

    async fn set_iam_policy(
        &self,
        location: &ServiceLocation,
        policy: &Policy,
    ) -> Result<(), DeployError> {
        let token = self.tokens.access_token().await?;
        let request = SetIamPolicyRequest {
            policy: policy.clone(),
        };
        let _: serde_json::Value = self
            .http_client
            .post(&self.endpoints.set_iam_policy_url(location), token.secret(), &request)
            .await?;
        Ok(())
    }
}
