//! Container registry client (Docker Registry HTTP API v2)

use std::sync::Arc;

use async_trait::async_trait;

use crate::authn::token_mngr::TokenSource;
use crate::deploy::platform::ImageRegistry;
use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::models::image::ImageReference;

/// Registry client authenticating with the deployer's own access token
pub struct RegistryClient {
    http_client: Arc<HttpClient>,
    tokens: Arc<dyn TokenSource>,
    scheme: &'static str,
}

impl RegistryClient {
    pub fn new(http_client: Arc<HttpClient>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http_client,
            tokens,
            scheme: "https",
        }
    }

    /// Talk plain HTTP, for local registries
    pub fn insecure(mut self) -> Self {
        self.scheme = "http";
        self
    }

    pub fn manifest_url(&self, image: &ImageReference) -> String {
        format!("{}://{}{}", self.scheme, image.host(), image.manifest_path())
    }
}

#[async_trait]
impl ImageRegistry for RegistryClient {
    async fn manifest_exists(&self, image: &ImageReference) -> Result<(), DeployError> {
        let token = self.tokens.access_token().await?;
        self.http_client
            .head(&self.manifest_url(image), token.secret())
            .await
    }
}
