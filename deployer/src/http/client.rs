//! HTTP client implementation

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::DeployError;
use crate::utils::user_agent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Bearer-authenticated JSON client shared by every remote API
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self, DeployError> {
        Self::with_default_headers(HeaderMap::new())
    }

    /// Create a client that sends `headers` on every request
    pub fn with_default_headers(headers: HeaderMap) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent())
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, DeployError> {
        let response = self.send(self.request(Method::GET, url, token)).await?;
        Ok(response.json().await?)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self
            .send(self.request(Method::POST, url, token).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self
            .send(self.request(Method::PUT, url, token).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// Make a PATCH request
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        token: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self
            .send(self.request(Method::PATCH, url, token).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// Make a DELETE request, ignoring the response body
    pub async fn delete(&self, url: &str, token: &str) -> Result<(), DeployError> {
        self.send(self.request(Method::DELETE, url, token)).await?;
        Ok(())
    }

    /// Make a HEAD request; success means the resource exists
    pub async fn head(&self, url: &str, token: &str) -> Result<(), DeployError> {
        self.send(
            self.request(Method::HEAD, url, token)
                .header(header::ACCEPT, HeaderValue::from_static("*/*")),
        )
        .await?;
        Ok(())
    }

    /// Exchange a signed JWT assertion for an access token
    pub async fn exchange_assertion(
        &self,
        token_uri: &str,
        assertion: &str,
    ) -> Result<TokenResponse, DeployError> {
        debug!("POST {} (token exchange)", token_uri);

        let response = self
            .client
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token exchange failed: {} - {}", status, body);
            return Err(DeployError::TokenError(format!(
                "Token exchange failed: {} - {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    fn request(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.client.request(method, url).bearer_auth(token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DeployError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            debug!("HTTP request to {} failed: {} - {}", url, status, body);
            return Err(DeployError::from_status(status, &body));
        }

        Ok(response)
    }
}

/// OAuth2 token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default = "default_expires_in")]
    pub expires_in: i64,

    #[serde(default)]
    pub token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}
