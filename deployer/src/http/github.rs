//! GitHub issue comment client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};

use crate::authn::token_mngr::TokenSource;
use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::models::github::{CommentBody, IssueComment};
use crate::report::{CommentApi, CommentId};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

/// Comments on one pull request
pub struct GithubClient {
    http_client: HttpClient,
    token: Arc<dyn TokenSource>,
    api_base: String,
    repository: String,
    issue_number: u64,
}

impl GithubClient {
    pub fn new(
        token: Arc<dyn TokenSource>,
        api_base: &str,
        repository: &str,
        issue_number: u64,
    ) -> Result<Self, DeployError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        );

        Ok(Self {
            http_client: HttpClient::with_default_headers(headers)?,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            issue_number,
        })
    }

    pub fn comments_url(&self) -> String {
        format!(
            "{}/repos/{}/issues/{}/comments",
            self.api_base, self.repository, self.issue_number
        )
    }

    pub fn comment_url(&self, id: CommentId) -> String {
        format!("{}/repos/{}/issues/comments/{}", self.api_base, self.repository, id.0)
    }
}

#[async_trait]
impl CommentApi for GithubClient {
    async fn post(&self, body: &str) -> Result<CommentId, DeployError> {
        let token = self.token.access_token().await?;
        let comment: IssueComment = self
            .http_client
            .post(&self.comments_url(), token.secret(), &CommentBody { body })
            .await?;
        Ok(CommentId(comment.id))
    }

    async fn update(&self, id: CommentId, body: &str) -> Result<CommentId, DeployError> {
        let token = self.token.access_token().await?;
        let comment: IssueComment = self
            .http_client
            .patch(&self.comment_url(id), token.secret(), &CommentBody { body })
            .await?;
        Ok(CommentId(comment.id))
    }
}
