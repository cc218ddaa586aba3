//! GitHub webhook and REST models

use serde::{Deserialize, Serialize};

/// The parts of the triggering event payload this tool reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub pull_request: Option<PullRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,

    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Issue comment as returned by the REST API
#[derive(Debug, Clone, Deserialize)]
pub struct IssueComment {
    pub id: u64,

    #[serde(default)]
    pub html_url: Option<String>,
}

/// Comment create/update body
#[derive(Debug, Clone, Serialize)]
pub struct CommentBody<'a> {
    pub body: &'a str,
}
