//! Progress reporting on the pull request

pub mod comment;
pub mod render;

use async_trait::async_trait;

use crate::errors::DeployError;

pub use comment::{CommentReporter, EnvHintLookup};
pub use render::ReportContext;

/// Handle of a posted comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommentId(pub u64);

/// Remote side of the status comment
#[async_trait]
pub trait CommentApi: Send + Sync {
    async fn post(&self, body: &str) -> Result<CommentId, DeployError>;

    async fn update(&self, id: CommentId, body: &str) -> Result<CommentId, DeployError>;
}
