//! Step outputs for the CI runner

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::DeployError;

/// Appends `key=value` lines to the runner's output file, when there is one
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    path: Option<PathBuf>,
}

impl StepOutputs {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DeployError> {
        let Some(path) = &self.path else {
            debug!(key, value, "No output file, skipping output");
            return Ok(());
        };

        if value.contains('\n') {
            return Err(DeployError::Internal(format!(
                "Output '{}' must be a single line",
                key
            )));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(format!("{}={}\n", key, value).as_bytes())
            .await?;
        file.flush().await?;
        Ok(())
    }

    /// Outputs are informational; a failed write is logged only
    pub async fn set_or_warn(&self, key: &str, value: &str) {
        if let Err(e) = self.set(key, value).await {
            warn!(key, error = %e, "Failed to write step output");
        }
    }
}
