//! Image inspection through the docker CLI

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::image::ImageMetadataSource;
use crate::models::image::ImageReference;

/// Username the registry expects for service account key logins
const JSON_KEY_USER: &str = "_json_key";

#[derive(Debug, Deserialize)]
struct ImageConfig {
    #[serde(rename = "Env", default)]
    env: Option<Vec<String>>,
}

/// Pulls the image and reads its declared environment
pub struct DockerInspector {
    docker: String,
    key_file: PathBuf,
}

impl DockerInspector {
    pub fn new(docker: impl Into<String>, key_file: PathBuf) -> Self {
        Self {
            docker: docker.into(),
            key_file,
        }
    }

    pub async fn inspect(&self, image: &ImageReference) -> Result<Vec<String>, DeployError> {
        self.login(image.host()).await;

        debug!("Pulling image: {}", image);
        let pull_status = self
            .command()
            .args(["pull", "--quiet", image.as_str()])
            .stdout(Stdio::null())
            .status()
            .await
            .map_err(|e| DeployError::ImageError(format!("Failed to run docker pull: {}", e)))?;

        if !pull_status.success() {
            return Err(DeployError::ImageError(format!("Docker pull failed for {}", image)));
        }

        let output = self
            .command()
            .args(["image", "inspect", "--format", "{{json .Config}}", image.as_str()])
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| DeployError::ImageError(format!("Failed to run docker inspect: {}", e)))?;

        if !output.status.success() {
            return Err(DeployError::ImageError(format!("Docker inspect failed for {}", image)));
        }

        let env = parse_config(&String::from_utf8_lossy(&output.stdout))?;
        info!(image = %image, count = env.len(), "Read image environment");
        Ok(env)
    }

    /// Failure is not fatal: public images pull without it
    async fn login(&self, host: &str) {
        let password = match tokio::fs::read(&self.key_file).await {
            Ok(password) => password,
            Err(e) => {
                debug!("Failed to read credential file: {}, attempting anonymous pull", e);
                return;
            }
        };

        let login_result: Result<bool, std::io::Error> = async {
            let mut child = self
                .command()
                .args(["login", host, "-u", JSON_KEY_USER, "--password-stdin"])
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(&password).await?;
            }
            let output = child.wait_with_output().await?;
            Ok(output.status.success())
        }
        .await;

        match login_result {
            Ok(true) => debug!("Authenticated with {}", host),
            Ok(false) => debug!("Authentication with {} failed, attempting anonymous pull", host),
            Err(e) => debug!("Failed to run docker login: {}, attempting anonymous pull", e),
        }
    }

    /// The key file is handed to the child only, never to our own environment
    fn command(&self) -> Command {
        let mut command = Command::new(&self.docker);
        command.env("GOOGLE_APPLICATION_CREDENTIALS", &self.key_file);
        command
    }
}

#[async_trait]
impl ImageMetadataSource for DockerInspector {
    async fn lookup_env(&self, image: &ImageReference) -> Option<Vec<String>> {
        match self.inspect(image).await {
            Ok(env) => Some(env),
            Err(e) => {
                warn!(image = %image, error = %e, "Could not read image environment");
                None
            }
        }
    }
}

/// Parse the output of `docker image inspect --format '{{json .Config}}'`
pub fn parse_config(raw: &str) -> Result<Vec<String>, DeployError> {
    let config: ImageConfig = serde_json::from_str(raw.trim())
        .map_err(|e| DeployError::ImageError(format!("Unexpected image config: {}", e)))?;
    Ok(config.env.unwrap_or_default())
}
