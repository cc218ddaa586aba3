//! Command line and action inputs
//!
//! Every flag can also come from the `INPUT_*` variable the CI runner sets for
//! the matching action input, so the binary runs unchanged as an action step.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use secrecy::SecretString;

use crate::deploy::poll::{PollPolicy, IMAGE_POLL_INTERVAL, IMAGE_POLL_TIMEOUT};
use crate::deploy::reconciler::ReconcilerSettings;
use crate::http::github::DEFAULT_API_BASE;
use crate::logs::{LogLevel, LogOptions};

pub const DEFAULT_ENV_PREFIX: &str = "CLOUDRUN_ACTION_";

#[derive(Parser, Debug, Clone)]
#[command(name = "cloudrun-deployer")]
#[command(about = "Deploy a container image to Cloud Run and report progress on the pull request")]
#[command(version)]
pub struct Options {
    /// Service name, normalized before use
    #[arg(long, env = "INPUT_NAME")]
    pub name: String,

    /// Cloud Run region
    #[arg(long, env = "INPUT_REGION")]
    pub region: String,

    /// Fully qualified image reference
    #[arg(long, env = "INPUT_IMAGE")]
    pub image: String,

    /// Identity the service runs as
    #[arg(long, env = "INPUT_SERVICE_ACCOUNT_NAME")]
    pub service_account_name: Option<String>,

    /// Service account key JSON
    #[arg(long, env = "INPUT_SERVICE_ACCOUNT_KEY", hide_env_values = true)]
    pub service_account_key: String,

    /// Serverless VPC connector to attach
    #[arg(long, env = "INPUT_VPC_CONNECTOR_NAME")]
    pub vpc_connector_name: Option<String>,

    /// Delete the service instead of deploying it
    #[arg(long, env = "INPUT_DELETE", default_value = "false", value_parser = parse_flag, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub delete: bool,

    /// Grant `allUsers` the invoker role
    #[arg(long, env = "INPUT_ALLOW_UNAUTHENTICATED", default_value = "false", value_parser = parse_flag, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub allow_unauthenticated: bool,

    /// Seconds between image probes
    #[arg(long, env = "INPUT_IMAGE_POLL_INTERVAL", default_value_t = IMAGE_POLL_INTERVAL.as_secs())]
    pub image_poll_interval_secs: u64,

    /// Seconds to wait for the image overall
    #[arg(long, env = "INPUT_IMAGE_POLL_TIMEOUT", default_value_t = IMAGE_POLL_TIMEOUT.as_secs())]
    pub image_poll_timeout_secs: u64,

    /// Probe the registry over plain HTTP
    #[arg(long, env = "INPUT_INSECURE_REGISTRY", default_value = "false", value_parser = parse_flag, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub insecure_registry: bool,

    /// Read the image's declared environment with docker for the report
    #[arg(long, env = "INPUT_INSPECT_IMAGE", default_value = "true", value_parser = parse_flag, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub inspect_image: bool,

    /// Docker executable
    #[arg(long, env = "INPUT_DOCKER", default_value = "docker")]
    pub docker: String,

    /// Token for the pull request comment; no comment without it
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    pub github_api_url: String,

    /// Process variables with this prefix become service variables
    #[arg(long, env = "INPUT_ENV_PREFIX", default_value = DEFAULT_ENV_PREFIX)]
    pub env_prefix: String,

    /// Override the Cloud Run API base, e.g. for an emulator
    #[arg(long, env = "INPUT_RUN_API_URL")]
    pub run_api_url: Option<String>,

    /// Where the key file is written; defaults to the runner's temp dir
    #[arg(long, env = "RUNNER_TEMP")]
    pub credentials_dir: Option<PathBuf>,

    #[arg(long, env = "INPUT_LOG_LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[arg(long, env = "INPUT_LOG_JSON", default_value = "false", value_parser = parse_flag, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub log_json: bool,

    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repository: Option<String>,

    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub github_event_path: Option<PathBuf>,

    #[arg(long, env = "GITHUB_OUTPUT")]
    pub github_output: Option<PathBuf>,
}

/// Boolean input; an unset action input arrives empty and means false
fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
        "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
        other => Err(format!("invalid boolean: {}", other)),
    }
}

impl Options {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level,
            json_format: self.log_json,
        }
    }

    pub fn reconciler_settings(&self) -> ReconcilerSettings {
        ReconcilerSettings {
            image_poll: PollPolicy::image_visibility(
                Duration::from_secs(self.image_poll_interval_secs),
                Duration::from_secs(self.image_poll_timeout_secs),
            ),
            readiness_poll: PollPolicy::readiness(),
            allow_unauthenticated: self.allow_unauthenticated,
        }
    }

    pub fn service_account_key(&self) -> SecretString {
        SecretString::from(self.service_account_key.clone())
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.credentials_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn runtime_identity(&self) -> Option<String> {
        non_empty(&self.service_account_name)
    }

    pub fn network_connector(&self) -> Option<String> {
        non_empty(&self.vpc_connector_name)
    }

    pub fn github_token(&self) -> Option<String> {
        non_empty(&self.github_token)
    }

    /// An empty prefix would match the whole runner environment, secrets included
    pub fn env_prefix(&self) -> &str {
        match self.env_prefix.trim() {
            "" => DEFAULT_ENV_PREFIX,
            prefix => prefix,
        }
    }
}

/// Unset action inputs arrive as empty strings
fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
