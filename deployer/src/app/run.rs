//! One invocation: deploy or delete, report, write outputs

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::Options;
use crate::app::outputs::StepOutputs;
use crate::authn::credentials::Credentials;
use crate::authn::token_mngr::{StaticToken, TokenManager, TokenSource};
use crate::deploy::events::{LogSink, ProgressSink};
use crate::deploy::reconciler::{DeploymentReconciler, ReconciliationOutcome};
use crate::deploy::request::{DeploymentRequest, EnvironmentMapping};
use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::http::github::GithubClient;
use crate::http::registry::RegistryClient;
use crate::http::run::{RunClient, RunEndpoints};
use crate::image::{DockerInspector, ImageMetadataSource};
use crate::models::github::EventPayload;
use crate::models::image::ImageReference;
use crate::report::{CommentReporter, EnvHintLookup, ReportContext};

/// What the invocation amounts to, for the exit code and the final line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub success: bool,
    pub message: String,
}

/// Run the deployer with fully parsed options
pub async fn run(options: Options) -> Result<RunSummary, DeployError> {
    let payload = read_event(options.github_event_path.as_deref()).await;

    let mut environment = EnvironmentMapping::from_prefixed(
        unicode_vars(std::env::vars_os()),
        options.env_prefix(),
    );
    if let Some(pr) = &payload.pull_request {
        environment.apply_labels(pr.labels.iter().map(|label| label.name.as_str()));
    }

    let request = DeploymentRequest::new(
        &options.name,
        &options.region,
        ImageReference::parse(&options.image)?,
        options.runtime_identity(),
        options.network_connector(),
        environment,
    )?;

    let credentials = Credentials::acquire(&options.credentials_dir(), &options.service_account_key()).await?;
    info!(
        project = credentials.project_id(),
        service = %request.service_name,
        region = %request.region,
        "Loaded credentials"
    );

    let result = execute(&options, &credentials, &payload, &request).await;
    credentials.release().await;
    result
}

async fn execute(
    options: &Options,
    credentials: &Credentials,
    payload: &EventPayload,
    request: &DeploymentRequest,
) -> Result<RunSummary, DeployError> {
    let http_client = Arc::new(HttpClient::new()?);
    let tokens: Arc<dyn TokenSource> = Arc::new(TokenManager::new(credentials.key(), http_client.clone()));

    let endpoints = match &options.run_api_url {
        Some(base) => RunEndpoints::with_base(base)?,
        None => RunEndpoints::default(),
    };
    let platform = Arc::new(RunClient::new(http_client.clone(), tokens.clone(), endpoints));

    let mut registry = RegistryClient::new(http_client, tokens);
    if options.insecure_registry {
        registry = registry.insecure();
    }

    let context = ReportContext {
        service: request.service_name.to_string(),
        region: request.region.clone(),
        image: request.image.to_string(),
    };
    let sink = progress_sink(options, credentials, payload, request, context)?;

    let reconciler = DeploymentReconciler::new(
        platform,
        Arc::new(registry),
        sink,
        options.reconciler_settings(),
    );
    let outputs = StepOutputs::new(options.github_output.clone());
    let project = credentials.project_id();

    if options.delete {
        let result = reconciler.teardown(request, project).await?;
        outputs.set_or_warn("deleted", &result.deleted.to_string()).await;
        let message = if result.deleted {
            format!("Deleted service {}", request.service_name)
        } else {
            format!("Service {} did not exist", request.service_name)
        };
        return Ok(RunSummary {
            success: true,
            message,
        });
    }

    let outcome = reconciler.reconcile(request, project).await;
    if let ReconciliationOutcome::Ready { endpoint_url, logs_url } = &outcome {
        outputs.set_or_warn("url", endpoint_url).await;
        outputs.set_or_warn("logs_url", logs_url).await;
    }

    Ok(RunSummary {
        success: outcome.is_ready(),
        message: outcome.to_string(),
    })
}

/// Comment on the pull request when there is one to comment on
fn progress_sink(
    options: &Options,
    credentials: &Credentials,
    payload: &EventPayload,
    request: &DeploymentRequest,
    context: ReportContext,
) -> Result<Arc<dyn ProgressSink>, DeployError> {
    let (Some(token), Some(repository), Some(pr)) = (
        options.github_token(),
        options.github_repository.as_deref(),
        payload.pull_request.as_ref(),
    ) else {
        info!("No pull request to comment on, reporting to the log only");
        return Ok(Arc::new(LogSink));
    };

    let client = GithubClient::new(
        Arc::new(StaticToken::new(token)),
        &options.github_api_url,
        repository,
        pr.number,
    )?;
    info!(repository, pull_request = pr.number, "Reporting progress on the pull request");
    let mut reporter = CommentReporter::new(Arc::new(client), context);
    if options.inspect_image && !options.delete {
        let source: Arc<dyn ImageMetadataSource> = Arc::new(DockerInspector::new(
            options.docker.clone(),
            credentials.key_file().to_path_buf(),
        ));
        reporter = reporter.with_env_hints(EnvHintLookup {
            source,
            image: request.image.clone(),
            overrides: request.environment.clone(),
        });
    }
    Ok(Arc::new(reporter))
}

/// Process variables that are valid unicode; others cannot be service variables
fn unicode_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter().filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
        (Ok(key), Ok(value)) => Some((key, value)),
        (key, _) => {
            warn!(variable = ?key, "Skipping non-unicode environment variable");
            None
        }
    })
}

/// A missing or unreadable event means no pull request context
async fn read_event(path: Option<&Path>) -> EventPayload {
    let Some(path) = path else {
        return EventPayload::default();
    };

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read event payload");
            return EventPayload::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse event payload");
            EventPayload::default()
        }
    }
}
