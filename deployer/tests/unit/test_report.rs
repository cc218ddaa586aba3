//! Pull request comment reporting driven by the reconciler

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cloudrun_deployer::deploy::poll::PollPolicy;
use cloudrun_deployer::deploy::reconciler::{DeploymentReconciler, ReconcilerSettings};
use cloudrun_deployer::deploy::reconciler::ReconciliationOutcome;
use cloudrun_deployer::errors::DeployError;
use cloudrun_deployer::image::ImageMetadataSource;
use cloudrun_deployer::models::image::ImageReference;
use cloudrun_deployer::report::{
    CommentApi, CommentId, CommentReporter, EnvHintLookup, ReportContext,
};

use crate::fakes::{pending, ready, request, FakePlatform, FakeRegistry, PROJECT, SERVICE_URL};

#[derive(Default)]
struct FakeComments {
    posts: Mutex<Vec<String>>,
    updates: Mutex<Vec<(CommentId, String)>>,
    broken: bool,
}

#[async_trait]
impl CommentApi for FakeComments {
    async fn post(&self, body: &str) -> Result<CommentId, DeployError> {
        if self.broken {
            return Err(DeployError::RemoteError {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        self.posts.lock().unwrap().push(body.to_string());
        Ok(CommentId(1001))
    }

    async fn update(&self, id: CommentId, body: &str) -> Result<CommentId, DeployError> {
        self.updates.lock().unwrap().push((id, body.to_string()));
        Ok(id)
    }
}

/// Image declaring `PATH` and `MODE`; counts lookups
#[derive(Default)]
struct FakeMetadata {
    lookups: AtomicU32,
}

#[async_trait]
impl ImageMetadataSource for FakeMetadata {
    async fn lookup_env(&self, _image: &ImageReference) -> Option<Vec<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Some(vec!["PATH=/usr/bin".to_string(), "MODE=production".to_string()])
    }
}

fn reporter_with_hints(
    comments: Arc<FakeComments>,
    metadata: Arc<FakeMetadata>,
) -> Arc<CommentReporter> {
    let request = request("pr-42");
    Arc::new(CommentReporter::new(comments, context()).with_env_hints(EnvHintLookup {
        source: metadata,
        image: request.image.clone(),
        overrides: request.environment.clone(),
    }))
}

fn context() -> ReportContext {
    ReportContext {
        service: "pr-42".to_string(),
        region: "europe-west1".to_string(),
        image: "eu.gcr.io/acme-preview/web:sha-123".to_string(),
    }
}

fn settings() -> ReconcilerSettings {
    ReconcilerSettings {
        image_poll: PollPolicy::new(Duration::from_secs(5), 3),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_comment_tracks_the_whole_deployment() {
    let platform = Arc::new(FakePlatform::new());
    platform.script([pending(), ready()]);
    let comments = Arc::new(FakeComments::default());
    let reporter = Arc::new(CommentReporter::new(comments.clone(), context()));

    let reconciler = DeploymentReconciler::new(
        platform,
        Arc::new(FakeRegistry::available_on(2)),
        reporter.clone(),
        settings(),
    );
    assert!(reconciler.reconcile(&request("pr-42"), PROJECT).await.is_ready());

    assert_eq!(comments.posts.lock().unwrap().len(), 1);
    let updates = comments.updates.lock().unwrap();
    assert_eq!(updates.len(), 3);
    assert!(updates.iter().all(|(id, _)| *id == CommentId(1001)));

    let (_, last) = updates.last().unwrap();
    assert!(last.contains("Waiting for image"));
    assert!(last.contains("Deploying service"));
    assert!(last.contains(SERVICE_URL));
    assert_eq!(reporter.history().await.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_reporting_failure_does_not_change_outcome() {
    let platform = Arc::new(FakePlatform::new());
    platform.script([ready()]);
    let comments = Arc::new(FakeComments {
        broken: true,
        ..Default::default()
    });

    let reconciler = DeploymentReconciler::new(
        platform,
        Arc::new(FakeRegistry::available_on(1)),
        Arc::new(CommentReporter::new(comments.clone(), context())),
        settings(),
    );

    assert!(reconciler.reconcile(&request("pr-42"), PROJECT).await.is_ready());
    assert!(comments.posts.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_image_environment_shown_once_image_exists() {
    let platform = Arc::new(FakePlatform::new());
    platform.script([pending(), ready()]);
    let comments = Arc::new(FakeComments::default());
    let metadata = Arc::new(FakeMetadata::default());

    let reconciler = DeploymentReconciler::new(
        platform,
        Arc::new(FakeRegistry::available_on(1)),
        reporter_with_hints(comments.clone(), metadata.clone()),
        settings(),
    );
    assert!(reconciler.reconcile(&request("pr-42"), PROJECT).await.is_ready());

    assert_eq!(metadata.lookups.load(Ordering::SeqCst), 1);

    // the first comment goes out before the image is inspected
    let posts = comments.posts.lock().unwrap();
    assert!(!posts[0].contains("Environment variables"));

    let updates = comments.updates.lock().unwrap();
    let (_, last) = updates.last().unwrap();
    assert!(last.contains("| `PATH` | image |"));
    assert!(last.contains("| `MODE` | image, overridden |"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_image_is_never_inspected() {
    let platform = Arc::new(FakePlatform::new());
    let comments = Arc::new(FakeComments::default());
    let metadata = Arc::new(FakeMetadata::default());

    let reconciler = DeploymentReconciler::new(
        platform,
        Arc::new(FakeRegistry::never()),
        reporter_with_hints(comments.clone(), metadata.clone()),
        settings(),
    );
    let outcome = reconciler.reconcile(&request("pr-42"), PROJECT).await;

    assert_eq!(outcome, ReconciliationOutcome::ImageNotFound);
    assert_eq!(metadata.lookups.load(Ordering::SeqCst), 0);
    let updates = comments.updates.lock().unwrap();
    assert!(!updates.last().unwrap().1.contains("Environment variables"));
}
