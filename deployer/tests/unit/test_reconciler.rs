//! End-to-end reconciliation scenarios

use std::sync::Arc;
use std::time::Duration;

use cloudrun_deployer::deploy::events::Phase;
use cloudrun_deployer::deploy::poll::PollPolicy;
use cloudrun_deployer::deploy::reconciler::{
    DeploymentReconciler, ReconcilerSettings, ReconciliationOutcome,
};

use crate::fakes::{
    pending, ready, request, status, Call, FakePlatform, FakeRegistry, RecordingSink, PROJECT,
    SERVICE_URL,
};

struct Harness {
    platform: Arc<FakePlatform>,
    registry: Arc<FakeRegistry>,
    sink: Arc<RecordingSink>,
    reconciler: DeploymentReconciler,
}

fn harness(registry: FakeRegistry, settings: ReconcilerSettings) -> Harness {
    let platform = Arc::new(FakePlatform::new());
    let registry = Arc::new(registry);
    let sink = Arc::new(RecordingSink::default());
    let reconciler =
        DeploymentReconciler::new(platform.clone(), registry.clone(), sink.clone(), settings);
    Harness {
        platform,
        registry,
        sink,
        reconciler,
    }
}

fn settings() -> ReconcilerSettings {
    ReconcilerSettings {
        image_poll: PollPolicy::new(Duration::from_secs(5), 2),
        readiness_poll: PollPolicy::readiness(),
        allow_unauthenticated: false,
    }
}

#[tokio::test(start_paused = true)]
async fn test_image_never_appears() {
    let h = harness(FakeRegistry::never(), settings());

    let outcome = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;

    assert_eq!(outcome, ReconciliationOutcome::ImageNotFound);
    assert_eq!(h.registry.probes(), 2);
    assert!(h.platform.calls().is_empty());
    assert_eq!(h.sink.phases(), vec![Phase::ProbingImage, Phase::ImageNotFound]);
    assert_eq!(h.sink.events().iter().filter(|e| e.phase.is_failure()).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_first_deploy_becomes_ready() {
    let h = harness(FakeRegistry::available_on(1), settings());
    h.platform.script([pending(), pending(), ready()]);

    let outcome = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;

    assert_eq!(
        outcome,
        ReconciliationOutcome::Ready {
            endpoint_url: SERVICE_URL.to_string(),
            logs_url: "https://console.cloud.google.com/run/detail/europe-west1/pr-42/logs?project=acme-preview"
                .to_string(),
        }
    );

    let path = "namespaces/acme-preview/services/pr-42".to_string();
    assert_eq!(
        h.platform.calls(),
        vec![
            Call::Get(path.clone()),
            Call::Create(path.clone()),
            Call::Get(path.clone()),
            Call::Get(path.clone()),
            Call::Get(path),
        ]
    );
    assert_eq!(
        h.sink.phases(),
        vec![Phase::ProbingImage, Phase::Upserting, Phase::WaitingReady, Phase::Ready]
    );
    assert!(h.sink.events().last().unwrap().detail.contains(SERVICE_URL));
}

#[tokio::test(start_paused = true)]
async fn test_bad_image_fails_fast() {
    let h = harness(FakeRegistry::available_on(1), settings());
    h.platform.script([status("False", None, Some("bad image"))]);

    let outcome = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;

    assert_eq!(
        outcome,
        ReconciliationOutcome::ServiceError {
            message: "bad image".to_string()
        }
    );
    // one readiness fetch after the upsert lookup
    assert_eq!(h.platform.count(|c| matches!(c, Call::Get(_))), 2);
    assert_eq!(h.sink.phases().last(), Some(&Phase::ServiceError));
}

#[tokio::test(start_paused = true)]
async fn test_redeploy_replaces_existing_service() {
    let h = harness(FakeRegistry::available_on(1), settings());
    h.platform.script([ready()]);

    let first = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;
    let second = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;

    assert!(first.is_ready());
    assert!(second.is_ready());
    assert_eq!(h.platform.count(|c| matches!(c, Call::Create(_))), 1);
    assert_eq!(h.platform.count(|c| matches!(c, Call::Replace(_))), 1);
    assert_eq!(h.platform.stored().unwrap().metadata.generation, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_readiness_timeout() {
    let mut settings = settings();
    settings.readiness_poll = PollPolicy::new(Duration::from_millis(500), 4);
    let h = harness(FakeRegistry::available_on(1), settings);
    h.platform.script([pending()]);

    let outcome = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;

    assert_eq!(outcome, ReconciliationOutcome::Timeout);
    assert_eq!(h.sink.phases().last(), Some(&Phase::Timeout));
    assert_eq!(h.platform.count(|c| matches!(c, Call::Get(_))), 5);
}

#[tokio::test(start_paused = true)]
async fn test_upsert_failure_skips_readiness() {
    let h = harness(FakeRegistry::available_on(1), settings());
    h.platform.fail_writes(400, "Revision template should contain exactly one container");

    let outcome = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;

    match outcome {
        ReconciliationOutcome::ServiceError { message } => {
            assert!(message.contains("exactly one container"))
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.platform.count(|c| matches!(c, Call::Get(_))), 1);
    assert_eq!(
        h.sink.phases(),
        vec![Phase::ProbingImage, Phase::Upserting, Phase::ServiceError]
    );
}

#[tokio::test(start_paused = true)]
async fn test_access_policy_failure_does_not_fail_deployment() {
    let mut settings = settings();
    settings.allow_unauthenticated = true;
    let h = harness(FakeRegistry::available_on(1), settings);
    h.platform.script([ready()]);
    h.platform.fail_iam(403, "setIamPolicy denied");

    let outcome = h.reconciler.reconcile(&request("pr-42"), PROJECT).await;

    assert!(outcome.is_ready());
    assert_eq!(h.platform.count(|c| matches!(c, Call::SetIamPolicy(_))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_every_call_uses_the_normalized_name() {
    let mut settings = settings();
    settings.allow_unauthenticated = true;
    let h = harness(FakeRegistry::available_on(1), settings);
    h.platform.script([ready()]);

    let request = request("PR #42 / Feature_X");
    assert!(h.reconciler.reconcile(&request, PROJECT).await.is_ready());
    let deleted = h.reconciler.teardown(&request, PROJECT).await.unwrap();
    assert!(deleted.deleted);

    let calls = h.platform.calls();
    assert!(calls.iter().any(|c| matches!(c, Call::SetIamPolicy(_))));
    assert!(calls.iter().any(|c| matches!(c, Call::Delete(_))));
    for call in calls {
        let path = match call {
            Call::Get(p) | Call::Create(p) | Call::Replace(p) | Call::Delete(p) | Call::SetIamPolicy(p) => p,
        };
        assert!(path.ends_with("/services/pr-42-feature-x"), "{path}");
    }
}

#[tokio::test]
async fn test_teardown_of_missing_service() {
    let h = harness(FakeRegistry::never(), settings());

    let result = h.reconciler.teardown(&request("pr-42"), PROJECT).await.unwrap();

    assert!(!result.deleted);
    assert_eq!(h.sink.phases(), vec![Phase::Deleting, Phase::Deleted]);
    assert_eq!(h.registry.probes(), 0);
}

#[tokio::test]
async fn test_teardown_failure_is_reported() {
    let h = harness(FakeRegistry::never(), settings());
    h.platform.fail_writes(500, "internal");

    assert!(h.reconciler.teardown(&request("pr-42"), PROJECT).await.is_err());
    assert_eq!(h.sink.phases(), vec![Phase::Deleting, Phase::ServiceError]);
}
