//! Readiness polling tests

use std::sync::Arc;
use std::time::Duration;

use cloudrun_deployer::deploy::poll::PollPolicy;
use cloudrun_deployer::deploy::readiness::ReadinessPoller;
use cloudrun_deployer::deploy::spec::build_descriptor;
use cloudrun_deployer::errors::{DeployError, ErrorClass};

use crate::fakes::{
    location, pending, ready, request, status, Call, FakePlatform, PROJECT, SERVICE_URL,
};

fn deployed() -> FakePlatform {
    let mut service = build_descriptor(&request("pr-42"), PROJECT).resource().clone();
    service.metadata.generation = Some(1);
    FakePlatform::with_existing(service)
}

#[tokio::test(start_paused = true)]
async fn test_ready_after_a_few_polls() {
    let platform = Arc::new(deployed());
    platform.script([pending(), pending(), ready()]);
    let poller = ReadinessPoller::new(platform.clone(), PollPolicy::readiness());

    let started = tokio::time::Instant::now();
    let ready = poller.wait_for_ready(&location("pr-42")).await.unwrap();

    assert_eq!(ready.endpoint_url, SERVICE_URL);
    assert_eq!(
        ready.logs_url,
        "https://console.cloud.google.com/run/detail/europe-west1/pr-42/logs?project=acme-preview"
    );
    assert_eq!(platform.count(|c| matches!(c, Call::Get(_))), 3);
    // one interval of initial delay plus two between attempts
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_failed_condition_stops_polling() {
    let platform = Arc::new(deployed());
    platform.script([
        pending(),
        status("False", None, Some("Image 'eu.gcr.io/acme-preview/web:sha-123' not found.")),
        ready(),
    ]);
    let poller = ReadinessPoller::new(platform.clone(), PollPolicy::readiness());

    let err = poller.wait_for_ready(&location("pr-42")).await.unwrap_err();

    match err {
        DeployError::ServiceFailed(message) => assert!(message.contains("not found")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(platform.count(|c| matches!(c, Call::Get(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn test_times_out_while_in_progress() {
    let platform = Arc::new(deployed());
    platform.script([pending()]);
    let poller = ReadinessPoller::new(
        platform.clone(),
        PollPolicy::new(Duration::from_millis(500), 5),
    );

    let err = poller.wait_for_ready(&location("pr-42")).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Timeout);
    assert_eq!(platform.count(|c| matches!(c, Call::Get(_))), 5);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_retried() {
    // nothing stored yet: every fetch is NotFound
    let platform = Arc::new(FakePlatform::new());
    let poller = ReadinessPoller::new(
        platform.clone(),
        PollPolicy::new(Duration::from_millis(500), 3),
    );

    let err = poller.wait_for_ready(&location("pr-42")).await.unwrap_err();

    assert!(matches!(err, DeployError::Timeout(_)));
    assert_eq!(platform.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_is_fatal() {
    let platform = Arc::new(deployed());
    platform.fail_gets(403, "caller lacks run.services.get");
    let poller = ReadinessPoller::new(platform.clone(), PollPolicy::readiness());

    let err = poller.wait_for_ready(&location("pr-42")).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::FatalAuth);
    assert_eq!(platform.calls().len(), 1);
}
