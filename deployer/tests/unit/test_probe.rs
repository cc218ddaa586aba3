//! Image availability probe tests

use std::sync::Arc;
use std::time::Duration;

use cloudrun_deployer::deploy::poll::PollPolicy;
use cloudrun_deployer::deploy::probe::RegistryAvailabilityProbe;
use cloudrun_deployer::errors::{DeployError, ErrorClass};
use cloudrun_deployer::models::image::ImageReference;

use crate::fakes::FakeRegistry;

fn image() -> ImageReference {
    ImageReference::parse("eu.gcr.io/acme-preview/web:sha-123").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_probe_waits_for_image() {
    let registry = Arc::new(FakeRegistry::available_on(3));
    let probe = RegistryAvailabilityProbe::new(
        registry.clone(),
        PollPolicy::new(Duration::from_secs(5), 10),
    );

    let started = tokio::time::Instant::now();
    assert!(probe.probe(&image()).await.unwrap());
    assert_eq!(registry.probes(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn test_probe_gives_up_after_budget() {
    let registry = Arc::new(FakeRegistry::never());
    let probe = RegistryAvailabilityProbe::new(
        registry.clone(),
        PollPolicy::from_timeout(Duration::from_secs(5), Duration::from_secs(20)),
    );

    assert!(!probe.probe(&image()).await.unwrap());
    assert_eq!(registry.probes(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_probe_auth_failure_is_fatal() {
    let registry = Arc::new(FakeRegistry::failing(403, "denied"));
    let probe = RegistryAvailabilityProbe::new(registry.clone(), PollPolicy::default());

    let err = probe.probe(&image()).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::FatalAuth);
    assert!(matches!(err, DeployError::AuthError(_)));
    assert_eq!(registry.probes(), 1);
}
