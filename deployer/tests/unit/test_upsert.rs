//! Create-or-replace tests

use std::sync::Arc;

use cloudrun_deployer::deploy::spec::build_descriptor;
use cloudrun_deployer::deploy::upsert::ServiceUpserter;
use cloudrun_deployer::errors::DeployError;

use crate::fakes::{request, Call, FakePlatform, PROJECT};

#[tokio::test]
async fn test_upsert_creates_then_replaces() {
    let platform = Arc::new(FakePlatform::new());
    let upserter = ServiceUpserter::new(platform.clone());
    let descriptor = build_descriptor(&request("pr-42"), PROJECT);

    let first = upserter.upsert(&descriptor).await.unwrap();
    assert!(first.created);

    let second = upserter.upsert(&descriptor).await.unwrap();
    assert!(!second.created);

    let path = "namespaces/acme-preview/services/pr-42".to_string();
    assert_eq!(
        platform.calls(),
        vec![
            Call::Get(path.clone()),
            Call::Create(path.clone()),
            Call::Get(path.clone()),
            Call::Replace(path),
        ]
    );

    let stored = platform.stored().unwrap();
    assert_eq!(stored.metadata.generation, Some(2));
    assert_eq!(stored.spec, descriptor.resource().spec);
}

#[tokio::test]
async fn test_upsert_does_not_write_when_lookup_fails() {
    let platform = Arc::new(FakePlatform::new());
    platform.fail_gets(500, "backend unavailable");
    let upserter = ServiceUpserter::new(platform.clone());

    let err = upserter
        .upsert(&build_descriptor(&request("pr-42"), PROJECT))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::RemoteError { status: 500, .. }));
    assert_eq!(platform.calls().len(), 1);
}

#[tokio::test]
async fn test_upsert_write_failure_propagates() {
    let platform = Arc::new(FakePlatform::new());
    platform.fail_writes(403, "permission denied on run.services.create");
    let upserter = ServiceUpserter::new(platform.clone());

    let err = upserter
        .upsert(&build_descriptor(&request("pr-42"), PROJECT))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::AuthError(_)));
    assert_eq!(platform.count(|c| matches!(c, Call::Create(_))), 1);
    assert!(platform.stored().is_none());
}
