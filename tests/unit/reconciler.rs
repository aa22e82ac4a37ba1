//! Full reconciliation pass tests

use std::collections::BTreeSet;
use std::sync::Arc;

use db_target_sync::health::HealthState;
use db_target_sync::{Anomaly, ReconcileOutcome, RoleRequest, reconcile};

use crate::common::*;

#[tokio::test]
async fn test_reader_pass_replaces_stale_targets() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .reader("m2")
        .autoscaled_reader("m3")
        .build();
    let m2 = fixture.ip_of("m2");
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP).with_targets([target(99)]));
    let ctx = fixture.into_context(group.clone());

    let summary = reconcile(&config(RoleRequest::Reader), &ctx).await.unwrap();

    assert_eq!(summary.desired, BTreeSet::from([m2]));
    assert_eq!(summary.registered, 1);
    assert_eq!(summary.deregistered, 1);
    assert_eq!(summary.role, RoleRequest::Reader);
    assert_eq!(summary.target_group, TARGET_GROUP);
    assert_eq!(group.ips(), BTreeSet::from([m2]));
}

#[tokio::test]
async fn test_writer_pass() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .reader("m2")
        .build();
    let m1 = fixture.ip_of("m1");
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP));
    let ctx = fixture.into_context(group.clone());

    let summary = reconcile(&config(RoleRequest::Writer), &ctx).await.unwrap();

    assert_eq!(summary.desired, BTreeSet::from([m1]));
    assert_eq!(group.ips(), BTreeSet::from([m1]));
}

#[tokio::test]
async fn test_repeated_pass_changes_nothing() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .reader("m2")
        .reader("m4")
        .build();
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP).with_targets([target(1)]));
    let ctx = fixture.into_context(group.clone());
    let config = config(RoleRequest::Reader);

    let first = reconcile(&config, &ctx).await.unwrap();
    assert!(first.changed());
    group.clear_calls();

    let second = reconcile(&config, &ctx).await.unwrap();
    assert!(!second.changed());
    assert_eq!(second.desired, first.desired);
    assert!(group.calls().is_empty());
}

#[tokio::test]
async fn test_degraded_reader_pass_empties_group() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .unresolvable_reader_endpoint()
        .build();
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP).with_targets([target(2)]));
    let ctx = fixture.into_context(group.clone());

    let summary = reconcile(&config(RoleRequest::Reader), &ctx).await.unwrap();

    assert!(summary.desired.is_empty());
    assert_eq!(summary.deregistered, 1);
    assert!(matches!(
        summary.anomalies.as_slice(),
        [Anomaly::ReaderFallbackUnresolved { .. }]
    ));
    assert!(group.ips().is_empty());
}

#[tokio::test]
async fn test_standalone_pass() {
    let fixture = standalone("solo", None, "available");
    let solo = fixture.ip_of("solo");
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP));
    let ctx = fixture.into_context(group.clone());

    let summary = reconcile(&config_for("solo", RoleRequest::Writer), &ctx)
        .await
        .unwrap();

    assert_eq!(summary.desired, BTreeSet::from([solo]));
    let result: db_target_sync::Result<_> = Ok(summary);
    let outcome = ReconcileOutcome::from(&result);
    assert!(outcome.is_success());
    assert!(outcome.body.contains(&solo.to_string()));
}

#[tokio::test]
async fn test_lookup_failure_leaves_group_untouched() {
    let fixture = ClusterBuilder::new(CLUSTER_ID).writer("m1").build();
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP).with_targets([target(5)]));
    let ctx = fixture.into_context(group.clone());

    let result = reconcile(&config_for("missing-db", RoleRequest::Writer), &ctx).await;

    let outcome = ReconcileOutcome::from(&result);
    assert!(!outcome.is_success());
    assert_eq!(outcome.error_kind, Some("TopologyLookupFailure"));
    assert!(group.calls().is_empty());
    assert_eq!(group.ips(), BTreeSet::from([ip(5)]));
}

#[tokio::test]
async fn test_pass_recorded_in_health_state() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .reader("m2")
        .build();
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP));
    let health_state = Arc::new(HealthState::new());
    let ctx = fixture
        .into_context(group)
        .with_health_state(health_state.clone());

    assert!(!health_state.is_ready().await);
    reconcile(&config(RoleRequest::Reader), &ctx).await.unwrap();
    assert!(health_state.is_ready().await);
}

#[tokio::test]
async fn test_wrong_target_group_fails() {
    let fixture = ClusterBuilder::new(CLUSTER_ID).writer("m1").build();
    let group = Arc::new(FakeTargetGroup::new("some-other-group"));
    let ctx = fixture.into_context(group);

    let err = reconcile(&config(RoleRequest::Writer), &ctx)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "TargetGroupApiFailure");
}

#[tokio::test]
async fn test_reprovisioned_standalone_empties_group() {
    let fixture = standalone_without_endpoint("solo", "creating");
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP).with_targets([target(50)]));
    let ctx = fixture.into_context(group.clone());

    let summary = reconcile(&config_for("solo", RoleRequest::Writer), &ctx)
        .await
        .unwrap();

    assert!(summary.desired.is_empty());
    assert_eq!(summary.deregistered, 1);
    assert!(group.ips().is_empty());
}

#[tokio::test]
async fn test_creating_reader_does_not_block_writer_pass() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .reader("m2")
        .with_status("creating")
        .without_endpoint()
        .build();
    let m1 = fixture.ip_of("m1");
    let group = Arc::new(FakeTargetGroup::new(TARGET_GROUP).with_targets([target(2)]));
    let ctx = fixture.into_context(group.clone());

    let summary = reconcile(&config(RoleRequest::Writer), &ctx).await.unwrap();

    assert_eq!(summary.desired, BTreeSet::from([m1]));
    assert_eq!(group.ips(), BTreeSet::from([m1]));
}
