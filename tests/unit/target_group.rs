//! Tests for applying target group diffs

use std::collections::BTreeSet;

use db_target_sync::RegisteredTarget;
use db_target_sync::controller::target_group::reconcile;
use db_target_sync::controller::TargetSet;

use crate::common::*;

#[tokio::test]
async fn test_minimal_diff_applied() {
    let group = FakeTargetGroup::new(TARGET_GROUP).with_targets([target(1), target(2), target(3)]);
    let desired: TargetSet = [ip(2), ip(3), ip(4)].into();

    let plan = reconcile(&group, TARGET_GROUP, &desired, TARGET_PORT)
        .await
        .unwrap();

    assert_eq!(plan.to_register, BTreeSet::from([ip(4)]));
    assert_eq!(plan.deregister_ips(), BTreeSet::from([ip(1)]));
    assert_eq!(
        group.calls(),
        vec![
            TargetGroupCall::Deregister(vec![target(1)]),
            TargetGroupCall::Register(vec![target(4)]),
        ]
    );
    assert_eq!(group.ips(), desired);
}

#[tokio::test]
async fn test_no_calls_when_in_sync() {
    let group = FakeTargetGroup::new(TARGET_GROUP).with_targets([target(1), target(2)]);
    let desired: TargetSet = [ip(1), ip(2)].into();

    let plan = reconcile(&group, TARGET_GROUP, &desired, TARGET_PORT)
        .await
        .unwrap();

    assert!(plan.is_empty());
    assert!(group.calls().is_empty());
}

#[tokio::test]
async fn test_second_pass_is_noop() {
    let group = FakeTargetGroup::new(TARGET_GROUP).with_targets([target(9)]);
    let desired: TargetSet = [ip(1), ip(2)].into();

    reconcile(&group, TARGET_GROUP, &desired, TARGET_PORT)
        .await
        .unwrap();
    group.clear_calls();

    let plan = reconcile(&group, TARGET_GROUP, &desired, TARGET_PORT)
        .await
        .unwrap();

    assert!(plan.is_empty());
    assert!(group.calls().is_empty());
}

#[tokio::test]
async fn test_registers_on_configured_port() {
    let group = FakeTargetGroup::new(TARGET_GROUP);
    let desired: TargetSet = [ip(7)].into();

    reconcile(&group, TARGET_GROUP, &desired, 5432).await.unwrap();

    assert_eq!(
        group.calls(),
        vec![TargetGroupCall::Register(vec![RegisteredTarget {
            ip: ip(7),
            port: 5432
        }])]
    );
}

#[tokio::test]
async fn test_deregisters_with_observed_port() {
    let stale = RegisteredTarget {
        ip: ip(3),
        port: 3307,
    };
    let group = FakeTargetGroup::new(TARGET_GROUP).with_targets([stale]);

    reconcile(&group, TARGET_GROUP, &TargetSet::new(), TARGET_PORT)
        .await
        .unwrap();

    assert_eq!(group.calls(), vec![TargetGroupCall::Deregister(vec![stale])]);
    assert!(group.ips().is_empty());
}

#[tokio::test]
async fn test_register_failure_keeps_deregistration() {
    let group = FakeTargetGroup::new(TARGET_GROUP)
        .with_targets([target(1)])
        .failing_register();
    let desired: TargetSet = [ip(2)].into();

    let err = reconcile(&group, TARGET_GROUP, &desired, TARGET_PORT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "TargetGroupApiFailure");
    // Not transactional: the removal already happened
    assert!(group.ips().is_empty());
}

#[tokio::test]
async fn test_describe_failure_is_fatal() {
    let group = FakeTargetGroup::new(TARGET_GROUP).failing_describe();

    let err = reconcile(&group, TARGET_GROUP, &[ip(1)].into(), TARGET_PORT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "TargetGroupApiFailure");
    assert!(group.calls().is_empty());
}
