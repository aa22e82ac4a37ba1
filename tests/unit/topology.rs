//! Tests for topology inspection

use db_target_sync::topology::inspect;
use db_target_sync::{ApiError, MemberRole, TopologyView};

use crate::common::*;

fn member<'a>(view: &'a TopologyView, id: &str) -> &'a db_target_sync::TopologyMember {
    view.members()
        .iter()
        .find(|m| m.instance_id == id)
        .unwrap_or_else(|| panic!("member {} missing", id))
}

#[tokio::test]
async fn test_cluster_roles_from_membership() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .reader("m2")
        .autoscaled_reader("m3")
        .build();

    let view = inspect(&fixture.database, CLUSTER_ID).await.unwrap();

    assert_eq!(view.kind(), "cluster");
    assert_eq!(view.members().len(), 3);
    assert_eq!(member(&view, "m1").role, MemberRole::Writer);
    assert_eq!(member(&view, "m2").role, MemberRole::Reader);
    assert!(!member(&view, "m2").excluded);
    assert!(member(&view, "m3").excluded);
}

#[tokio::test]
async fn test_cluster_surfaces_reader_endpoint() {
    let fixture = ClusterBuilder::new(CLUSTER_ID).writer("m1").build();

    let view = inspect(&fixture.database, CLUSTER_ID).await.unwrap();

    match view {
        TopologyView::Cluster {
            reader_fallback_host,
            ..
        } => assert_eq!(reader_fallback_host.as_deref(), Some(READER_ENDPOINT)),
        other => panic!("expected cluster, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unlisted_instance_has_unknown_role() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .unlisted("m9")
        .build();

    let view = inspect(&fixture.database, CLUSTER_ID).await.unwrap();

    assert_eq!(member(&view, "m9").role, MemberRole::Unknown);
}

#[tokio::test]
async fn test_instances_of_other_clusters_ignored() {
    let fixture = ClusterBuilder::new(CLUSTER_ID).writer("m1").build();
    let database = fixture
        .database
        .with_instance(instance("other-1", Some("db2")))
        .with_instance(instance("loner", None));

    let view = inspect(&database, CLUSTER_ID).await.unwrap();

    assert_eq!(view.members().len(), 1);
    assert_eq!(view.members()[0].instance_id, "m1");
}

#[tokio::test]
async fn test_cluster_availability_carried_not_gated() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .with_status("rebooting")
        .build();

    let view = inspect(&fixture.database, CLUSTER_ID).await.unwrap();

    let writer = member(&view, "m1");
    assert!(!writer.available);
    assert_eq!(writer.role, MemberRole::Writer);
}

#[tokio::test]
async fn test_falls_back_to_standalone_instance() {
    let fixture = standalone("solo", None, "available");

    let view = inspect(&fixture.database, "solo").await.unwrap();

    assert_eq!(view.kind(), "instance");
    let solo = member(&view, "solo");
    assert_eq!(solo.role, MemberRole::Writer);
    assert!(solo.available);
    assert!(!solo.is_read_replica);
}

#[tokio::test]
async fn test_standalone_read_replica_is_reader() {
    let fixture = standalone("replica-1", Some("solo"), "available");

    let view = inspect(&fixture.database, "replica-1").await.unwrap();

    let replica = member(&view, "replica-1");
    assert_eq!(replica.role, MemberRole::Reader);
    assert!(replica.is_read_replica);
}

#[tokio::test]
async fn test_standalone_autoscaling_tag_excludes() {
    let fixture = standalone("solo", None, "available");
    let database = fixture
        .database
        .with_tag(&arn("solo"), db_target_sync::topology::AUTOSCALING_TAG_KEY, "x");

    let view = inspect(&database, "solo").await.unwrap();

    assert!(member(&view, "solo").excluded);
}

#[tokio::test]
async fn test_unknown_identifier_fails() {
    let fixture = ClusterBuilder::new(CLUSTER_ID).writer("m1").build();

    let err = inspect(&fixture.database, "nope").await.unwrap_err();

    assert_eq!(err.kind(), "TopologyLookupFailure");
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn test_control_plane_error_propagates() {
    let database = FakeDatabase::new()
        .with_instance(instance("solo", None))
        .failing_cluster_lookup(ApiError::Service("AccessDenied".to_string()));

    let err = inspect(&database, "solo").await.unwrap_err();

    // Only "no such cluster" falls through to the instance lookup
    assert_eq!(err.kind(), "TopologyLookupFailure");
    assert!(err.to_string().contains("AccessDenied"));
}

#[tokio::test]
async fn test_tag_lookup_error_propagates() {
    let fixture = ClusterBuilder::new(CLUSTER_ID).writer("m1").reader("m2").build();
    let database = fixture
        .database
        .failing_tag_lookup(&arn("m2"), ApiError::Transport("timeout".to_string()));

    let err = inspect(&database, CLUSTER_ID).await.unwrap_err();

    assert_eq!(err.kind(), "TopologyLookupFailure");
    assert!(err.to_string().contains("m2"));
}

#[tokio::test]
async fn test_instance_without_endpoint_kept_in_view() {
    let fixture = ClusterBuilder::new(CLUSTER_ID)
        .writer("m1")
        .reader("m2")
        .with_status("creating")
        .without_endpoint()
        .build();

    let view = inspect(&fixture.database, CLUSTER_ID).await.unwrap();

    let creating = member(&view, "m2");
    assert_eq!(creating.endpoint_host, None);
    assert!(!creating.available);
    assert_eq!(member(&view, "m1").endpoint_host, Some(host("m1")));
}

#[tokio::test]
async fn test_standalone_without_endpoint_kept_in_view() {
    let fixture = standalone_without_endpoint("solo", "creating");

    let view = inspect(&fixture.database, "solo").await.unwrap();

    let solo = member(&view, "solo");
    assert_eq!(solo.endpoint_host, None);
    assert!(!solo.available);
}
