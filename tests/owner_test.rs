//! Integration tests for owner attribution.

mod common;

use common::*;
use incident_agent::model::*;
use incident_agent::owner::resolve_owner;
use tracing::Span;

fn owned_by(owners: Vec<OwnerRef>) -> WorkloadInstance {
    let mut instance = WorkloadInstance::new("shop", "pod-1", Phase::Running);
    instance.owner_references = owners;
    instance
}

#[tokio::test]
async fn replica_set_resolves_to_deployment() {
    let cluster = FakeCluster::new().with_replica_set(
        "shop",
        "api-5d8f",
        vec![OwnerRef::new("Deployment", "api")],
    );
    let instance = owned_by(vec![OwnerRef::new("ReplicaSet", "api-5d8f")]);

    let owner = resolve_owner(&cluster, &instance, &Span::none()).await;

    assert_eq!(owner, Some(OwnerRef::new("Deployment", "api")));
    assert_eq!(cluster.lookups(), 1);
}

#[tokio::test]
async fn direct_owner_needs_no_lookup() {
    let cluster = FakeCluster::new();
    let instance = owned_by(vec![OwnerRef::new("StatefulSet", "db")]);

    let owner = resolve_owner(&cluster, &instance, &Span::none()).await;

    assert_eq!(owner, Some(OwnerRef::new("StatefulSet", "db")));
    assert_eq!(cluster.lookups(), 0);
}

#[tokio::test]
async fn only_the_first_owner_is_considered() {
    let cluster = FakeCluster::new();
    let instance = owned_by(vec![
        OwnerRef::new("Job", "migrate"),
        OwnerRef::new("Deployment", "api"),
    ]);

    let owner = resolve_owner(&cluster, &instance, &Span::none()).await;
    assert_eq!(owner, Some(OwnerRef::new("Job", "migrate")));
}

#[tokio::test]
async fn at_most_one_hop_is_followed() {
    // A ReplicaSet owned by another ReplicaSet is reported as-is.
    let cluster = FakeCluster::new()
        .with_replica_set("shop", "outer", vec![OwnerRef::new("ReplicaSet", "inner")])
        .with_replica_set("shop", "inner", vec![OwnerRef::new("Deployment", "api")]);
    let instance = owned_by(vec![OwnerRef::new("ReplicaSet", "outer")]);

    let owner = resolve_owner(&cluster, &instance, &Span::none()).await;

    assert_eq!(owner, Some(OwnerRef::new("ReplicaSet", "inner")));
    assert_eq!(cluster.lookups(), 1);
}

#[tokio::test]
async fn unresolvable_owners_degrade_to_none() {
    let missing = FakeCluster::new();
    let orphaned = FakeCluster::new().with_replica_set("shop", "api-5d8f", vec![]);
    let broken = FakeCluster::new().failing_replica_sets();
    let instance = owned_by(vec![OwnerRef::new("ReplicaSet", "api-5d8f")]);

    for cluster in [missing, orphaned, broken] {
        assert_eq!(resolve_owner(&cluster, &instance, &Span::none()).await, None);
    }
    assert_eq!(
        resolve_owner(&FakeCluster::new(), &owned_by(vec![]), &Span::none()).await,
        None
    );
}
