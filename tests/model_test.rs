//! Integration tests for the event and incident data model.

mod common;

use common::*;
use incident_agent::error::Error;
use incident_agent::model::*;
use k8s_openapi::api::core::v1::Pod;
use serde_json::json;

fn event(name: &str, owner: Option<&OwnerRef>, criticality: Criticality) -> ClassifiedEvent {
    ClassifiedEvent::pod(&ObjectKey::new("shop", name), &Phase::Running, criticality).owner(owner)
}

fn ready(status: ConditionStatus) -> Condition {
    Condition::new("Ready", status)
}

// ---------------------------------------------------------------------------
// IncidentId
// ---------------------------------------------------------------------------

#[test]
fn incident_id_renders_and_parses_back() {
    let id = IncidentId::new("api", "shop").unwrap();
    let rendered = id.to_string();

    assert_eq!(rendered, "incident:api:shop");
    assert_eq!(rendered.split(':').nth(1), Some("api"));

    let parsed: IncidentId = rendered.parse().unwrap();
    assert_eq!(parsed, id);
    assert_eq!(parsed.release_name(), "api");
    assert_eq!(parsed.namespace(), "shop");
}

#[test]
fn incident_id_rejects_malformed_input() {
    for bad in [
        "",
        "incident:api",
        "incident:api:shop:extra",
        "issue:api:shop",
        "incident::shop",
    ] {
        assert!(
            matches!(bad.parse::<IncidentId>(), Err(Error::InvalidIncidentId(_))),
            "{bad:?} should not parse"
        );
    }
    assert!(IncidentId::new("a:b", "shop").is_err());
}

#[test]
fn incident_id_uses_owner_or_falls_back_to_pod() {
    let deployment = OwnerRef::new("Deployment", "api");
    let owned = event("api-5d8f-x", Some(&deployment), Criticality::Critical);
    let bare = event("standalone", None, Criticality::Critical);

    assert_eq!(
        IncidentId::for_event(&owned).unwrap().to_string(),
        "incident:api:shop"
    );
    assert_eq!(
        IncidentId::for_event(&bare).unwrap().to_string(),
        "incident:standalone:shop"
    );
}

#[test]
fn incident_id_serializes_as_string() {
    let id = IncidentId::new("api", "shop").unwrap();
    assert_eq!(serde_json::to_value(&id).unwrap(), json!("incident:api:shop"));
    assert!(serde_json::from_value::<IncidentId>(json!("nope")).is_err());
}

// ---------------------------------------------------------------------------
// Incident lifecycle
// ---------------------------------------------------------------------------

#[test]
fn only_critical_events_open_incidents() {
    let normal = event("api-1", None, Criticality::Normal);
    assert!(Incident::open(normal).unwrap().is_none());

    let critical = event("api-1", None, Criticality::Critical)
        .reason_and_message("Waiting: CrashLoopBackOff".into(), "back-off".into());
    let incident = Incident::open(critical).unwrap().unwrap();

    assert_eq!(incident.state, IncidentState::Ongoing);
    assert_eq!(incident.events.len(), 1);
    assert_eq!(incident.latest_reason(), "Waiting: CrashLoopBackOff");
    assert_eq!(incident.latest_message(), "back-off");
}

#[test]
fn incident_lifecycle_resolves_and_reopens() {
    let deployment = OwnerRef::new("Deployment", "api");
    let mut incident = Incident::open(event("api-1", Some(&deployment), Criticality::Critical))
        .unwrap()
        .unwrap();

    // Normal but not healthy: stays open.
    let unknown = event("api-1", Some(&deployment), Criticality::Normal)
        .condition(Some(&ready(ConditionStatus::Unknown)));
    assert_eq!(incident.record(unknown), IncidentTransition::Appended);
    assert_eq!(incident.state, IncidentState::Ongoing);

    let again = event("api-2", Some(&deployment), Criticality::Critical)
        .reason_and_message("Terminated: Error".into(), "exit 1".into());
    assert_eq!(incident.record(again), IncidentTransition::Appended);
    assert_eq!(incident.latest_reason(), "Terminated: Error");

    let healthy = event("api-2", Some(&deployment), Criticality::Normal)
        .condition(Some(&ready(ConditionStatus::True)));
    assert_eq!(incident.record(healthy), IncidentTransition::Resolved);
    assert!(incident.state.is_resolved());
    assert_eq!(incident.events.len(), 4);

    let quiet = event("api-3", Some(&deployment), Criticality::Normal)
        .condition(Some(&ready(ConditionStatus::True)));
    assert_eq!(incident.record(quiet), IncidentTransition::Ignored);
    assert_eq!(incident.events.len(), 4);

    let relapse = event("api-3", Some(&deployment), Criticality::Critical);
    assert_eq!(incident.record(relapse), IncidentTransition::Reopened);
    assert_eq!(incident.state, IncidentState::Ongoing);
    assert_eq!(incident.events.len(), 5);
}

#[test]
fn state_labels_match_query_layer() {
    assert_eq!(IncidentState::Ongoing.label(), "ONGOING");
    assert_eq!(IncidentState::Resolved.label(), "RESOLVED");
    assert_eq!(
        "RESOLVED".parse::<IncidentState>().unwrap(),
        IncidentState::Resolved
    );
    assert!("resolved".parse::<IncidentState>().is_err());
    assert_eq!(
        serde_json::to_value(IncidentState::Ongoing).unwrap(),
        json!("ONGOING")
    );
}

// ---------------------------------------------------------------------------
// ClassifiedEvent wire format
// ---------------------------------------------------------------------------

#[test]
fn classified_event_uses_wire_field_names() {
    let deployment = OwnerRef::new("Deployment", "api");
    let event = ClassifiedEvent::pod(
        &ObjectKey::new("shop", "api-1"),
        &Phase::Running,
        Criticality::Critical,
    )
    .owner(Some(&deployment))
    .condition(Some(&ready(ConditionStatus::False)))
    .reason_and_message("Waiting: CrashLoopBackOff".into(), "back-off".into());

    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["resource_type"], "Pod");
    assert_eq!(value["owner_name"], "api");
    assert_eq!(value["owner_type"], "Deployment");
    assert_eq!(value["pod_phase"], "Running");
    assert_eq!(value["pod_status"], "Type: Ready, Status: False");
    assert_eq!(value["event_type"], "Critical");
    assert!(value.get("cluster").is_none());

    let back: ClassifiedEvent = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
}

#[test]
fn hpa_resource_kind_is_upper_case() {
    assert_eq!(serde_json::to_value(ResourceKind::Hpa).unwrap(), json!("HPA"));
}

#[test]
fn condition_summary_parses_its_rendering() {
    let summary: ConditionSummary = "Type: ContainersReady, Status: Unknown".parse().unwrap();
    assert_eq!(summary.kind, "ContainersReady");
    assert_eq!(summary.status, ConditionStatus::Unknown);
    assert!(!summary.is_healthy());

    assert!("Ready=True".parse::<ConditionSummary>().is_err());
}

#[test]
fn healthy_requires_normal_and_true_condition() {
    let with = |criticality, status| {
        event("api-1", None, criticality)
            .condition(Some(&ready(status)))
            .is_healthy()
    };
    assert!(with(Criticality::Normal, ConditionStatus::True));
    assert!(!with(Criticality::Normal, ConditionStatus::Unknown));
    assert!(!with(Criticality::Critical, ConditionStatus::True));
    assert!(!event("api-1", None, Criticality::Normal).is_healthy());
}

// ---------------------------------------------------------------------------
// Pod conversion
// ---------------------------------------------------------------------------

#[test]
fn converts_pod_from_api_object() {
    let pod: Pod = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": "api-5d8f-x",
            "namespace": "shop",
            "ownerReferences": [{
                "apiVersion": "apps/v1",
                "kind": "ReplicaSet",
                "name": "api-5d8f",
                "uid": "0d9f2c1a-0000-0000-0000-000000000000"
            }]
        },
        "spec": {
            "containers": [
                {"name": "web", "image": "web:1"},
                {"name": "sidecar", "image": "proxy:1"}
            ]
        },
        "status": {
            "phase": "Running",
            "conditions": [{
                "type": "Ready",
                "status": "False",
                "lastTransitionTime": "2024-05-01T12:00:00Z",
                "reason": "ContainersNotReady",
                "message": "containers with unready status: [web]"
            }],
            "containerStatuses": [
                {
                    "name": "web",
                    "image": "web:1",
                    "imageID": "",
                    "ready": false,
                    "restartCount": 4,
                    "state": {"waiting": {"reason": "CrashLoopBackOff", "message": "back-off"}}
                },
                {
                    "name": "sidecar",
                    "image": "proxy:1",
                    "imageID": "",
                    "ready": true,
                    "restartCount": 0,
                    "state": {"running": {"startedAt": "2024-05-01T11:00:00Z"}}
                }
            ]
        }
    }))
    .unwrap();

    let instance = WorkloadInstance::from(&pod);

    assert_eq!(instance.key(), ObjectKey::new("shop", "api-5d8f-x"));
    assert_eq!(instance.phase, Phase::Running);
    assert!(instance.is_multi_container());
    assert_eq!(instance.containers, vec!["web", "sidecar"]);
    assert_eq!(
        instance.owner_references,
        vec![OwnerRef::new("ReplicaSet", "api-5d8f")]
    );

    let condition = &instance.conditions[0];
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(
        condition.last_transition.map(|t| t.to_rfc3339()),
        Some("2024-05-01T12:00:00+00:00".to_string())
    );

    assert_eq!(
        instance.container_statuses[0].state,
        waiting("CrashLoopBackOff", "back-off")
    );
    assert!(matches!(
        instance.container_statuses[1].state,
        ContainerState::Running { started_at: Some(_) }
    ));
}

#[test]
fn converts_pod_without_status() {
    let pod: Pod = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": "fresh", "namespace": "default"}
    }))
    .unwrap();

    let instance = WorkloadInstance::from(&pod);

    assert_eq!(instance.phase, Phase::Other(String::new()));
    assert!(instance.conditions.is_empty());
    assert!(instance.container_statuses.is_empty());
    assert!(!instance.is_multi_container());
}
