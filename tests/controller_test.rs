//! Integration tests for mapping pass results onto controller actions.

mod common;

use std::time::Duration;

use common::transport_error;
use incident_agent::engine::{ControllerConfig, ReconcileOutcome, action_for, action_for_error};
use incident_agent::error::Error;
use incident_agent::model::{ClassifiedEvent, Criticality, ObjectKey, Phase};
use kube::runtime::controller::Action;

fn config() -> ControllerConfig {
    ControllerConfig {
        namespace: None,
        requeue_after: Duration::from_secs(7),
        error_requeue_after: Duration::from_secs(45),
    }
}

#[test]
fn incomplete_status_requeues_after_short_delay() {
    assert_eq!(
        action_for(&ReconcileOutcome::Requeue, &config()),
        Action::requeue(Duration::from_secs(7))
    );
}

#[test]
fn finished_passes_wait_for_the_next_change() {
    let event = ClassifiedEvent::pod(
        &ObjectKey::new("default", "api-1"),
        &Phase::Failed,
        Criticality::Critical,
    );
    assert_eq!(
        action_for(&ReconcileOutcome::NoOp, &config()),
        Action::await_change()
    );
    assert_eq!(
        action_for(&ReconcileOutcome::Emitted(Box::new(event)), &config()),
        Action::await_change()
    );
}

#[test]
fn retryable_errors_requeue_after_error_delay() {
    assert_eq!(
        action_for_error(&transport_error(), &config()),
        Action::requeue(Duration::from_secs(45))
    );
    assert_eq!(
        action_for_error(&Error::Dispatch("pod_events: down".into()), &config()),
        Action::requeue(Duration::from_secs(45))
    );
}

#[test]
fn permanent_errors_wait_for_the_next_change() {
    assert_eq!(
        action_for_error(&Error::InvalidIncidentId("x".into()), &config()),
        Action::await_change()
    );
}

#[test]
fn default_delays() {
    let config = ControllerConfig::default();
    assert_eq!(config.requeue_after, Duration::from_secs(5));
    assert_eq!(config.error_requeue_after, Duration::from_secs(30));
    assert!(config.namespace.is_none());
}
