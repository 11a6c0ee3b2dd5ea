//! Status analysis: latest condition, per-container state, and the
//! reason/message pair attached to a classified event.
//!
//! Everything here is pure. The engine feeds it a snapshot and a resolved
//! owner kind; nothing is fetched or logged.

pub mod container_ref;

use std::cmp::Reverse;
use std::sync::Arc;

use crate::model::{Condition, ContainerState, ContainerStatus, WorkloadInstance};
use crate::owner::JOB_KIND;

pub use container_ref::{FailingContainerParser, UnreadyStatusParser};

/// Most recent transition first. Stable, so conditions with equal (or
/// missing) transition times keep their original relative order.
pub fn sort_conditions(conditions: &mut [Condition]) {
    conditions.sort_by_key(|c| Reverse(c.last_transition));
}

/// A sorted copy of the instance's conditions.
pub fn sorted_conditions(instance: &WorkloadInstance) -> Vec<Condition> {
    let mut conditions = instance.conditions.clone();
    sort_conditions(&mut conditions);
    conditions
}

/// Run-to-completion semantics: any container that terminated non-zero
/// fails the pod.
pub fn job_failed(statuses: &[ContainerStatus]) -> bool {
    statuses.iter().any(|s| s.state.is_failed_termination())
}

/// Reason/message for one container state.
pub fn describe_state(state: &ContainerState) -> (String, String) {
    match state {
        ContainerState::Running { started_at } => {
            let started = started_at.map(|t| t.to_rfc3339()).unwrap_or_default();
            (String::new(), format!("Container started at: {started}"))
        }
        ContainerState::Terminated {
            reason, message, ..
        } => (format!("Terminated: {reason}"), message.clone()),
        ContainerState::Waiting { reason, message } => {
            (format!("Waiting: {reason}"), message.clone())
        }
    }
}

/// Produces the reason/message pair for an instance.
#[derive(Clone)]
pub struct StatusAnalyzer {
    parser: Arc<dyn FailingContainerParser>,
}

impl Default for StatusAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(UnreadyStatusParser))
    }
}

impl StatusAnalyzer {
    pub fn new(parser: Arc<dyn FailingContainerParser>) -> Self {
        Self { parser }
    }

    /// `latest` is the most recent condition after [`sort_conditions`].
    pub fn reason_and_message(
        &self,
        instance: &WorkloadInstance,
        latest: Option<&Condition>,
        owner_kind: &str,
    ) -> (String, String) {
        if !instance.is_multi_container() {
            return describe_state(&container_state(instance, None));
        }

        if owner_kind == JOB_KIND {
            return composite_report(instance);
        }

        let failing = latest.and_then(|c| self.parser.failing_container(&c.message));
        match failing {
            Some(name) => describe_state(&container_state(instance, Some(&name))),
            None => composite_report(instance),
        }
    }
}

/// State of the named container, or of the only container when `name` is
/// `None`. A name with no status falls back to the zero-valued state; with
/// duplicate names the last match wins.
fn container_state(instance: &WorkloadInstance, name: Option<&str>) -> ContainerState {
    let statuses = &instance.container_statuses;
    let found = match name {
        None => statuses.first(),
        Some(name) => statuses.iter().rev().find(|s| s.name == name),
    };
    found.map(|s| s.state.clone()).unwrap_or_default()
}

/// One line per container status, in status order.
fn composite_report(instance: &WorkloadInstance) -> (String, String) {
    let (reasons, messages): (Vec<_>, Vec<_>) = instance
        .container_statuses
        .iter()
        .map(|status| {
            let (reason, message) = describe_state(&status.state);
            (
                format!("Container: {}, Reason: {reason}", status.name),
                format!("Container: {}, Message: {message}", status.name),
            )
        })
        .unzip();

    (reasons.join("\n"), messages.join("\n"))
}
