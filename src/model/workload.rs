//! Workload instance: the subset of a pod the engine reasons about.

use std::fmt;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{self as corev1, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Namespaced identity of a watched object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
    /// Empty or unrecognised phase string, kept verbatim.
    Other(String),
}

impl Phase {
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => Phase::Pending,
            "Running" => Phase::Running,
            "Succeeded" => Phase::Succeeded,
            "Failed" => Phase::Failed,
            "Unknown" => Phase::Unknown,
            other => Phase::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Phase::Pending => "Pending",
            Phase::Running => "Running",
            Phase::Succeeded => "Succeeded",
            Phase::Failed => "Failed",
            Phase::Unknown => "Unknown",
            Phase::Other(s) => s,
        }
    }

    /// Failed and Unknown pods are critical without looking at conditions.
    pub fn is_critical(&self) -> bool {
        matches!(self, Phase::Failed | Phase::Unknown)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pod condition such as `Ready` or `ContainersReady`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition type (`Ready`, `PodScheduled`, ...).
    pub kind: String,
    pub status: ConditionStatus,
    pub last_transition: Option<DateTime<Utc>>,
    pub reason: String,
    pub message: String,
}

impl Condition {
    pub fn new(kind: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            kind: kind.into(),
            status,
            last_transition: None,
            reason: String::new(),
            message: String::new(),
        }
    }

    pub fn transitioned_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_transition = Some(at);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// Runtime state of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContainerState {
    Waiting {
        reason: String,
        message: String,
    },
    Running {
        started_at: Option<DateTime<Utc>>,
    },
    Terminated {
        reason: String,
        message: String,
        exit_code: i32,
    },
}

impl Default for ContainerState {
    /// A container the kubelet has not reported on yet.
    fn default() -> Self {
        ContainerState::Waiting {
            reason: String::new(),
            message: String::new(),
        }
    }
}

impl ContainerState {
    /// Terminated with a non-zero exit code.
    pub fn is_failed_termination(&self) -> bool {
        matches!(self, ContainerState::Terminated { exit_code, .. } if *exit_code != 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    pub state: ContainerState,
}

impl ContainerStatus {
    pub fn new(name: impl Into<String>, state: ContainerState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

/// One entry of `metadata.ownerReferences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Workload instance
// ---------------------------------------------------------------------------

/// Snapshot of a pod as delivered by the watch stream. Never mutated by the
/// engine; analysis works on sorted copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadInstance {
    pub name: String,
    pub namespace: String,
    pub phase: Phase,
    pub conditions: Vec<Condition>,
    pub container_statuses: Vec<ContainerStatus>,
    pub owner_references: Vec<OwnerRef>,
    /// Container names from the pod spec, in declaration order.
    pub containers: Vec<String>,
}

impl WorkloadInstance {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            phase,
            conditions: Vec::new(),
            container_statuses: Vec::new(),
            owner_references: Vec::new(),
            containers: Vec::new(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// The pod spec declares more than one container.
    pub fn is_multi_container(&self) -> bool {
        self.containers.len() > 1
    }
}

impl From<&Pod> for WorkloadInstance {
    fn from(pod: &Pod) -> Self {
        let meta = &pod.metadata;
        let status = pod.status.as_ref();

        let conditions = status
            .and_then(|s| s.conditions.as_ref())
            .map(|cs| {
                cs.iter()
                    .map(|c| Condition {
                        kind: c.type_.clone(),
                        status: ConditionStatus::parse(&c.status),
                        last_transition: c.last_transition_time.as_ref().and_then(to_utc),
                        reason: c.reason.clone().unwrap_or_default(),
                        message: c.message.clone().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let container_statuses = status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|cs| {
                cs.iter()
                    .map(|c| ContainerStatus {
                        name: c.name.clone(),
                        state: c.state.as_ref().map(convert_state).unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let owner_references = meta
            .owner_references
            .as_ref()
            .map(|owners| {
                owners
                    .iter()
                    .map(|o| OwnerRef::new(&o.kind, &o.name))
                    .collect()
            })
            .unwrap_or_default();

        let containers = pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();

        Self {
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            phase: Phase::parse(status.and_then(|s| s.phase.as_deref()).unwrap_or("")),
            conditions,
            container_statuses,
            owner_references,
            containers,
        }
    }
}

/// Running wins over terminated, terminated over waiting; the kubelet only
/// ever populates one of them.
fn convert_state(state: &corev1::ContainerState) -> ContainerState {
    if let Some(running) = &state.running {
        return ContainerState::Running {
            started_at: running.started_at.as_ref().and_then(to_utc),
        };
    }
    if let Some(terminated) = &state.terminated {
        return ContainerState::Terminated {
            reason: terminated.reason.clone().unwrap_or_default(),
            message: terminated.message.clone().unwrap_or_default(),
            exit_code: terminated.exit_code,
        };
    }
    match &state.waiting {
        Some(waiting) => ContainerState::Waiting {
            reason: waiting.reason.clone().unwrap_or_default(),
            message: waiting.message.clone().unwrap_or_default(),
        },
        None => ContainerState::default(),
    }
}

/// `Time` serializes as RFC 3339 regardless of the datetime crate behind it.
fn to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let value = serde_json::to_value(time).ok()?;
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
