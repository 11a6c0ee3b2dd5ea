//! Classified events: one per notify-worthy reconciliation pass.
//!
//! Field names on the wire match what the correlator and the query layer
//! read back out of the queue and the incident store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::workload::{Condition, ConditionStatus, ObjectKey, OwnerRef, Phase};

/// Kind of resource an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    #[serde(rename = "HPA")]
    Hpa,
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criticality {
    Critical,
    Normal,
}

impl Criticality {
    pub fn from_flag(critical: bool) -> Self {
        if critical {
            Criticality::Critical
        } else {
            Criticality::Normal
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Criticality::Critical => "critical",
            Criticality::Normal => "normal",
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"Type: <type>, Status: <status>"` rendering of the latest condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConditionSummary {
    pub kind: String,
    pub status: ConditionStatus,
}

impl ConditionSummary {
    /// A `True` condition. Only healthy events may resolve an incident.
    pub fn is_healthy(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

impl From<&Condition> for ConditionSummary {
    fn from(condition: &Condition) -> Self {
        Self {
            kind: condition.kind.clone(),
            status: condition.status,
        }
    }
}

impl fmt::Display for ConditionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type: {}, Status: {}", self.kind, self.status)
    }
}

impl FromStr for ConditionSummary {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Other(format!("malformed condition summary: {s:?}"));
        let rest = s.strip_prefix("Type: ").ok_or_else(bad)?;
        let (kind, status) = rest.rsplit_once(", Status: ").ok_or_else(bad)?;
        Ok(Self {
            kind: kind.to_string(),
            status: ConditionStatus::parse(status),
        })
    }
}

impl TryFrom<String> for ConditionSummary {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ConditionSummary> for String {
    fn from(summary: ConditionSummary) -> Self {
        summary.to_string()
    }
}

/// A severity-tagged, root-cause-annotated observation of one workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    #[serde(rename = "resource_type")]
    pub resource_kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    pub owner_name: String,
    #[serde(rename = "owner_type")]
    pub owner_kind: String,
    pub reason: String,
    pub message: String,
    #[serde(rename = "pod_phase")]
    pub phase: String,
    /// Latest condition, absent when the pod reported none.
    #[serde(rename = "pod_status", default)]
    pub condition: Option<ConditionSummary>,
    #[serde(rename = "event_type")]
    pub criticality: Criticality,
    /// When the engine classified the pod, not when the pod changed.
    pub timestamp: DateTime<Utc>,
}

impl ClassifiedEvent {
    pub fn pod(key: &ObjectKey, phase: &Phase, criticality: Criticality) -> Self {
        Self {
            resource_kind: ResourceKind::Pod,
            name: key.name.clone(),
            namespace: key.namespace.clone(),
            cluster: None,
            owner_name: String::new(),
            owner_kind: String::new(),
            reason: String::new(),
            message: String::new(),
            phase: phase.to_string(),
            condition: None,
            criticality,
            timestamp: Utc::now(),
        }
    }

    pub fn owner(mut self, owner: Option<&OwnerRef>) -> Self {
        if let Some(owner) = owner {
            self.owner_name = owner.name.clone();
            self.owner_kind = owner.kind.clone();
        }
        self
    }

    pub fn condition(mut self, condition: Option<&Condition>) -> Self {
        self.condition = condition.map(ConditionSummary::from);
        self
    }

    pub fn reason_and_message(mut self, reason: String, message: String) -> Self {
        self.reason = reason;
        self.message = message;
        self
    }

    pub fn cluster(mut self, cluster: Option<String>) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn is_critical(&self) -> bool {
        self.criticality == Criticality::Critical
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// Name of the release this event belongs to: the attributed owner, or
    /// the pod itself when the owner could not be resolved.
    pub fn release_name(&self) -> &str {
        if self.owner_name.is_empty() {
            &self.name
        } else {
            &self.owner_name
        }
    }

    /// Normal event reporting a healthy latest condition.
    pub fn is_healthy(&self) -> bool {
        !self.is_critical() && self.condition.as_ref().is_some_and(ConditionSummary::is_healthy)
    }
}
