//! Core data model.
//!
//! A workload instance is the read-only view of a pod. The engine turns it
//! into a classified event; the correlator folds classified events into
//! incidents.

pub mod event;
pub mod incident;
pub mod workload;

pub use event::{ClassifiedEvent, ConditionSummary, Criticality, ResourceKind};
pub use incident::{Incident, IncidentId, IncidentState, IncidentTransition};
pub use workload::{
    Condition, ConditionStatus, ContainerState, ContainerStatus, ObjectKey, OwnerRef, Phase,
    WorkloadInstance,
};
