//! Reconciliation span helpers.
//!
//! Each pass gets its own span; the engine hands it to every step that
//! logs, so there is no shared logger state between concurrent passes.

use tracing::Span;
use uuid::Uuid;

use crate::model::{ClassifiedEvent, ObjectKey};

/// Start a span for one reconciliation pass over `key`.
///
/// `reconcile.outcome`, `event.criticality` and `owner.kind` are declared
/// empty and filled in as the pass progresses.
pub fn start_reconcile_span(key: &ObjectKey) -> Span {
    tracing::info_span!(
        "reconcile",
        "k8s.namespace.name" = %key.namespace,
        "k8s.pod.name" = %key.name,
        "reconcile.pass_id" = %Uuid::new_v4(),
        "reconcile.outcome" = tracing::field::Empty,
        "event.criticality" = tracing::field::Empty,
        "owner.kind" = tracing::field::Empty,
    )
}

/// Record how the pass ended ("noop", "requeue", "emitted", "error").
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("reconcile.outcome", outcome);
}

/// Record the classified event on the span and emit it as a log line.
pub fn record_classification(span: &Span, event: &ClassifiedEvent) {
    span.record("event.criticality", event.criticality.as_str());
    span.record("owner.kind", event.owner_kind.as_str());
    span.in_scope(|| {
        tracing::info!(
            criticality = %event.criticality,
            owner = %event.owner_name,
            reason = %event.reason,
            phase = %event.phase,
            "pod classified"
        );
    });
}
