//! Metric instrument factories for incident-agent.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"incident-agent"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("incident-agent")
}

/// Counter: reconciliation passes by outcome.
/// Labels: `outcome` ("noop" | "requeue" | "emitted" | "error").
pub fn reconcile_outcomes() -> Counter<u64> {
    meter()
        .u64_counter("incident_agent.reconcile.outcomes")
        .with_description("Number of reconciliation passes by outcome")
        .build()
}

/// Counter: classified events.
/// Labels: `criticality`, `owner_kind`.
pub fn events_classified() -> Counter<u64> {
    meter()
        .u64_counter("incident_agent.events.classified")
        .with_description("Number of classified pod events")
        .build()
}

/// Counter: queue-level operations (create, send, read, archive, delete).
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("incident_agent.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: incident lifecycle transitions.
/// Labels: `transition` ("opened" | "appended" | "reopened" | "resolved" | "ignored").
pub fn incident_transitions() -> Counter<u64> {
    meter()
        .u64_counter("incident_agent.incident.transitions")
        .with_description("Number of incident lifecycle transitions")
        .build()
}

/// Histogram: reconciliation pass duration in milliseconds.
pub fn reconcile_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("incident_agent.reconcile.duration_ms")
        .with_description("Reconciliation pass duration in milliseconds")
        .with_unit("ms")
        .build()
}
