//! One reconciliation pass: fetch the pod, classify it, hand the event and
//! a log-fetch request to the dispatcher.
//!
//! The reconciler holds no mutable state. Passes for different pods may run
//! concurrently; the controller serializes passes for the same pod.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::{Instrument, Span, debug, warn};

use crate::analyzer::{StatusAnalyzer, job_failed, sorted_conditions};
use crate::cluster::ClusterReader;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::model::{
    ClassifiedEvent, Condition, ConditionStatus, Criticality, ObjectKey, OwnerRef,
    WorkloadInstance,
};
use crate::owner::{JOB_KIND, resolve_owner};
use crate::telemetry::metrics;
use crate::telemetry::reconcile::{record_classification, record_outcome, start_reconcile_span};

/// Logical container name under which job pod logs are requested.
pub const JOB_LOG_CONTAINER: &str = "job";

/// What a pass decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The pod is gone. Nothing emitted.
    NoOp,
    /// Status not populated yet; evaluate again later. Nothing emitted.
    Requeue,
    /// Exactly one event was submitted.
    Emitted(Box<ClassifiedEvent>),
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::NoOp => "noop",
            ReconcileOutcome::Requeue => "requeue",
            ReconcileOutcome::Emitted(_) => "emitted",
        }
    }
}

/// Containers whose logs should be collected after an event.
///
/// Job pods are one logical unit for log purposes. Multi-container pods
/// request the first declared container; single-container pods send no
/// filter.
pub fn log_containers(instance: &WorkloadInstance, owner_kind: &str) -> Vec<String> {
    if owner_kind == JOB_KIND {
        return vec![JOB_LOG_CONTAINER.to_string()];
    }
    if instance.is_multi_container() {
        return instance.containers.first().cloned().into_iter().collect();
    }
    Vec::new()
}

#[derive(Clone)]
pub struct Reconciler {
    reader: Arc<dyn ClusterReader>,
    dispatcher: Arc<dyn Dispatcher>,
    analyzer: StatusAnalyzer,
    cluster_name: Option<String>,
}

impl Reconciler {
    pub fn new(reader: Arc<dyn ClusterReader>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            reader,
            dispatcher,
            analyzer: StatusAnalyzer::default(),
            cluster_name: None,
        }
    }

    pub fn analyzer(mut self, analyzer: StatusAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn cluster_name(mut self, cluster_name: Option<String>) -> Self {
        self.cluster_name = cluster_name;
        self
    }

    /// Run one pass for `key`.
    ///
    /// # Errors
    ///
    /// Transport errors fetching the pod and event submission failures.
    /// Both are retryable; nothing was emitted.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let span = start_reconcile_span(key);
        let start = Instant::now();

        let result = self
            .reconcile_pass(key, &span)
            .instrument(span.clone())
            .await;

        let outcome = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "error",
        };
        record_outcome(&span, outcome);
        metrics::reconcile_outcomes().add(1, &[KeyValue::new("outcome", outcome)]);
        metrics::reconcile_duration_ms().record(start.elapsed().as_secs_f64() * 1000.0, &[]);

        result
    }

    async fn reconcile_pass(&self, key: &ObjectKey, span: &Span) -> Result<ReconcileOutcome> {
        let Some(instance) = self.reader.get_instance(key).await? else {
            // Deletion is not reported; the incident stays as last classified.
            span.in_scope(|| debug!("pod deleted"));
            return Ok(ReconcileOutcome::NoOp);
        };

        let conditions = sorted_conditions(&instance);
        let latest = conditions.first();

        if instance.phase.is_critical() {
            let owner = resolve_owner(self.reader.as_ref(), &instance, span).await;
            let event = self.classify(&instance, latest, owner.as_ref(), Criticality::Critical);
            return self.emit(&instance, event, span).await;
        }

        let Some(latest) = latest else {
            span.in_scope(|| debug!("empty status conditions, requeueing"));
            return Ok(ReconcileOutcome::Requeue);
        };
        if instance.container_statuses.is_empty() {
            span.in_scope(|| debug!("empty container statuses, requeueing"));
            return Ok(ReconcileOutcome::Requeue);
        }

        let owner = resolve_owner(self.reader.as_ref(), &instance, span).await;
        let is_job = owner.as_ref().is_some_and(|o| o.kind == JOB_KIND);

        let critical = if is_job {
            job_failed(&instance.container_statuses)
        } else {
            latest.status == ConditionStatus::False
        };

        let event = self.classify(
            &instance,
            Some(latest),
            owner.as_ref(),
            Criticality::from_flag(critical),
        );
        self.emit(&instance, event, span).await
    }

    fn classify(
        &self,
        instance: &WorkloadInstance,
        latest: Option<&Condition>,
        owner: Option<&OwnerRef>,
        criticality: Criticality,
    ) -> ClassifiedEvent {
        let owner_kind = owner.map_or("", |o| o.kind.as_str());
        let (reason, message) = self
            .analyzer
            .reason_and_message(instance, latest, owner_kind);

        ClassifiedEvent::pod(&instance.key(), &instance.phase, criticality)
            .owner(owner)
            .condition(latest)
            .reason_and_message(reason, message)
            .cluster(self.cluster_name.clone())
    }

    /// Submit the event, then request logs. A failed submission fails the
    /// pass; a failed log request does not.
    async fn emit(
        &self,
        instance: &WorkloadInstance,
        event: ClassifiedEvent,
        span: &Span,
    ) -> Result<ReconcileOutcome> {
        let key = instance.key();
        record_classification(span, &event);

        self.dispatcher.submit_event(&key, &event).await?;
        metrics::events_classified().add(
            1,
            &[
                KeyValue::new("criticality", event.criticality.as_str()),
                KeyValue::new("owner_kind", event.owner_kind.clone()),
            ],
        );

        let containers = log_containers(instance, &event.owner_kind);
        if let Err(e) = self.dispatcher.enqueue_log_fetch(&key, containers).await {
            span.in_scope(|| warn!(error = %e, "log fetch request failed"));
        }

        Ok(ReconcileOutcome::Emitted(Box::new(event)))
    }
}
