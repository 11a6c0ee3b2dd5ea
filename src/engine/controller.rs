//! Drives the reconciler from a pod watch.
//!
//! `kube::runtime::Controller` runs passes for different pods concurrently
//! and never runs two passes for the same pod at once, which is the only
//! scheduling guarantee the reconciler relies on.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::Action;
use kube::runtime::{Controller, watcher};
use kube::{Api, Client, ResourceExt};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::ObjectKey;

use super::reconcile::{ReconcileOutcome, Reconciler};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace to watch; all namespaces when `None`.
    pub namespace: Option<String>,
    /// Delay before re-evaluating a pod whose status is incomplete.
    pub requeue_after: Duration,
    /// Delay before retrying a pass that failed.
    pub error_requeue_after: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            requeue_after: Duration::from_secs(5),
            error_requeue_after: Duration::from_secs(30),
        }
    }
}

struct Context {
    reconciler: Reconciler,
    config: ControllerConfig,
}

/// Map a pass outcome onto a controller action.
pub fn action_for(outcome: &ReconcileOutcome, config: &ControllerConfig) -> Action {
    match outcome {
        ReconcileOutcome::Requeue => Action::requeue(config.requeue_after),
        ReconcileOutcome::NoOp | ReconcileOutcome::Emitted(_) => Action::await_change(),
    }
}

/// Map a pass error onto a controller action.
pub fn action_for_error(error: &Error, config: &ControllerConfig) -> Action {
    if error.is_retryable() {
        Action::requeue(config.error_requeue_after)
    } else {
        Action::await_change()
    }
}

async fn reconcile(pod: Arc<Pod>, ctx: Arc<Context>) -> Result<Action> {
    let key = ObjectKey::new(pod.namespace().unwrap_or_default(), pod.name_any());
    let outcome = ctx.reconciler.reconcile(&key).await?;
    Ok(action_for(&outcome, &ctx.config))
}

fn error_policy(pod: Arc<Pod>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(pod = %pod.name_any(), error = %error, "reconcile failed");
    action_for_error(error, &ctx.config)
}

/// Watch pods and reconcile every change until `shutdown` is notified.
///
/// In-flight passes finish before this returns.
pub async fn run_controller(
    client: Client,
    reconciler: Reconciler,
    config: ControllerConfig,
    shutdown: Arc<Notify>,
) -> Result<()> {
    let pods: Api<Pod> = match config.namespace.as_deref() {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };

    info!(
        namespace = config.namespace.as_deref().unwrap_or("*"),
        "pod controller started"
    );

    let ctx = Arc::new(Context { reconciler, config });

    Controller::new(pods, watcher::Config::default())
        .graceful_shutdown_on(async move { shutdown.notified().await })
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((pod, action)) => debug!(%pod, ?action, "reconciled"),
                Err(e) => debug!(error = %e, "controller event dropped"),
            }
        })
        .await;

    info!("pod controller stopped");
    Ok(())
}
