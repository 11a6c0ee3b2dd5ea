//! Reconciliation engine, the kube controller that drives it, and the
//! correlator that folds its events into incidents.

pub mod controller;
pub mod correlator;
pub mod reconcile;

pub use controller::{ControllerConfig, action_for, action_for_error, run_controller};
pub use correlator::{Correlator, CorrelatorConfig};
pub use reconcile::{JOB_LOG_CONTAINER, ReconcileOutcome, Reconciler, log_containers};
