//! Ownership resolution.
//!
//! Attributes a pod to the controller an operator cares about. Deployments
//! own pods through a ReplicaSet, so one hop through a ReplicaSet is
//! followed; nothing deeper is.

use tracing::{Span, debug, warn};

use crate::cluster::ClusterReader;
use crate::model::{ObjectKey, OwnerRef, WorkloadInstance};

/// Intermediate scaling-group kind that is never reported as an owner.
pub const REPLICA_SET_KIND: &str = "ReplicaSet";

/// Run-to-completion owner kind.
pub const JOB_KIND: &str = "Job";

/// Resolve the logical owner of `instance`.
///
/// Only the first owner reference is considered. Never fails: anything that
/// prevents attribution yields `None`, and the event goes out unattributed.
pub async fn resolve_owner(
    reader: &dyn ClusterReader,
    instance: &WorkloadInstance,
    span: &Span,
) -> Option<OwnerRef> {
    let Some(owner) = instance.owner_references.first() else {
        span.in_scope(|| debug!("pod has no owner references"));
        return None;
    };

    if owner.kind != REPLICA_SET_KIND {
        return Some(owner.clone());
    }

    let rs_key = ObjectKey::new(&instance.namespace, &owner.name);
    match reader.replica_set_owners(&rs_key).await {
        Ok(Some(owners)) => {
            let resolved = owners.into_iter().next();
            if resolved.is_none() {
                span.in_scope(|| debug!(replica_set = %rs_key, "replicaset has no owner"));
            }
            resolved
        }
        Ok(None) => {
            span.in_scope(|| debug!(replica_set = %rs_key, "replicaset not found"));
            None
        }
        Err(e) => {
            span.in_scope(|| warn!(replica_set = %rs_key, error = %e, "cannot fetch replicaset owner"));
            None
        }
    }
}
