//! Read-only access to cluster state.
//!
//! The engine only ever reads: the pod under reconciliation and, for owner
//! attribution, the ReplicaSet that created it.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::ReplicaSet;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};

use crate::error::Result;
use crate::model::{ObjectKey, OwnerRef, WorkloadInstance};

#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// `Ok(None)` when the pod no longer exists.
    async fn get_instance(&self, key: &ObjectKey) -> Result<Option<WorkloadInstance>>;

    /// Owner references of a ReplicaSet, or `Ok(None)` when it is gone.
    async fn replica_set_owners(&self, key: &ObjectKey) -> Result<Option<Vec<OwnerRef>>>;
}

/// [`ClusterReader`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get_instance(&self, key: &ObjectKey) -> Result<Option<WorkloadInstance>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &key.namespace);
        let pod = pods.get_opt(&key.name).await?;
        Ok(pod.as_ref().map(WorkloadInstance::from))
    }

    async fn replica_set_owners(&self, key: &ObjectKey) -> Result<Option<Vec<OwnerRef>>> {
        let replica_sets: Api<ReplicaSet> = Api::namespaced(self.client.clone(), &key.namespace);
        let Some(rs) = replica_sets.get_opt(&key.name).await? else {
            return Ok(None);
        };
        let owners = rs
            .metadata
            .owner_references
            .unwrap_or_default()
            .into_iter()
            .map(|o| OwnerRef::new(o.kind, o.name))
            .collect();
        Ok(Some(owners))
    }
}
