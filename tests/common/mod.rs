//! Shared fakes for the cluster reader and dispatcher boundaries.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use incident_agent::cluster::ClusterReader;
use incident_agent::dispatch::Dispatcher;
use incident_agent::error::{Error, Result};
use incident_agent::model::*;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn transport_error() -> Error {
    Error::Io(std::io::Error::other("connection reset by peer"))
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCluster {
    pods: HashMap<ObjectKey, WorkloadInstance>,
    replica_sets: HashMap<ObjectKey, Vec<OwnerRef>>,
    fail_pods: bool,
    fail_replica_sets: bool,
    pub replica_set_lookups: Mutex<u32>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pod(mut self, pod: WorkloadInstance) -> Self {
        self.pods.insert(pod.key(), pod);
        self
    }

    pub fn with_replica_set(mut self, namespace: &str, name: &str, owners: Vec<OwnerRef>) -> Self {
        self.replica_sets
            .insert(ObjectKey::new(namespace, name), owners);
        self
    }

    pub fn failing_pods(mut self) -> Self {
        self.fail_pods = true;
        self
    }

    pub fn failing_replica_sets(mut self) -> Self {
        self.fail_replica_sets = true;
        self
    }

    pub fn lookups(&self) -> u32 {
        *self.replica_set_lookups.lock().unwrap()
    }
}

#[async_trait]
impl ClusterReader for FakeCluster {
    async fn get_instance(&self, key: &ObjectKey) -> Result<Option<WorkloadInstance>> {
        if self.fail_pods {
            return Err(transport_error());
        }
        Ok(self.pods.get(key).cloned())
    }

    async fn replica_set_owners(&self, key: &ObjectKey) -> Result<Option<Vec<OwnerRef>>> {
        *self.replica_set_lookups.lock().unwrap() += 1;
        if self.fail_replica_sets {
            return Err(transport_error());
        }
        Ok(self.replica_sets.get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingDispatcher {
    pub events: Mutex<Vec<(ObjectKey, ClassifiedEvent)>>,
    pub log_fetches: Mutex<Vec<(ObjectKey, Vec<String>)>>,
    fail_events: bool,
    fail_logs: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_events() -> Self {
        Self {
            fail_events: true,
            ..Self::default()
        }
    }

    pub fn failing_logs() -> Self {
        Self {
            fail_logs: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ClassifiedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn log_fetches(&self) -> Vec<(ObjectKey, Vec<String>)> {
        self.log_fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn submit_event(&self, key: &ObjectKey, event: &ClassifiedEvent) -> Result<()> {
        if self.fail_events {
            return Err(Error::Dispatch("event queue unavailable".to_string()));
        }
        self.events
            .lock()
            .unwrap()
            .push((key.clone(), event.clone()));
        Ok(())
    }

    async fn enqueue_log_fetch(
        &self,
        key: &ObjectKey,
        container_names: Vec<String>,
    ) -> Result<()> {
        if self.fail_logs {
            return Err(Error::Dispatch("log queue unavailable".to_string()));
        }
        self.log_fetches
            .lock()
            .unwrap()
            .push((key.clone(), container_names));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn waiting(reason: &str, message: &str) -> ContainerState {
    ContainerState::Waiting {
        reason: reason.to_string(),
        message: message.to_string(),
    }
}

pub fn terminated(reason: &str, message: &str, exit_code: i32) -> ContainerState {
    ContainerState::Terminated {
        reason: reason.to_string(),
        message: message.to_string(),
        exit_code,
    }
}

pub fn running(started_secs: i64) -> ContainerState {
    ContainerState::Running {
        started_at: Some(at(started_secs)),
    }
}

/// A pod with one spec container per status, owned by `owner` if given.
pub fn pod(
    name: &str,
    phase: Phase,
    containers: Vec<(&str, ContainerState)>,
    owner: Option<OwnerRef>,
) -> WorkloadInstance {
    let mut instance = WorkloadInstance::new("default", name, phase);
    for (container, state) in containers {
        instance.containers.push(container.to_string());
        instance
            .container_statuses
            .push(ContainerStatus::new(container, state));
    }
    instance.owner_references.extend(owner);
    instance
}
