//! Outbound boundary: classified events and log-fetch requests handed to
//! the work queue.
//!
//! The engine makes at most one call of each per pass and never retries;
//! redelivery and backoff belong to the queue.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::{Error, Result};
use crate::model::{ClassifiedEvent, ObjectKey};

/// Queue message carrying one classified event to the correlator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubmission {
    pub key: ObjectKey,
    pub event: ClassifiedEvent,
}

/// Queue message asking the log worker to collect logs for a pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFetchRequest {
    pub key: ObjectKey,
    /// Empty means the pod's default container.
    pub container_names: Vec<String>,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn submit_event(&self, key: &ObjectKey, event: &ClassifiedEvent) -> Result<()>;

    async fn enqueue_log_fetch(&self, key: &ObjectKey, container_names: Vec<String>)
    -> Result<()>;
}

/// [`Dispatcher`] backed by two pgmq queues.
#[derive(Clone)]
pub struct PgmqDispatcher {
    db: Arc<Db>,
    event_queue: String,
    log_queue: String,
}

impl PgmqDispatcher {
    pub fn new(db: Arc<Db>, event_queue: impl Into<String>, log_queue: impl Into<String>) -> Self {
        Self {
            db,
            event_queue: event_queue.into(),
            log_queue: log_queue.into(),
        }
    }

    /// Create both queues (idempotent).
    pub async fn ensure_queues(&self) -> Result<()> {
        self.db.create_queue(&self.event_queue).await?;
        self.db.create_queue(&self.log_queue).await
    }
}

#[async_trait]
impl Dispatcher for PgmqDispatcher {
    async fn submit_event(&self, key: &ObjectKey, event: &ClassifiedEvent) -> Result<()> {
        let payload = serde_json::to_value(EventSubmission {
            key: key.clone(),
            event: event.clone(),
        })?;
        self.db
            .send_to_queue(&self.event_queue, &payload, 0)
            .await
            .map(|_| ())
            .map_err(|e| Error::Dispatch(format!("{}: {e}", self.event_queue)))
    }

    async fn enqueue_log_fetch(
        &self,
        key: &ObjectKey,
        container_names: Vec<String>,
    ) -> Result<()> {
        let payload = serde_json::to_value(LogFetchRequest {
            key: key.clone(),
            container_names,
        })?;
        self.db
            .send_to_queue(&self.log_queue, &payload, 0)
            .await
            .map(|_| ())
            .map_err(|e| Error::Dispatch(format!("{}: {e}", self.log_queue)))
    }
}
