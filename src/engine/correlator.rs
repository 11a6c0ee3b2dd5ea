//! Correlator: drains the event queue into the incident store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::DEFAULT_EVENT_QUEUE;
use crate::db::Db;
use crate::db::pgmq::PgmqMessage;
use crate::dispatch::EventSubmission;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    pub queue: String,
    /// Visibility timeout (seconds) for pgmq reads. A message whose
    /// correlation fails reappears after this long.
    pub visibility_timeout: i32,
    /// How long to sleep when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            queue: DEFAULT_EVENT_QUEUE.to_string(),
            visibility_timeout: 30,
            poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Clone)]
pub struct Correlator {
    db: Arc<Db>,
    config: CorrelatorConfig,
    shutdown: Arc<Notify>,
}

impl Correlator {
    pub fn new(db: Arc<Db>, config: CorrelatorConfig) -> Self {
        Self {
            db,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Poll the queue until shutdown.
    pub async fn run(&self) -> Result<()> {
        self.db.create_queue(&self.config.queue).await?;
        info!(queue = %self.config.queue, "correlator started");

        loop {
            match self.drain().await {
                Ok(0) => {}
                Ok(n) => debug!(processed = n, "correlated events"),
                Err(e) => error!("correlator error: {e}"),
            }

            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("correlator shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Process every message currently visible. Returns how many were read.
    pub async fn drain(&self) -> Result<usize> {
        let mut processed = 0;
        while let Some(msg) = self
            .db
            .read_from_queue(&self.config.queue, self.config.visibility_timeout)
            .await?
        {
            self.process(msg).await?;
            processed += 1;
        }
        Ok(processed)
    }

    async fn process(&self, msg: PgmqMessage) -> Result<()> {
        let msg_id = msg.msg_id;
        let span = info_span!("correlate", "queue.msg_id" = msg_id, "queue.read_ct" = msg.read_ct);

        async move {
            let submission: EventSubmission = match serde_json::from_value(msg.message) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "undecodable event message, archiving");
                    return self.db.archive_message(&self.config.queue, msg_id).await;
                }
            };

            // On failure the message stays hidden until the visibility
            // timeout expires, then gets retried.
            let correlation = self.db.correlate_event(submission.event).await?;
            info!(
                pod = %submission.key,
                incident = %correlation.incident_id,
                transition = correlation.transition.as_str(),
                "event correlated"
            );

            self.db.archive_message(&self.config.queue, msg_id).await
        }
        .instrument(span)
        .await
    }
}
