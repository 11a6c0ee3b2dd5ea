//! pgmq queue operations via direct SQLx.
//!
//! Thin wrappers over pgmq's SQL functions. Payloads are JSON; callers
//! serialize their own message types.

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;

use crate::error::Result;
use crate::telemetry::metrics;

/// A message read from a pgmq queue.
#[derive(Debug, Clone)]
pub struct PgmqMessage {
    pub msg_id: i64,
    /// How many times the message has been read, including this read.
    pub read_ct: i32,
    pub enqueued_at: DateTime<Utc>,
    pub message: serde_json::Value,
}

fn record_op(queue: &str, operation: &'static str) {
    metrics::queue_operations().add(
        1,
        &[
            KeyValue::new("queue", queue.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}

impl super::Db {
    /// Create a pgmq queue (idempotent).
    pub async fn create_queue(&self, queue: &str) -> Result<()> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue)
            .execute(&self.pool)
            .await?;
        record_op(queue, "create");
        Ok(())
    }

    /// Send a message. Returns the message ID.
    pub async fn send_to_queue(
        &self,
        queue: &str,
        payload: &serde_json::Value,
        delay_seconds: i32,
    ) -> Result<i64> {
        let (msg_id,): (i64,) = sqlx::query_as("SELECT pgmq.send($1, $2, $3)")
            .bind(queue)
            .bind(payload)
            .bind(delay_seconds)
            .fetch_one(&self.pool)
            .await?;
        record_op(queue, "send");
        Ok(msg_id)
    }

    /// Read the next message, hiding it for `vt_seconds`. `None` when the
    /// queue is empty.
    pub async fn read_from_queue(&self, queue: &str, vt_seconds: i32) -> Result<Option<PgmqMessage>> {
        let row: Option<(i64, i32, DateTime<Utc>, serde_json::Value)> = sqlx::query_as(
            "SELECT msg_id, read_ct, enqueued_at, message FROM pgmq.read($1, $2, 1)",
        )
        .bind(queue)
        .bind(vt_seconds)
        .fetch_optional(&self.pool)
        .await?;

        record_op(queue, if row.is_some() { "read" } else { "read_empty" });

        Ok(row.map(|(msg_id, read_ct, enqueued_at, message)| PgmqMessage {
            msg_id,
            read_ct,
            enqueued_at,
            message,
        }))
    }

    /// Move a message to the archive table.
    pub async fn archive_message(&self, queue: &str, msg_id: i64) -> Result<()> {
        sqlx::query("SELECT pgmq.archive($1, $2)")
            .bind(queue)
            .bind(msg_id)
            .execute(&self.pool)
            .await?;
        record_op(queue, "archive");
        Ok(())
    }
}
