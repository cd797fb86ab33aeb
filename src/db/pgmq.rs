//! pgmq queue operations via direct SQLx.
//!
//! Calls pgmq's SQL functions: pgmq.create, pgmq.send, pgmq.read,
//! pgmq.archive.

use super::Db;
use crate::error::{Error, Result};
use crate::queue::{QueueMessage, WorkQueue};
use crate::telemetry::metrics;
use async_trait::async_trait;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Duration;

fn count(queue_name: &str, operation: &'static str) {
    metrics::queue_operations().add(
        1,
        &[
            KeyValue::new("queue", queue_name.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}

impl Db {
    /// Create a pgmq queue (idempotent).
    pub async fn create_queue(&self, queue_name: &str) -> Result<()> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue_name)
            .execute(self.pool())
            .await?;
        count(queue_name, "create");
        Ok(())
    }

    /// Send a message to a pgmq queue. Returns the message ID.
    pub async fn send_to_queue(&self, queue_name: &str, payload: &serde_json::Value) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT pgmq.send($1, $2, 0)")
            .bind(queue_name)
            .bind(payload)
            .fetch_one(self.pool())
            .await?;
        count(queue_name, "send");
        Ok(row.0)
    }

    /// Read the next message from a queue (visibility timeout in seconds).
    /// Returns None if queue is empty.
    pub async fn read_from_queue(
        &self,
        queue_name: &str,
        vt_seconds: i32,
    ) -> Result<Option<QueueMessage>> {
        let row = sqlx::query_as::<
            _,
            (
                i64,
                i32,
                chrono::DateTime<chrono::Utc>,
                serde_json::Value,
            ),
        >("SELECT msg_id, read_ct, enqueued_at, message FROM pgmq.read($1, $2, 1)")
        .bind(queue_name)
        .bind(vt_seconds)
        .fetch_optional(self.pool())
        .await?;

        let msg = row.map(|(msg_id, read_ct, enqueued_at, message)| QueueMessage {
            msg_id,
            read_ct,
            enqueued_at,
            message,
        });

        count(queue_name, if msg.is_some() { "read" } else { "read_empty" });
        Ok(msg)
    }

    /// Archive a message (moves to archive table, preserves for audit).
    /// Returns false if the message was already gone.
    pub async fn archive_message(&self, queue_name: &str, msg_id: i64) -> Result<bool> {
        let row: (bool,) = sqlx::query_as("SELECT pgmq.archive($1, $2)")
            .bind(queue_name)
            .bind(msg_id)
            .fetch_one(self.pool())
            .await?;
        count(queue_name, "archive");
        Ok(row.0)
    }
}

/// [`WorkQueue`] backed by a named pgmq queue.
pub struct PgmqQueue {
    db: Arc<Db>,
    queue_name: String,
}

impl PgmqQueue {
    pub fn new(db: Arc<Db>, queue_name: impl Into<String>) -> Self {
        Self {
            db,
            queue_name: queue_name.into(),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl WorkQueue for PgmqQueue {
    async fn send(&self, payload: &serde_json::Value) -> Result<i64> {
        self.db.send_to_queue(&self.queue_name, payload).await
    }

    async fn receive(&self, visibility_timeout: Duration) -> Result<Option<QueueMessage>> {
        let vt_seconds = i32::try_from(visibility_timeout.as_secs())
            .map_err(|_| Error::Config("visibility timeout too large".to_string()))?;
        self.db.read_from_queue(&self.queue_name, vt_seconds).await
    }

    async fn ack(&self, msg_id: i64) -> Result<()> {
        if self.db.archive_message(&self.queue_name, msg_id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!(
                "message {msg_id} in queue {}",
                self.queue_name
            )))
        }
    }
}
