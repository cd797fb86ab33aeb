//! Work queue: at-least-once delivery of serialized work requests.
//!
//! A received message stays invisible for the visibility timeout. If it is
//! not acked in that window it becomes visible again and is redelivered, so
//! consumers must be idempotent per request id.

pub mod memory;

pub use memory::InMemoryQueue;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A message read from a work queue.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub msg_id: i64,
    /// How many times this message has been delivered, including this one.
    pub read_ct: i32,
    pub enqueued_at: DateTime<Utc>,
    pub message: serde_json::Value,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue a payload. Returns the message id.
    async fn send(&self, payload: &serde_json::Value) -> Result<i64>;

    /// Receive the next visible message, hiding it for `visibility_timeout`.
    /// Returns `None` when nothing is visible.
    async fn receive(&self, visibility_timeout: Duration) -> Result<Option<QueueMessage>>;

    /// Acknowledge a message so it is never redelivered.
    async fn ack(&self, msg_id: i64) -> Result<()>;
}
