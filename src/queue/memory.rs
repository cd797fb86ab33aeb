//! In-process work queue with visibility-timeout redelivery.

use super::{QueueMessage, WorkQueue};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    msg: QueueMessage,
    visible_at: Instant,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    entries: Vec<Entry>,
}

/// Queue held in memory. Same delivery contract as the pgmq queue: FIFO by
/// message id among visible messages, redelivery after the visibility
/// timeout until acked.
#[derive(Default)]
pub struct InMemoryQueue {
    inner: Mutex<Inner>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages not yet acked, visible or not.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payloads of all unacked messages, oldest first.
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .map(|e| e.msg.message.clone())
            .collect()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Queue("in-memory queue lock poisoned".to_string()))
    }
}

#[async_trait]
impl WorkQueue for InMemoryQueue {
    async fn send(&self, payload: &serde_json::Value) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let msg_id = inner.next_id;
        inner.entries.push(Entry {
            msg: QueueMessage {
                msg_id,
                read_ct: 0,
                enqueued_at: Utc::now(),
                message: payload.clone(),
            },
            visible_at: Instant::now(),
        });
        Ok(msg_id)
    }

    async fn receive(&self, visibility_timeout: Duration) -> Result<Option<QueueMessage>> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        let Some(entry) = inner.entries.iter_mut().find(|e| e.visible_at <= now) else {
            return Ok(None);
        };
        entry.visible_at = now + visibility_timeout;
        entry.msg.read_ct += 1;
        Ok(Some(entry.msg.clone()))
    }

    async fn ack(&self, msg_id: i64) -> Result<()> {
        let mut inner = self.lock()?;
        let before = inner.entries.len();
        inner.entries.retain(|e| e.msg.msg_id != msg_id);
        if inner.entries.len() == before {
            return Err(Error::NotFound(format!("queue message {msg_id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn received_message_is_hidden_until_timeout() {
        let queue = InMemoryQueue::new();
        queue.send(&json!({"n": 1})).await.unwrap();

        let first = queue.receive(Duration::from_secs(60)).await.unwrap();
        assert!(first.is_some());
        assert!(queue.receive(Duration::from_secs(60)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unacked_message_is_redelivered() {
        let queue = InMemoryQueue::new();
        let id = queue.send(&json!({"n": 1})).await.unwrap();

        let first = queue.receive(Duration::ZERO).await.unwrap().unwrap();
        let second = queue.receive(Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(first.msg_id, id);
        assert_eq!(second.msg_id, id);
        assert_eq!(second.read_ct, 2);

        queue.ack(id).await.unwrap();
        assert!(queue.receive(Duration::ZERO).await.unwrap().is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn delivers_in_send_order() {
        let queue = InMemoryQueue::new();
        let a = queue.send(&json!("a")).await.unwrap();
        let b = queue.send(&json!("b")).await.unwrap();

        let got_a = queue.receive(Duration::from_secs(30)).await.unwrap().unwrap();
        let got_b = queue.receive(Duration::from_secs(30)).await.unwrap().unwrap();
        assert_eq!((got_a.msg_id, got_b.msg_id), (a, b));
    }

    #[tokio::test]
    async fn ack_of_unknown_message_is_not_found() {
        let queue = InMemoryQueue::new();
        assert!(matches!(queue.ack(42).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn len_survives_a_poisoned_lock() {
        let queue = InMemoryQueue::new();
        queue.send(&json!({"n": 1})).await.unwrap();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = queue.inner.lock().unwrap();
            panic!("holder died");
        }));

        assert!(queue.inner.is_poisoned());
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
        assert_eq!(queue.payloads(), vec![json!({"n": 1})]);
    }
}
