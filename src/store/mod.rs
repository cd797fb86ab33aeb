//! Correlation store: durable work item records keyed by
//! `(conversation_id, request_id)`.
//!
//! The only shared mutable resource in the pipeline. Every write is a
//! single-record upsert, atomic on its own, so no locking or multi-record
//! transaction is needed. Replacing the whole record on a repeated key is
//! what makes duplicate queue deliveries harmless.

pub mod memory;

pub use memory::InMemoryStore;

use crate::error::Result;
use crate::model::{ConversationId, RequestId, WorkItemRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Insert or fully replace the record at its correlation key.
    async fn upsert(&self, record: &WorkItemRecord) -> Result<()>;

    /// All records of a conversation, any status, in no particular order.
    async fn query_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<WorkItemRecord>>;

    /// Look up one record by its correlation key.
    async fn get(
        &self,
        conversation_id: &ConversationId,
        request_id: RequestId,
    ) -> Result<Option<WorkItemRecord>>;

    /// Delete records completed before `cutoff`. Returns how many went.
    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
