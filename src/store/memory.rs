//! In-process correlation store.

use super::CorrelationStore;
use crate::error::{Error, Result};
use crate::model::{ConversationId, RequestId, WorkItemRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

type Key = (ConversationId, RequestId);

/// Records held in a map keyed by correlation key.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<BTreeMap<Key, WorkItemRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all conversations.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<Key, WorkItemRecord>>> {
        self.records
            .lock()
            .map_err(|_| Error::Other("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CorrelationStore for InMemoryStore {
    async fn upsert(&self, record: &WorkItemRecord) -> Result<()> {
        let key = (record.conversation_id.clone(), record.request_id);
        self.lock()?.insert(key, record.clone());
        Ok(())
    }

    async fn query_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<WorkItemRecord>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|((conversation, _), _)| conversation == conversation_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn get(
        &self,
        conversation_id: &ConversationId,
        request_id: RequestId,
    ) -> Result<Option<WorkItemRecord>> {
        Ok(self
            .lock()?
            .get(&(conversation_id.clone(), request_id))
            .cloned())
    }

    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, record| record.completed_at >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
