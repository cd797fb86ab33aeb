//! Result fetcher: read-only polling surface over the correlation store.

use crate::error::Result;
use crate::model::{ConversationId, WorkItemRecord};
use crate::store::CorrelationStore;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Every record of one conversation, with the conversation id echoed.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationResults {
    pub conversation_id: ConversationId,
    pub responses: Vec<WorkItemRecord>,
}

pub struct ResultFetcher {
    store: Arc<dyn CorrelationStore>,
}

impl ResultFetcher {
    pub fn new(store: Arc<dyn CorrelationStore>) -> Self {
        Self { store }
    }

    /// Return all records for `conversation_id`, any status, unordered.
    ///
    /// A missing or blank id is rejected before the store is touched. An
    /// id with no records yields an empty list.
    pub async fn fetch(&self, conversation_id: Option<&str>) -> Result<ConversationResults> {
        let conversation_id = match ConversationId::parse(conversation_id.unwrap_or_default()) {
            Ok(id) => id,
            Err(e) => {
                count("client_error");
                return Err(e);
            }
        };

        match self.store.query_conversation(&conversation_id).await {
            Ok(responses) => {
                count("ok");
                Ok(ConversationResults {
                    conversation_id,
                    responses,
                })
            }
            Err(e) => {
                warn!(%conversation_id, error = %e, "result fetch failed");
                count("error");
                Err(e)
            }
        }
    }
}

fn count(result: &'static str) {
    metrics::result_fetches().add(1, &[KeyValue::new("result", result)]);
}
