//! Work item records: the durable unit in the correlation store.

use super::{ConversationId, Intent, RequestId, WorkRequest};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome state of a work item as seen by pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Accepted but not yet computed. Never written by the fulfillment
    /// worker; readable if another writer records it.
    Pending,
    /// Computed successfully. `response` is set.
    Ready,
    /// Computation failed. `error` is set.
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Ready => "ready",
            Status::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Status::Pending),
            "ready" => Ok(Status::Ready),
            "failed" => Ok(Status::Failed),
            other => Err(Error::Other(format!("unknown record status: {other}"))),
        }
    }
}

/// A stored work item, keyed by `(conversation_id, request_id)`.
///
/// Writes are whole-record upserts. A duplicate delivery of the same work
/// request replaces the record with an equivalent one instead of adding a
/// second row; nothing here may become conditional or versioned without
/// breaking that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRecord {
    pub conversation_id: ConversationId,
    pub request_id: RequestId,
    pub intent: Intent,
    /// Echo of the user's original query text.
    pub request: String,
    /// Result text. Present only when `status` is ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub status: Status,
    /// Human-readable failure description. Present only when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl WorkItemRecord {
    pub fn ready(request: &WorkRequest, response: impl Into<String>) -> Self {
        Self {
            conversation_id: request.conversation_id.clone(),
            request_id: request.request_id,
            intent: request.intent.intent(),
            request: request.user_query.clone(),
            response: Some(response.into()),
            status: Status::Ready,
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(request: &WorkRequest, error: impl Into<String>) -> Self {
        Self {
            conversation_id: request.conversation_id.clone(),
            request_id: request.request_id,
            intent: request.intent.intent(),
            request: request.user_query.clone(),
            response: None,
            status: Status::Failed,
            error: Some(error.into()),
            completed_at: Utc::now(),
        }
    }

    /// The correlation key.
    pub fn key(&self) -> (&ConversationId, RequestId) {
        (&self.conversation_id, self.request_id)
    }
}
