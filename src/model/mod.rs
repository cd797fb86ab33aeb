//! Core data model.
//!
//! A work request is one question the dialogue layer could not answer
//! synchronously. It is identified by a correlation key: the conversation
//! it belongs to plus a request id minted when the turn was routed.

pub mod dialogue;
pub mod record;
pub mod work;

pub use dialogue::{DialogueResponse, FulfillmentState, TurnEvent};
pub use record::{Status, WorkItemRecord};
pub use work::{DateRange, Intent, IntentRequest, WorkRequest};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique token for one routed turn. Random, never derived from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Full form: users copy this from the transcript to track status.
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| Error::InvalidInput(format!("bad request id {s:?}: {e}")))
    }
}

/// Dialogue session identifier. Partition key of the correlation store.
///
/// Deserialization goes through [`ConversationId::parse`], so ids arriving
/// off the queue are trimmed and blank ones rejected exactly as at the
/// router and the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Validate a raw conversation id. Blank ids are a client error.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "missing conversation id (sessionId)".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ConversationId {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
