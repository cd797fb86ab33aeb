//! Conversational front end contract: the parsed turn coming in and the
//! dialogue-close event going back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Intent name reported when the classifier produced nothing actionable.
pub const UNKNOWN_INTENT: &str = "UnknownIntent";

/// A parsed conversational turn, as produced by the intent classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEvent {
    /// Conversation id.
    #[serde(default, alias = "conversation_id")]
    pub session_id: Option<String>,
    /// Raw utterance text.
    #[serde(default)]
    pub input_transcript: Option<String>,
    /// Classified intent name, absent when nothing was recognized.
    #[serde(default)]
    pub intent: Option<String>,
    /// Slot name to interpreted value.
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentState {
    Fulfilled,
    Failed,
}

/// Dialogue-close event returned synchronously for every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueResponse {
    pub session_state: SessionState,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub dialog_action: DialogAction,
    pub intent: IntentState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogAction {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentState {
    pub name: String,
    pub state: FulfillmentState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content_type: String,
    pub content: String,
}

impl DialogueResponse {
    /// Close the dialogue with a single plain-text message.
    pub fn close(
        intent_name: impl Into<String>,
        state: FulfillmentState,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_state: SessionState {
                dialog_action: DialogAction {
                    kind: "Close".to_string(),
                },
                intent: IntentState {
                    name: intent_name.into(),
                    state,
                },
            },
            messages: vec![Message {
                content_type: "PlainText".to_string(),
                content: content.into(),
            }],
        }
    }

    pub fn intent_name(&self) -> &str {
        &self.session_state.intent.name
    }

    pub fn state(&self) -> FulfillmentState {
        self.session_state.intent.state
    }

    /// Text of the first message, or "" when there is none.
    pub fn message(&self) -> &str {
        self.messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}
