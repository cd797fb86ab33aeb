//! Intent router: turns a classified conversational turn into a queued work
//! request and answers the dialogue layer immediately.
//!
//! The router persists nothing. Its only side effect is at most one
//! enqueue per turn.

use crate::error::Result;
use crate::model::dialogue::UNKNOWN_INTENT;
use crate::model::{
    ConversationId, DialogueResponse, FulfillmentState, Intent, IntentRequest, RequestId,
    TurnEvent, WorkRequest,
};
use crate::queue::WorkQueue;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::sync::Arc;
use tracing::{info, warn};

/// Echoed as the request text when the turn carried no utterance.
const UNKNOWN_QUERY: &str = "Unknown query";

/// How a turn was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// A work request was enqueued under `request_id`.
    Enqueued { request_id: RequestId, msg_id: i64 },
    /// Nothing actionable was recognized, or the intent is unsupported.
    NoIntent,
    /// The turn was missing or had malformed required input.
    Rejected,
    /// The queue refused the message.
    EnqueueFailed,
}

/// The synchronous answer for one turn.
#[derive(Debug, Clone)]
pub struct RoutedTurn {
    pub response: DialogueResponse,
    pub disposition: Disposition,
}

impl RoutedTurn {
    pub fn request_id(&self) -> Option<RequestId> {
        match self.disposition {
            Disposition::Enqueued { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}

pub struct IntentRouter {
    queue: Arc<dyn WorkQueue>,
}

impl IntentRouter {
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }

    /// Route one turn. Always answers; failures are reported in the
    /// dialogue response, never raised.
    pub async fn route(&self, turn: TurnEvent) -> RoutedTurn {
        let Some(name) = turn
            .intent
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            count(UNKNOWN_INTENT, "no_intent");
            return RoutedTurn {
                response: DialogueResponse::close(
                    UNKNOWN_INTENT,
                    FulfillmentState::Failed,
                    "No intent recognized. Please try again.",
                ),
                disposition: Disposition::NoIntent,
            };
        };

        let Some(intent) = Intent::from_name(name) else {
            info!(intent = name, "unsupported intent");
            count(UNKNOWN_INTENT, "no_intent");
            return RoutedTurn {
                response: DialogueResponse::close(
                    UNKNOWN_INTENT,
                    FulfillmentState::Failed,
                    format!("Sorry, I can't help with {name}. Please try again."),
                ),
                disposition: Disposition::NoIntent,
            };
        };

        let request = match build_request(intent, &turn) {
            Ok(request) => request,
            Err(e) => {
                info!(%intent, error = %e, "turn rejected");
                count(intent.as_str(), "rejected");
                return RoutedTurn {
                    response: DialogueResponse::close(
                        intent.as_str(),
                        FulfillmentState::Failed,
                        format!("Error: {e}"),
                    ),
                    disposition: Disposition::Rejected,
                };
            }
        };

        match self.enqueue(&request).await {
            Ok(msg_id) => {
                info!(
                    %intent,
                    request_id = %request.request_id,
                    conversation_id = %request.conversation_id,
                    msg_id,
                    "work request enqueued"
                );
                count(intent.as_str(), "enqueued");
                RoutedTurn {
                    response: DialogueResponse::close(
                        intent.as_str(),
                        FulfillmentState::Fulfilled,
                        format!(
                            "Your request has been received. Use request ID: {} to track its status.",
                            request.request_id
                        ),
                    ),
                    disposition: Disposition::Enqueued {
                        request_id: request.request_id,
                        msg_id,
                    },
                }
            }
            Err(e) => {
                // Not retried here. The caller sees the failure.
                warn!(%intent, error = %e, "enqueue failed");
                count(intent.as_str(), "error");
                RoutedTurn {
                    response: DialogueResponse::close(
                        intent.as_str(),
                        FulfillmentState::Failed,
                        format!("Error: {e}"),
                    ),
                    disposition: Disposition::EnqueueFailed,
                }
            }
        }
    }

    async fn enqueue(&self, request: &WorkRequest) -> Result<i64> {
        let payload = request.to_payload()?;
        self.queue.send(&payload).await
    }
}

/// Validate the turn and mint a fresh request id for it.
fn build_request(intent: Intent, turn: &TurnEvent) -> Result<WorkRequest> {
    let conversation_id = ConversationId::parse(turn.session_id.as_deref().unwrap_or_default())?;
    let intent = IntentRequest::from_slots(intent, &turn.slots)?;
    let user_query = turn
        .input_transcript
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(UNKNOWN_QUERY)
        .to_string();

    Ok(WorkRequest {
        request_id: RequestId::new(),
        conversation_id,
        user_query,
        intent,
    })
}

fn count(intent: &str, result: &'static str) {
    metrics::turns_routed().add(
        1,
        &[
            KeyValue::new("intent", intent.to_string()),
            KeyValue::new("result", result),
        ],
    );
}
