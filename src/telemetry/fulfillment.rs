//! Fulfillment span helpers.
//!
//! One span per work request execution, keyed by its correlation key.

use tracing::Span;

/// Start a span for one fulfillment workflow.
///
/// The `work.status` field is declared empty and is filled by
/// [`record_status`] when the record is written.
pub fn start_fulfillment_span(intent: &str, conversation_id: &str, request_id: &str) -> Span {
    tracing::info_span!(
        "fulfillment.execute",
        "work.intent" = intent,
        "work.conversation_id" = conversation_id,
        "work.request_id" = request_id,
        "work.status" = tracing::field::Empty,
    )
}

/// Record the final record status on the span and emit an event for it.
pub fn record_status(span: &Span, status: &str) {
    span.record("work.status", status);
    span.in_scope(|| {
        tracing::info!(status = status, "work item recorded");
    });
}
