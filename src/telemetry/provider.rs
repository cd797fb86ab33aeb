//! Span helpers for calls to external data providers (monitoring metrics,
//! billing, prediction).

use tracing::Span;

/// Start a span for one provider call.
///
/// `provider.outcome` is declared empty and can be filled via
/// [`record_outcome`].
pub fn start_provider_span(provider: &str, operation: &str) -> Span {
    tracing::info_span!(
        "provider.call",
        "provider.name" = provider,
        "provider.operation" = operation,
        "provider.outcome" = tracing::field::Empty,
    )
}

/// Record whether the call succeeded.
pub fn record_outcome(span: &Span, ok: bool) {
    span.record("provider.outcome", if ok { "ok" } else { "error" });
}
