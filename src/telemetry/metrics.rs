//! Metric instrument factories for costwatch.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"costwatch"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for costwatch instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("costwatch")
}

/// Counter: conversational turns handled by the intent router.
/// Labels: `intent`, `result` ("enqueued" | "no_intent" | "rejected" | "error").
pub fn turns_routed() -> Counter<u64> {
    meter()
        .u64_counter("costwatch.router.turns")
        .with_description("Number of conversational turns routed")
        .build()
}

/// Counter: queue-level operations (create, send, read, archive).
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("costwatch.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: queue messages handled by the dispatch bridge.
/// Labels: `result` ("started" | "poison" | "handoff_failed").
pub fn dispatches() -> Counter<u64> {
    meter()
        .u64_counter("costwatch.dispatch.messages")
        .with_description("Queue messages handled by the dispatch bridge")
        .build()
}

/// Counter: fulfillment workflows that finished.
/// Labels: `intent`, `status` ("ready" | "failed").
pub fn fulfillments() -> Counter<u64> {
    meter()
        .u64_counter("costwatch.fulfillment.finished")
        .with_description("Number of fulfillment workflows finished")
        .build()
}

/// Counter: correlation store writes.
/// Labels: `status`, `result` ("ok" | "error").
pub fn record_writes() -> Counter<u64> {
    meter()
        .u64_counter("costwatch.store.writes")
        .with_description("Number of work item record upserts")
        .build()
}

/// Counter: result fetches.
/// Labels: `result` ("ok" | "client_error" | "error").
pub fn result_fetches() -> Counter<u64> {
    meter()
        .u64_counter("costwatch.fetch.requests")
        .with_description("Number of result fetch requests")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("costwatch.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
