//! # costwatch
//!
//! Answers cloud cost and utilization questions for a conversational front
//! end without blocking the dialogue turn on slow backend work.
//!
//! A classified turn goes to the [`router`], which mints a request id and
//! enqueues a work request on the [`queue`]. The [`engine`] dispatch bridge
//! drains the queue and launches one fulfillment workflow per message; the
//! workflow consults the external [`providers`] and writes one record to
//! the [`store`] under `(conversation_id, request_id)`. Clients poll the
//! [`fetcher`] with their conversation id to collect results.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod providers;
pub mod queue;
pub mod router;
pub mod store;
pub mod telemetry;
