//! Out-of-band processing: the dispatch bridge drains the work queue and
//! launches one fulfillment workflow per message.

pub mod bridge;
pub mod fulfillment;
pub mod launcher;
pub mod sizing;

pub use bridge::{BridgeConfig, Dispatch, DispatchBridge};
pub use fulfillment::FulfillmentWorker;
pub use launcher::{ExecutionId, TaskLauncher, WorkflowLauncher};
pub use sizing::Recommendation;
