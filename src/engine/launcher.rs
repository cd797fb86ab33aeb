//! Workflow launcher: hands a work request to a new fulfillment execution.

use super::fulfillment::FulfillmentWorker;
use crate::error::{Error, Result};
use crate::model::WorkRequest;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info_span};
use uuid::Uuid;

/// Identifier of one workflow execution. Distinct from the request id: a
/// redelivered request gets a new execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionId(pub Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[async_trait]
pub trait WorkflowLauncher: Send + Sync {
    /// Start one workflow execution for `request`. Returns as soon as the
    /// execution has been accepted, not when it completes.
    async fn launch(&self, request: WorkRequest) -> Result<ExecutionId>;
}

/// Runs each workflow as a tokio task, at most `capacity` at a time.
///
/// `launch` waits for a free slot, so a saturated pool applies
/// backpressure to the dispatch bridge instead of growing without bound.
pub struct TaskLauncher {
    worker: Arc<FulfillmentWorker>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl TaskLauncher {
    pub fn new(worker: Arc<FulfillmentWorker>, max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            worker,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Executions currently running.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Wait until every launched execution has finished.
    pub async fn wait_idle(&self) -> Result<()> {
        let all = u32::try_from(self.capacity)
            .map_err(|_| Error::Config("launcher capacity too large".to_string()))?;
        let _drained = self
            .permits
            .acquire_many(all)
            .await
            .map_err(|_| Error::Other("launcher closed".to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowLauncher for TaskLauncher {
    async fn launch(&self, request: WorkRequest) -> Result<ExecutionId> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::Other("launcher closed".to_string()))?;

        let execution_id = ExecutionId::new();
        let worker = Arc::clone(&self.worker);
        let span = info_span!("workflow", execution_id = %execution_id);

        tokio::spawn(
            async move {
                let _permit = permit;
                if let Err(e) = worker.execute(&request).await {
                    // Nothing was recorded. A redelivery of the same request
                    // is the only path to a record now.
                    error!(
                        request_id = %request.request_id,
                        conversation_id = %request.conversation_id,
                        error = %e,
                        "fulfillment could not record its outcome"
                    );
                }
            }
            .instrument(span),
        );

        Ok(execution_id)
    }
}
