//! Dispatch bridge: drains the work queue and starts one workflow per
//! message.
//!
//! A message is acked as soon as its workflow has been handed off, not when
//! the workflow completes, so long computations never hold a message past
//! its visibility timeout. If hand-off fails the message is left alone and
//! reappears after the timeout.

use super::launcher::{ExecutionId, WorkflowLauncher};
use crate::error::Result;
use crate::model::{RequestId, WorkRequest};
use crate::queue::WorkQueue;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Configuration for the dispatch bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long a received message stays hidden from other readers.
    pub visibility_timeout: Duration,
    /// Sleep between reads when the queue is empty.
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// What happened to one dequeued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A workflow was started and the message acked.
    Started {
        msg_id: i64,
        request_id: RequestId,
        execution_id: ExecutionId,
    },
    /// The body was not a work request. Acked so it is not redelivered.
    Discarded { msg_id: i64 },
}

/// The bridge loop: read, hand off, ack.
pub struct DispatchBridge {
    queue: Arc<dyn WorkQueue>,
    launcher: Arc<dyn WorkflowLauncher>,
    config: BridgeConfig,
    shutdown: Arc<Notify>,
}

impl Clone for DispatchBridge {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            launcher: Arc::clone(&self.launcher),
            config: self.config.clone(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

impl DispatchBridge {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        launcher: Arc<dyn WorkflowLauncher>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            queue,
            launcher,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the bridge to stop after the message in hand.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run until shutdown.
    pub async fn run(&self) -> Result<()> {
        info!("dispatch bridge started");

        loop {
            // Drain without sleeping while messages keep coming.
            let wait = match self.dispatch_next().await {
                Ok(Some(_)) => Duration::ZERO,
                Ok(None) => self.config.poll_interval,
                Err(e) => {
                    error!("dispatch error: {e}");
                    self.config.poll_interval
                }
            };

            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("dispatch bridge shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Read one message and hand it off. `Ok(None)` when the queue had
    /// nothing visible; `Err` when the read or the hand-off failed.
    pub async fn dispatch_next(&self) -> Result<Option<Dispatch>> {
        let Some(msg) = self.queue.receive(self.config.visibility_timeout).await? else {
            return Ok(None);
        };

        let request = match WorkRequest::from_payload(&msg.message) {
            Ok(request) => request,
            Err(e) => {
                warn!(msg_id = msg.msg_id, error = %e, "undecodable work request, discarding");
                count("poison");
                self.ack(msg.msg_id).await;
                return Ok(Some(Dispatch::Discarded { msg_id: msg.msg_id }));
            }
        };

        if msg.read_ct > 1 {
            info!(
                msg_id = msg.msg_id,
                request_id = %request.request_id,
                read_ct = msg.read_ct,
                "redelivered work request"
            );
        }

        let request_id = request.request_id;
        let execution_id = match self.launcher.launch(request).await {
            Ok(id) => id,
            Err(e) => {
                count("handoff_failed");
                return Err(e);
            }
        };
        info!(
            msg_id = msg.msg_id,
            %request_id,
            %execution_id,
            "workflow started"
        );
        count("started");
        self.ack(msg.msg_id).await;

        Ok(Some(Dispatch::Started {
            msg_id: msg.msg_id,
            request_id,
            execution_id,
        }))
    }

    /// Ack failures are logged, not raised: the worst case is a redelivery,
    /// which the fulfillment worker absorbs.
    async fn ack(&self, msg_id: i64) {
        if let Err(e) = self.queue.ack(msg_id).await {
            warn!(msg_id, error = %e, "ack failed, message may be redelivered");
        }
    }
}

fn count(result: &'static str) {
    metrics::dispatches().add(1, &[KeyValue::new("result", result)]);
}
