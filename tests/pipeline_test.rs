//! End-to-end tests: router -> queue -> dispatch bridge -> fulfillment ->
//! correlation store -> result fetcher, wired with in-memory adapters.

mod common;

use async_trait::async_trait;
use common::{StaticCost, StaticMetrics, StaticPrediction, turn};
use costwatch::engine::{
    BridgeConfig, Dispatch, DispatchBridge, ExecutionId, FulfillmentWorker, TaskLauncher,
    WorkflowLauncher,
};
use costwatch::error::{Error, Result};
use costwatch::fetcher::ResultFetcher;
use costwatch::model::{Status, WorkRequest};
use costwatch::queue::{InMemoryQueue, WorkQueue};
use costwatch::router::IntentRouter;
use costwatch::store::InMemoryStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const VISIBILITY: Duration = Duration::from_millis(50);

struct Pipeline {
    queue: Arc<InMemoryQueue>,
    store: Arc<InMemoryStore>,
    router: IntentRouter,
    launcher: Arc<TaskLauncher>,
    bridge: DispatchBridge,
    fetcher: ResultFetcher,
}

fn pipeline(cpu: f64) -> Pipeline {
    let queue = Arc::new(InMemoryQueue::new());
    let store = Arc::new(InMemoryStore::new());
    let worker = FulfillmentWorker::new(
        store.clone(),
        Arc::new(StaticMetrics::with_cpu(cpu)),
        Arc::new(StaticCost::new(0.0)),
        Arc::new(StaticPrediction::new(json!(["t3.small"]))),
    );
    let launcher = Arc::new(TaskLauncher::new(Arc::new(worker), 4));
    let bridge = DispatchBridge::new(queue.clone(), launcher.clone(), config());
    Pipeline {
        router: IntentRouter::new(queue.clone()),
        fetcher: ResultFetcher::new(store.clone()),
        queue,
        store,
        launcher,
        bridge,
    }
}

fn config() -> BridgeConfig {
    BridgeConfig {
        visibility_timeout: VISIBILITY,
        poll_interval: Duration::from_millis(5),
    }
}

/// Launcher whose hand-off always fails.
struct RefusingLauncher;

#[async_trait]
impl WorkflowLauncher for RefusingLauncher {
    async fn launch(&self, _request: WorkRequest) -> Result<ExecutionId> {
        Err(Error::Other("workflow engine unavailable".to_string()))
    }
}

#[tokio::test]
async fn turn_to_polled_result() {
    let p = pipeline(15.0);

    // Before any work: the conversation is simply empty.
    let empty = p.fetcher.fetch(Some("S1")).await.unwrap();
    assert!(empty.responses.is_empty());

    let routed = p
        .router
        .route(turn("S1", "CheckInstanceSize", &[("instance_id", "i-123")]))
        .await;
    let request_id = routed.request_id().unwrap();

    match p.bridge.dispatch_next().await.unwrap() {
        Some(Dispatch::Started { request_id: id, .. }) => assert_eq!(id, request_id),
        other => panic!("expected Started, got {other:?}"),
    }
    assert!(p.queue.is_empty(), "message acked after hand-off");

    p.launcher.wait_idle().await.unwrap();

    let results = p.fetcher.fetch(Some("S1")).await.unwrap();
    assert_eq!(results.conversation_id.as_str(), "S1");
    assert_eq!(results.responses.len(), 1);
    let record = &results.responses[0];
    assert_eq!(record.request_id, request_id);
    assert_eq!(record.status, Status::Ready);
    assert!(
        record
            .response
            .as_deref()
            .unwrap()
            .starts_with("Scale down to a smaller instance to reduce costs.")
    );

    // Other conversations see nothing.
    assert!(p.fetcher.fetch(Some("S2")).await.unwrap().responses.is_empty());
}

#[tokio::test]
async fn empty_queue_dispatches_nothing() {
    let p = pipeline(50.0);
    assert_eq!(p.bridge.dispatch_next().await.unwrap(), None);
}

#[tokio::test]
async fn poison_message_is_discarded() {
    let p = pipeline(50.0);
    let msg_id = p.queue.send(&json!({"not": "a work request"})).await.unwrap();

    let dispatch = p.bridge.dispatch_next().await.unwrap();

    assert_eq!(dispatch, Some(Dispatch::Discarded { msg_id }));
    assert!(p.queue.is_empty());
    assert!(p.store.is_empty());
}

fn instance_payload(conversation_id: &str) -> serde_json::Value {
    json!({
        "request_id": uuid::Uuid::new_v4(),
        "conversation_id": conversation_id,
        "user_query": "size i-123",
        "intent_name": "CheckInstanceSize",
        "instance_id": "i-123"
    })
}

#[tokio::test]
async fn blank_conversation_on_queue_is_discarded() {
    let p = pipeline(50.0);
    let msg_id = p.queue.send(&instance_payload("")).await.unwrap();
    let blank_padded = p.queue.send(&instance_payload("   ")).await.unwrap();

    assert_eq!(
        p.bridge.dispatch_next().await.unwrap(),
        Some(Dispatch::Discarded { msg_id })
    );
    assert_eq!(
        p.bridge.dispatch_next().await.unwrap(),
        Some(Dispatch::Discarded {
            msg_id: blank_padded
        })
    );
    p.launcher.wait_idle().await.unwrap();

    assert!(p.queue.is_empty());
    assert!(p.store.is_empty());
}

#[tokio::test]
async fn padded_conversation_on_queue_lands_where_polls_look() {
    let p = pipeline(50.0);
    p.queue.send(&instance_payload(" S1 ")).await.unwrap();

    assert!(matches!(
        p.bridge.dispatch_next().await.unwrap(),
        Some(Dispatch::Started { .. })
    ));
    p.launcher.wait_idle().await.unwrap();

    assert_eq!(p.fetcher.fetch(Some("S1")).await.unwrap().responses.len(), 1);
    assert_eq!(
        p.fetcher.fetch(Some(" S1 ")).await.unwrap().responses.len(),
        1
    );
}

#[tokio::test]
async fn failed_handoff_is_redelivered() {
    let p = pipeline(50.0);
    p.router
        .route(turn("S1", "CheckInstanceSize", &[("instance_id", "i-123")]))
        .await;

    let refusing = DispatchBridge::new(p.queue.clone(), Arc::new(RefusingLauncher), config());
    assert!(refusing.dispatch_next().await.is_err());
    assert_eq!(p.queue.len(), 1, "message left unacked");

    // Hidden until the visibility timeout lapses.
    assert_eq!(p.bridge.dispatch_next().await.unwrap(), None);
    tokio::time::sleep(VISIBILITY * 2).await;

    assert!(matches!(
        p.bridge.dispatch_next().await.unwrap(),
        Some(Dispatch::Started { .. })
    ));
    p.launcher.wait_idle().await.unwrap();
    assert!(p.queue.is_empty());
    assert_eq!(p.store.len(), 1);
}

#[tokio::test]
async fn duplicate_messages_yield_one_record() {
    let p = pipeline(90.0);
    p.router
        .route(turn("S1", "CheckInstanceSize", &[("instance_id", "i-123")]))
        .await;
    // At-least-once delivery: the same request shows up twice.
    let payload = p.queue.payloads()[0].clone();
    p.queue.send(&payload).await.unwrap();

    for _ in 0..2 {
        p.bridge.dispatch_next().await.unwrap().unwrap();
    }
    p.launcher.wait_idle().await.unwrap();

    let results = p.fetcher.fetch(Some("S1")).await.unwrap();
    assert_eq!(results.responses.len(), 1);
    assert_eq!(results.responses[0].status, Status::Ready);
}

#[tokio::test]
async fn bridge_loop_drains_until_shutdown() {
    let p = pipeline(50.0);
    for instance in ["i-1", "i-2", "i-3"] {
        p.router
            .route(turn("S1", "CheckInstanceSize", &[("instance_id", instance)]))
            .await;
    }

    let bridge = p.bridge.clone();
    let handle = tokio::spawn(async move { bridge.run().await });

    tokio::time::timeout(Duration::from_secs(5), async {
        while p.store.len() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("all requests fulfilled");

    p.bridge.shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("bridge stops")
        .unwrap()
        .unwrap();
    assert!(p.queue.is_empty());
}

#[tokio::test]
async fn missing_conversation_is_a_client_error() {
    let p = pipeline(50.0);
    let err = p.fetcher.fetch(None).await.unwrap_err();
    assert!(err.is_client_error());
    let err = p.fetcher.fetch(Some("  ")).await.unwrap_err();
    assert!(err.is_client_error());
}
