//! Integration tests for the fulfillment worker.

mod common;

use chrono::NaiveDate;
use common::{CountingStore, StaticCost, StaticMetrics, StaticPrediction};
use costwatch::engine::FulfillmentWorker;
use costwatch::model::{ConversationId, IntentRequest, RequestId, Status, WorkRequest};
use costwatch::providers::{Dimension, InstanceMetric, MetricDescriptor};
use costwatch::store::CorrelationStore;
use serde_json::json;
use std::sync::Arc;

struct Harness {
    worker: FulfillmentWorker,
    store: Arc<CountingStore>,
    cost: Arc<StaticCost>,
    prediction: Arc<StaticPrediction>,
    metrics: Arc<StaticMetrics>,
}

fn harness(metrics: StaticMetrics, cost: StaticCost, store: CountingStore) -> Harness {
    let store = Arc::new(store);
    let metrics = Arc::new(metrics);
    let cost = Arc::new(cost);
    let prediction = Arc::new(StaticPrediction::new(json!(["t3.small"])));
    let worker = FulfillmentWorker::new(
        store.clone(),
        metrics.clone(),
        cost.clone(),
        prediction.clone(),
    );
    Harness {
        worker,
        store,
        cost,
        prediction,
        metrics,
    }
}

fn instance_request(instance_id: &str) -> WorkRequest {
    WorkRequest {
        request_id: RequestId::new(),
        conversation_id: ConversationId::parse("S1").unwrap(),
        user_query: "how big should i-123 be".to_string(),
        intent: IntentRequest::CheckInstanceSize {
            instance_id: instance_id.to_string(),
        },
    }
}

fn usage_request(service: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> WorkRequest {
    WorkRequest {
        request_id: RequestId::new(),
        conversation_id: ConversationId::parse("S1").unwrap(),
        user_query: format!("what does {service} cost"),
        intent: IntentRequest::CheckAwsUsage {
            service_name: service.to_string(),
            from_date: from,
            to_date: to,
        },
    }
}

fn descriptor(name: &str, dimensions: usize) -> MetricDescriptor {
    MetricDescriptor {
        name: name.to_string(),
        dimensions: (0..dimensions)
            .map(|i| Dimension {
                name: "FunctionName".to_string(),
                value: format!("fn-{i}"),
            })
            .collect(),
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ---------------------------------------------------------------------------
// Instance sizing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_cpu_recommends_scale_down() {
    let h = harness(
        StaticMetrics::with_cpu(15.0),
        StaticCost::new(0.0),
        CountingStore::default(),
    );
    let request = instance_request("i-123");

    let record = h.worker.execute(&request).await.unwrap();

    assert_eq!(record.status, Status::Ready);
    assert_eq!(
        record.response.as_deref(),
        Some("Scale down to a smaller instance to reduce costs. Suggested type: t3.small")
    );
    assert_eq!(record.request, "how big should i-123 be");
    assert!(record.error.is_none());

    let stored = h
        .store
        .get(&request.conversation_id, request.request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn features_follow_fixed_order_and_missing_datapoints_are_zero() {
    let mut metrics = StaticMetrics::with_cpu(42.0);
    metrics.instance.insert(InstanceMetric::DiskWriteOps, 7.0);
    metrics.instance.insert(InstanceMetric::NetworkOut, 1024.0);
    let h = harness(metrics, StaticCost::new(0.0), CountingStore::default());

    h.worker.execute(&instance_request("i-123")).await.unwrap();

    let inputs = h.prediction.inputs.lock().unwrap();
    assert_eq!(inputs.as_slice(), &[vec![42.0, 0.0, 7.0, 0.0, 1024.0]]);
}

#[tokio::test]
async fn no_datapoints_at_all_still_answers() {
    let h = harness(
        StaticMetrics::default(),
        StaticCost::new(0.0),
        CountingStore::default(),
    );

    let record = h.worker.execute(&instance_request("i-idle")).await.unwrap();

    assert_eq!(record.status, Status::Ready);
    assert!(
        record
            .response
            .unwrap()
            .starts_with("Scale down to a smaller instance")
    );
}

#[tokio::test]
async fn cpu_boundaries_need_no_action() {
    for cpu in [20.0, 80.0, 50.0] {
        let h = harness(
            StaticMetrics::with_cpu(cpu),
            StaticCost::new(0.0),
            CountingStore::default(),
        );
        let record = h.worker.execute(&instance_request("i-1")).await.unwrap();
        assert_eq!(
            record.response.as_deref(),
            Some(
                "CPU utilization is within an optimal range. No action needed. Suggested type: t3.small"
            ),
            "cpu {cpu}"
        );
    }
}

#[tokio::test]
async fn high_cpu_recommends_scale_up() {
    let h = harness(
        StaticMetrics::with_cpu(80.5),
        StaticCost::new(0.0),
        CountingStore::default(),
    );
    let record = h.worker.execute(&instance_request("i-1")).await.unwrap();
    assert!(
        record
            .response
            .unwrap()
            .starts_with("Scale up to a larger instance type for better performance.")
    );
}

#[tokio::test]
async fn monitoring_failure_records_failed() {
    let metrics = StaticMetrics {
        fail_instance: true,
        ..Default::default()
    };
    let h = harness(metrics, StaticCost::new(0.0), CountingStore::default());
    let request = instance_request("i-123");

    let record = h.worker.execute(&request).await.unwrap();

    assert_eq!(record.status, Status::Failed);
    assert!(record.response.is_none());
    assert!(record.error.unwrap().contains("monitoring unavailable"));
    assert!(h.prediction.inputs.lock().unwrap().is_empty());
    assert_eq!(h.store.inner.len(), 1);
}

#[tokio::test]
async fn duplicate_delivery_leaves_one_record() {
    let h = harness(
        StaticMetrics::with_cpu(15.0),
        StaticCost::new(0.0),
        CountingStore::default(),
    );
    let request = instance_request("i-123");

    h.worker.execute(&request).await.unwrap();
    h.worker.execute(&request).await.unwrap();

    assert_eq!(h.store.writes(), 2);
    assert_eq!(h.store.inner.len(), 1);
    let records = h
        .store
        .query_conversation(&request.conversation_id)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, Status::Ready);
}

#[tokio::test]
async fn store_failure_is_returned() {
    let h = harness(
        StaticMetrics::with_cpu(15.0),
        StaticCost::new(0.0),
        CountingStore::failing_writes(),
    );

    let result = h.worker.execute(&instance_request("i-123")).await;

    assert!(result.is_err());
    assert!(h.store.inner.is_empty());
}

// ---------------------------------------------------------------------------
// Service usage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn usage_reports_cost_and_utilization() {
    let metrics = StaticMetrics {
        listed: vec![descriptor("Invocations", 1), descriptor("Errors", 1)],
        daily: vec![1.0, 2.0, 3.0],
        ..Default::default()
    };
    let h = harness(metrics, StaticCost::new(12.5), CountingStore::default());
    let request = usage_request("Lambda", Some(day(2025, 4, 1)), Some(day(2025, 4, 7)));

    let record = h.worker.execute(&request).await.unwrap();

    assert_eq!(record.status, Status::Ready);
    assert_eq!(
        record.response.as_deref(),
        Some("Service: Lambda, Cost: 12.50 USD, Utilization Summary: Invocations: 6, Errors: 6")
    );
    let asked = h.cost.asked.lock().unwrap();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].0, "AWS Lambda");
    assert_eq!(asked[0].1.from, day(2025, 4, 1));
    assert_eq!(asked[0].1.to, day(2025, 4, 7));
}

#[tokio::test]
async fn usage_without_dates_uses_trailing_week() {
    let h = harness(
        StaticMetrics::default(),
        StaticCost::new(3.0),
        CountingStore::default(),
    );

    h.worker
        .execute(&usage_request("EC2", Some(day(2025, 4, 1)), None))
        .await
        .unwrap();

    let asked = h.cost.asked.lock().unwrap();
    let range = asked[0].1;
    assert_eq!((range.to - range.from).num_days(), 7);
    assert_eq!(range.to, chrono::Utc::now().date_naive());
}

#[tokio::test]
async fn unknown_service_has_empty_summary() {
    let h = harness(
        StaticMetrics::default(),
        StaticCost::new(0.0),
        CountingStore::default(),
    );

    let record = h
        .worker
        .execute(&usage_request("Glacier Deep Archive", None, None))
        .await
        .unwrap();

    assert_eq!(
        record.response.as_deref(),
        Some("Service: Glacier Deep Archive, Cost: 0.00 USD, Utilization Summary: ")
    );
    assert_eq!(h.cost.asked.lock().unwrap()[0].0, "Glacier Deep Archive");
}

#[tokio::test]
async fn utilization_is_best_effort_and_capped() {
    let metrics = StaticMetrics {
        listed: vec![
            descriptor("Invocations", 1),
            descriptor("Unscoped", 0),
            descriptor("Throttles", 1),
            descriptor("Duration", 1),
        ],
        daily: vec![2.5],
        failing_metrics: vec!["Throttles".to_string()],
        ..Default::default()
    };
    let h = harness(metrics, StaticCost::new(1.0), CountingStore::default());

    let record = h
        .worker
        .execute(&usage_request("Lambda", None, None))
        .await
        .unwrap();

    assert_eq!(record.status, Status::Ready);
    assert_eq!(
        record.response.as_deref(),
        Some("Service: Lambda, Cost: 1.00 USD, Utilization Summary: Invocations: 2.5")
    );
    // Only the first three listed metrics are considered; the undimensioned
    // one is skipped without a lookup.
    assert_eq!(
        h.metrics
            .daily_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        2
    );
}

#[tokio::test]
async fn billing_failure_records_failed() {
    let h = harness(
        StaticMetrics::default(),
        StaticCost::failing(),
        CountingStore::default(),
    );

    let record = h
        .worker
        .execute(&usage_request("S3", None, None))
        .await
        .unwrap();

    assert_eq!(record.status, Status::Failed);
    assert!(record.error.unwrap().contains("billing unavailable"));
}
