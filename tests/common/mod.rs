//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use costwatch::error::{Error, Result};
use costwatch::model::{ConversationId, DateRange, RequestId, TurnEvent, WorkItemRecord};
use costwatch::providers::{
    CostProvider, InstanceMetric, MetricDescriptor, MetricsProvider, PredictionService, TimeWindow,
};
use costwatch::queue::{QueueMessage, WorkQueue};
use costwatch::store::{CorrelationStore, InMemoryStore};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

pub fn turn(session: &str, intent: &str, slots: &[(&str, &str)]) -> TurnEvent {
    TurnEvent {
        session_id: Some(session.to_string()),
        input_transcript: Some(format!("please run {intent}")),
        intent: Some(intent.to_string()),
        slots: slots
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Metrics provider with canned answers.
#[derive(Default)]
pub struct StaticMetrics {
    /// Latest value per instance metric; absent means "no datapoints".
    pub instance: HashMap<InstanceMetric, f64>,
    /// Fail every instance metric lookup.
    pub fail_instance: bool,
    pub listed: Vec<MetricDescriptor>,
    /// Daily averages returned for any listed metric.
    pub daily: Vec<f64>,
    /// Metric names whose daily lookup fails.
    pub failing_metrics: Vec<String>,
    pub daily_calls: AtomicUsize,
}

impl StaticMetrics {
    pub fn with_cpu(cpu: f64) -> Self {
        let mut instance = HashMap::new();
        instance.insert(InstanceMetric::CpuUtilization, cpu);
        Self {
            instance,
            ..Default::default()
        }
    }
}

#[async_trait]
impl MetricsProvider for StaticMetrics {
    async fn latest_instance_metric(
        &self,
        _instance_id: &str,
        metric: InstanceMetric,
        _window: TimeWindow,
    ) -> Result<Option<f64>> {
        if self.fail_instance {
            return Err(Error::provider("metrics", "monitoring unavailable"));
        }
        Ok(self.instance.get(&metric).copied())
    }

    async fn list_metrics(&self, _namespace: &str) -> Result<Vec<MetricDescriptor>> {
        Ok(self.listed.clone())
    }

    async fn daily_averages(
        &self,
        _namespace: &str,
        metric: &MetricDescriptor,
        _window: TimeWindow,
    ) -> Result<Vec<f64>> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_metrics.contains(&metric.name) {
            return Err(Error::provider("metrics", "throttled"));
        }
        Ok(self.daily.clone())
    }
}

/// Cost provider returning a fixed amount and remembering what it was asked.
pub struct StaticCost {
    pub amount: Option<f64>,
    pub asked: Mutex<Vec<(String, DateRange)>>,
}

impl StaticCost {
    pub fn new(amount: f64) -> Self {
        Self {
            amount: Some(amount),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            amount: None,
            asked: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CostProvider for StaticCost {
    async fn unblended_cost(&self, billing_service: &str, range: DateRange) -> Result<f64> {
        self.asked
            .lock()
            .unwrap()
            .push((billing_service.to_string(), range));
        self.amount
            .ok_or_else(|| Error::provider("cost", "billing unavailable"))
    }
}

/// Prediction service returning a fixed output and recording its inputs.
pub struct StaticPrediction {
    pub output: Value,
    pub inputs: Mutex<Vec<Vec<f64>>>,
}

impl StaticPrediction {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            inputs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PredictionService for StaticPrediction {
    async fn predict(&self, features: &[f64]) -> Result<Value> {
        self.inputs.lock().unwrap().push(features.to_vec());
        Ok(self.output.clone())
    }
}

// ---------------------------------------------------------------------------
// Queue and store
// ---------------------------------------------------------------------------

/// A queue that refuses every operation.
pub struct FailingQueue;

#[async_trait]
impl WorkQueue for FailingQueue {
    async fn send(&self, _payload: &Value) -> Result<i64> {
        Err(Error::Queue("queue unavailable".to_string()))
    }

    async fn receive(&self, _visibility_timeout: Duration) -> Result<Option<QueueMessage>> {
        Err(Error::Queue("queue unavailable".to_string()))
    }

    async fn ack(&self, _msg_id: i64) -> Result<()> {
        Err(Error::Queue("queue unavailable".to_string()))
    }
}

/// In-memory store that counts reads and can be told to fail writes.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_writes: bool,
}

impl CountingStore {
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CorrelationStore for CountingStore {
    async fn upsert(&self, record: &WorkItemRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Error::Other("store unavailable".to_string()));
        }
        self.inner.upsert(record).await
    }

    async fn query_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<WorkItemRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.query_conversation(conversation_id).await
    }

    async fn get(
        &self,
        conversation_id: &ConversationId,
        request_id: RequestId,
    ) -> Result<Option<WorkItemRecord>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(conversation_id, request_id).await
    }

    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.inner.purge_completed_before(cutoff).await
    }
}
