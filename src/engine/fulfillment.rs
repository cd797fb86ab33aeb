//! Fulfillment worker: run the intent-specific computation for one work
//! request and record the outcome under its correlation key.

use super::sizing::Recommendation;
use crate::error::{Error, Result};
use crate::model::{DateRange, IntentRequest, WorkItemRecord, WorkRequest};
use crate::providers::{
    CostProvider, InstanceMetric, MAX_SERVICE_METRICS, MetricsProvider, PredictionService,
    ServiceCatalog, TimeWindow, predicted_type,
};
use crate::store::CorrelationStore;
use crate::telemetry::fulfillment::{record_status, start_fulfillment_span};
use crate::telemetry::metrics;
use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, warn};

/// Minutes of instance metrics considered "current".
const INSTANCE_WINDOW_MINUTES: i64 = 5;

/// Executes work requests. Holds no per-request state, so one worker can
/// serve any number of concurrent executions.
pub struct FulfillmentWorker {
    store: Arc<dyn CorrelationStore>,
    metrics: Arc<dyn MetricsProvider>,
    cost: Arc<dyn CostProvider>,
    prediction: Arc<dyn PredictionService>,
    catalog: ServiceCatalog,
}

impl FulfillmentWorker {
    pub fn new(
        store: Arc<dyn CorrelationStore>,
        metrics: Arc<dyn MetricsProvider>,
        cost: Arc<dyn CostProvider>,
        prediction: Arc<dyn PredictionService>,
    ) -> Self {
        Self {
            store,
            metrics,
            cost,
            prediction,
            catalog: ServiceCatalog::default(),
        }
    }

    /// Compute the answer and upsert exactly one record at the request's
    /// key: ready with the response, or failed with the error text.
    ///
    /// Safe to repeat for the same request id. A rerun recomputes from
    /// current provider data and replaces the record, so duplicate
    /// deliveries never produce a second record.
    ///
    /// Returns an error only if the store write itself failed.
    pub async fn execute(&self, request: &WorkRequest) -> Result<WorkItemRecord> {
        let intent = request.intent.intent();
        let span = start_fulfillment_span(
            intent.as_str(),
            request.conversation_id.as_str(),
            &request.request_id.to_string(),
        );

        async {
            let start = Instant::now();
            let record = match self.compute(&request.intent, Utc::now()).await {
                Ok(response) => WorkItemRecord::ready(request, response),
                Err(e) => {
                    warn!(error = %e, "fulfillment failed, recording failure");
                    WorkItemRecord::failed(request, e.to_string())
                }
            };

            let status = record.status.to_string();
            if let Err(e) = self.store.upsert(&record).await {
                metrics::record_writes().add(
                    1,
                    &[
                        KeyValue::new("status", status),
                        KeyValue::new("result", "error"),
                    ],
                );
                return Err(e);
            }
            metrics::record_writes().add(
                1,
                &[
                    KeyValue::new("status", status.clone()),
                    KeyValue::new("result", "ok"),
                ],
            );

            record_status(&span, &status);
            metrics::fulfillments().add(
                1,
                &[
                    KeyValue::new("intent", intent.as_str()),
                    KeyValue::new("status", status),
                ],
            );
            metrics::operation_duration_ms().record(
                start.elapsed().as_millis() as f64,
                &[KeyValue::new("operation", "fulfillment.execute")],
            );
            Ok(record)
        }
        .instrument(span.clone())
        .await
    }

    async fn compute(&self, intent: &IntentRequest, now: DateTime<Utc>) -> Result<String> {
        match intent {
            IntentRequest::CheckInstanceSize { instance_id } => {
                self.instance_size(instance_id, now).await
            }
            IntentRequest::CheckAwsUsage {
                service_name,
                from_date,
                to_date,
            } => {
                let range = DateRange::resolve(*from_date, *to_date, now.date_naive());
                self.service_usage(service_name, range).await
            }
        }
    }

    async fn instance_size(&self, instance_id: &str, now: DateTime<Utc>) -> Result<String> {
        let window = TimeWindow::trailing_minutes(now, INSTANCE_WINDOW_MINUTES);

        let mut features = Vec::with_capacity(InstanceMetric::ALL.len());
        for metric in InstanceMetric::ALL {
            let value = self
                .metrics
                .latest_instance_metric(instance_id, metric, window)
                .await?;
            if value.is_none() {
                debug!(metric = metric.name(), "no datapoints, using 0");
            }
            features.push(value.unwrap_or(0.0));
        }

        let output = self.prediction.predict(&features).await?;
        let predicted = predicted_type(&output);
        let cpu = features[0];
        let recommendation = Recommendation::for_cpu(cpu);
        debug!(cpu, ?recommendation, %predicted, "instance sized");

        Ok(format!("{} Suggested type: {predicted}", recommendation.message()))
    }

    async fn service_usage(&self, service: &str, range: DateRange) -> Result<String> {
        let cost = self
            .cost
            .unblended_cost(self.catalog.billing_name(service), range)
            .await?;
        if !cost.is_finite() {
            return Err(Error::provider("cost", format!("non-finite cost {cost}")));
        }

        let summary = self
            .utilization(service, range)
            .await
            .into_iter()
            .map(|(name, total)| format!("{name}: {total}"))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "Service: {service}, Cost: {cost:.2} USD, Utilization Summary: {summary}"
        ))
    }

    /// Per-metric totals of daily averages. Best effort: an unknown service,
    /// an unavailable listing, or a failing metric shrinks the summary
    /// instead of failing the request.
    async fn utilization(&self, service: &str, range: DateRange) -> Vec<(String, f64)> {
        let Some(namespace) = self.catalog.namespace(service) else {
            return Vec::new();
        };

        let listed = match self.metrics.list_metrics(namespace).await {
            Ok(listed) => listed,
            Err(e) => {
                warn!(namespace, error = %e, "metric listing unavailable");
                return Vec::new();
            }
        };

        let window = TimeWindow::whole_days(range);
        let mut totals = Vec::new();
        for metric in listed.iter().take(MAX_SERVICE_METRICS) {
            if metric.dimensions.is_empty() {
                continue;
            }
            match self.metrics.daily_averages(namespace, metric, window).await {
                Ok(values) => totals.push((metric.name.clone(), values.iter().sum())),
                Err(e) => warn!(metric = %metric.name, error = %e, "metric omitted"),
            }
        }
        totals
    }
}

