//! HTTP/JSON clients for the external data providers.
//!
//! Each provider sits behind a small JSON gateway; these clients speak that
//! contract with reqwest and map every transport or status failure into
//! [`Error::Provider`] so the worker can turn it into a failed record.

use super::{
    CostProvider, DAILY_PERIOD_SECS, INSTANCE_NAMESPACE, INSTANCE_PERIOD_SECS, InstanceMetric,
    MetricDescriptor, MetricsProvider, PredictionService, Statistic, TimeWindow,
};
use crate::error::{Error, Result};
use crate::model::DateRange;
use crate::telemetry::provider::{record_outcome, start_provider_span};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::Instrument;

/// Per-request timeout for provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the shared HTTP client.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

async fn post_json<B, R>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    bearer: Option<&SecretString>,
    body: &B,
) -> Result<R>
where
    B: Serialize + ?Sized + Sync,
    R: DeserializeOwned,
{
    let mut request = client.post(url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token.expose_secret());
    }
    let response = request
        .send()
        .await
        .map_err(|e| Error::provider(provider, format!("request to {url} failed: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::provider(provider, format!("{url} returned {status}: {text}")));
    }
    response
        .json::<R>()
        .await
        .map_err(|e| Error::provider(provider, format!("bad response from {url}: {e}")))
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

// ---------------------------------------------------------------------------
// Monitoring metrics
// ---------------------------------------------------------------------------

pub struct HttpMetricsProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetricsProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct StatisticsQuery<'a> {
    namespace: &'a str,
    metric: &'a str,
    dimensions: Vec<super::Dimension>,
    statistic: Statistic,
    unit: Option<&'a str>,
    period_secs: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct Datapoint {
    timestamp: DateTime<Utc>,
    value: f64,
}

#[derive(Deserialize)]
struct StatisticsResponse {
    #[serde(default)]
    datapoints: Vec<Datapoint>,
}

#[derive(Serialize)]
struct ListQuery<'a> {
    namespace: &'a str,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    metrics: Vec<MetricDescriptor>,
}

#[async_trait]
impl MetricsProvider for HttpMetricsProvider {
    async fn latest_instance_metric(
        &self,
        instance_id: &str,
        metric: InstanceMetric,
        window: TimeWindow,
    ) -> Result<Option<f64>> {
        let span = start_provider_span("metrics", "instance_statistics");
        let query = StatisticsQuery {
            namespace: INSTANCE_NAMESPACE,
            metric: metric.name(),
            dimensions: vec![super::Dimension {
                name: "InstanceId".to_string(),
                value: instance_id.to_string(),
            }],
            statistic: metric.statistic(),
            unit: Some(metric.unit()),
            period_secs: INSTANCE_PERIOD_SECS,
            start: window.start,
            end: window.end,
        };
        let result: Result<StatisticsResponse> = post_json(
            &self.client,
            "metrics",
            &join(&self.base_url, "statistics"),
            None,
            &query,
        )
        .instrument(span.clone())
        .await;
        record_outcome(&span, result.is_ok());

        Ok(result?
            .datapoints
            .into_iter()
            .max_by_key(|d| d.timestamp)
            .map(|d| d.value))
    }

    async fn list_metrics(&self, namespace: &str) -> Result<Vec<MetricDescriptor>> {
        let span = start_provider_span("metrics", "list_metrics");
        let result: Result<ListResponse> = post_json(
            &self.client,
            "metrics",
            &join(&self.base_url, "list"),
            None,
            &ListQuery { namespace },
        )
        .instrument(span.clone())
        .await;
        record_outcome(&span, result.is_ok());
        Ok(result?.metrics)
    }

    async fn daily_averages(
        &self,
        namespace: &str,
        metric: &MetricDescriptor,
        window: TimeWindow,
    ) -> Result<Vec<f64>> {
        let span = start_provider_span("metrics", "daily_averages");
        let query = StatisticsQuery {
            namespace,
            metric: &metric.name,
            dimensions: metric.dimensions.clone(),
            statistic: Statistic::Average,
            unit: None,
            period_secs: DAILY_PERIOD_SECS,
            start: window.start,
            end: window.end,
        };
        let result: Result<StatisticsResponse> = post_json(
            &self.client,
            "metrics",
            &join(&self.base_url, "statistics"),
            None,
            &query,
        )
        .instrument(span.clone())
        .await;
        record_outcome(&span, result.is_ok());

        let mut datapoints = result?.datapoints;
        datapoints.sort_by_key(|d| d.timestamp);
        Ok(datapoints.into_iter().map(|d| d.value).collect())
    }
}

// ---------------------------------------------------------------------------
// Billing cost
// ---------------------------------------------------------------------------

pub struct HttpCostProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCostProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct CostQuery {
    start: NaiveDate,
    end: NaiveDate,
    granularity: &'static str,
    metric: &'static str,
    group_by: &'static str,
}

/// Billing gateways report amounts either as numbers or decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    fn value(&self) -> Result<f64> {
        match self {
            Amount::Number(n) => Ok(*n),
            Amount::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::provider("cost", format!("unparseable amount {s:?}"))),
        }
    }
}

#[derive(Deserialize)]
struct CostGroup {
    service: String,
    amount: Amount,
}

#[derive(Deserialize)]
struct CostPeriod {
    #[serde(default)]
    groups: Vec<CostGroup>,
}

#[derive(Deserialize)]
struct CostResponse {
    #[serde(default)]
    results_by_time: Vec<CostPeriod>,
}

#[async_trait]
impl CostProvider for HttpCostProvider {
    async fn unblended_cost(&self, billing_service: &str, range: DateRange) -> Result<f64> {
        let span = start_provider_span("cost", "cost_and_usage");
        let query = CostQuery {
            start: range.from,
            end: range.to,
            granularity: "DAILY",
            metric: "UnblendedCost",
            group_by: "SERVICE",
        };
        let result: Result<CostResponse> = post_json(
            &self.client,
            "cost",
            &join(&self.base_url, "cost-and-usage"),
            None,
            &query,
        )
        .instrument(span.clone())
        .await;
        record_outcome(&span, result.is_ok());

        let mut total = 0.0;
        for period in result?.results_by_time {
            for group in period.groups.iter().filter(|g| g.service == billing_service) {
                total += group.amount.value()?;
            }
        }
        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

pub struct HttpPredictionService {
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
}

impl HttpPredictionService {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(&self, features: &[f64]) -> Result<serde_json::Value> {
        let span = start_provider_span("prediction", "invoke");
        // Body is a batch of one row: [[f1, f2, ...]].
        let body = [features];
        let result = post_json(&self.client, "prediction", &self.url, self.api_key.as_ref(), &body)
            .instrument(span.clone())
            .await;
        record_outcome(&span, result.is_ok());
        result
    }
}
