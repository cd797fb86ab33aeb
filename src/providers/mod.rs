//! External data providers consulted by the fulfillment worker.
//!
//! All three are read-only collaborators: monitoring metrics, billing cost,
//! and an instance-type prediction model. The worker only sees these traits;
//! the process bootstrap decides which implementation to inject.

pub mod catalog;
pub mod http;
pub mod prediction;

pub use catalog::{ServiceCatalog, ServiceEntry};
pub use http::{HttpCostProvider, HttpMetricsProvider, HttpPredictionService};
pub use prediction::predicted_type;

use crate::error::Result;
use crate::model::DateRange;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Namespace of per-instance compute metrics.
pub const INSTANCE_NAMESPACE: &str = "AWS/EC2";

/// Statistics period for instance metrics, in seconds.
pub const INSTANCE_PERIOD_SECS: u32 = 300;

/// Statistics period for service utilization, in seconds (one day).
pub const DAILY_PERIOD_SECS: u32 = 86_400;

/// Most metrics consulted per service when summarizing utilization.
pub const MAX_SERVICE_METRICS: usize = 3;

// ---------------------------------------------------------------------------
// Instance metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Average,
    Sum,
}

/// The fixed instance metric set. Declaration order is the feature order
/// of the prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceMetric {
    CpuUtilization,
    DiskReadOps,
    DiskWriteOps,
    NetworkIn,
    NetworkOut,
}

impl InstanceMetric {
    pub const ALL: [InstanceMetric; 5] = [
        InstanceMetric::CpuUtilization,
        InstanceMetric::DiskReadOps,
        InstanceMetric::DiskWriteOps,
        InstanceMetric::NetworkIn,
        InstanceMetric::NetworkOut,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InstanceMetric::CpuUtilization => "CPUUtilization",
            InstanceMetric::DiskReadOps => "DiskReadOps",
            InstanceMetric::DiskWriteOps => "DiskWriteOps",
            InstanceMetric::NetworkIn => "NetworkIn",
            InstanceMetric::NetworkOut => "NetworkOut",
        }
    }

    pub fn statistic(self) -> Statistic {
        match self {
            InstanceMetric::CpuUtilization => Statistic::Average,
            _ => Statistic::Sum,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            InstanceMetric::CpuUtilization => "Percent",
            _ => "Count",
        }
    }
}

/// Half-open query window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `minutes` leading up to `now`.
    pub fn trailing_minutes(now: DateTime<Utc>, minutes: i64) -> Self {
        Self {
            start: now - Duration::minutes(minutes),
            end: now,
        }
    }

    /// Whole days of a date range: first day 00:00:00 through last day 23:59:59.
    pub fn whole_days(range: DateRange) -> Self {
        let start = range.from.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let end = range.to.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc();
        Self { start, end }
    }
}

/// A metric as listed in a monitoring namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    pub name: String,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Latest datapoint of one instance metric in `window`, or `None` when
    /// the window holds no datapoints.
    async fn latest_instance_metric(
        &self,
        instance_id: &str,
        metric: InstanceMetric,
        window: TimeWindow,
    ) -> Result<Option<f64>>;

    /// Metrics published in a namespace.
    async fn list_metrics(&self, namespace: &str) -> Result<Vec<MetricDescriptor>>;

    /// Daily averages of one metric over `window`.
    async fn daily_averages(
        &self,
        namespace: &str,
        metric: &MetricDescriptor,
        window: TimeWindow,
    ) -> Result<Vec<f64>>;
}

#[async_trait]
pub trait CostProvider: Send + Sync {
    /// Unblended cost of a billing service over the inclusive date range.
    /// A service with no charges costs 0.0.
    async fn unblended_cost(&self, billing_service: &str, range: DateRange) -> Result<f64>;
}

#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Invoke the model with one positional feature vector. The raw model
    /// output is returned for [`predicted_type`] to interpret.
    async fn predict(&self, features: &[f64]) -> Result<serde_json::Value>;
}
