//! Metric DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace for coordinator metrics
pub const DISTRIBUTED_NAMESPACE: &str = "Relay/Distributed";

/// Namespace for error distribution metrics
pub const ERROR_DISTRIBUTION_NAMESPACE: &str = "Relay/ErrorDistribution";

/// Unit of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricUnit {
    Count,
    Milliseconds,
    Percent,
}

/// One data point sent to the metrics sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    pub namespace: String,
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
    pub timestamp: DateTime<Utc>,
}

impl MetricDatum {
    pub fn count(namespace: &str, name: &str, value: f64) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            value,
            unit: MetricUnit::Count,
            timestamp: Utc::now(),
        }
    }
}
