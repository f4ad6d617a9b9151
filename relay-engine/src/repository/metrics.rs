//! Metrics repository
//!
//! Metrics are best-effort: [`record_metric`] logs sink failures and never
//! propagates them.

use async_trait::async_trait;
use relay_client::MetricsClient;
use relay_core::dto::metrics::MetricDatum;
use tracing::{debug, warn};

use crate::error::Result;

/// Repository trait for the metrics sink
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_metric(&self, datum: MetricDatum) -> Result<()>;
}

/// Publishes a count metric, logging instead of failing
pub async fn record_metric(sink: &dyn MetricsSink, namespace: &str, name: &str, value: f64) {
    if let Err(e) = sink
        .put_metric(MetricDatum::count(namespace, name, value))
        .await
    {
        warn!("Failed to send metric {}: {:#}", name, e);
    }
}

/// HTTP implementation of MetricsSink
pub struct HttpMetricsSink {
    client: MetricsClient,
}

impl HttpMetricsSink {
    pub fn new(metrics_url: impl Into<String>) -> Self {
        Self {
            client: MetricsClient::new(metrics_url),
        }
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn put_metric(&self, datum: MetricDatum) -> Result<()> {
        Ok(self.client.put_metrics(std::slice::from_ref(&datum)).await?)
    }
}

/// Sink used when no metrics endpoint is configured
pub struct LogMetricsSink;

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn put_metric(&self, datum: MetricDatum) -> Result<()> {
        debug!(
            "metric {}/{} = {} ({:?})",
            datum.namespace, datum.name, datum.value, datum.unit
        );
        Ok(())
    }
}
