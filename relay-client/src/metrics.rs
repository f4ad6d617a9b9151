//! Metrics sink endpoint

use crate::error::Result;
use crate::HttpService;
use relay_core::dto::metrics::MetricDatum;
use reqwest::Client;

/// HTTP client for the metrics sink
#[derive(Debug, Clone)]
pub struct MetricsClient {
    http: HttpService,
}

impl MetricsClient {
    pub fn new(metrics_url: impl Into<String>) -> Self {
        Self::with_client(metrics_url, Client::new())
    }

    pub fn with_client(metrics_url: impl Into<String>, client: Client) -> Self {
        Self {
            http: HttpService::new(metrics_url, client),
        }
    }

    /// Publish a set of data points
    pub async fn put_metrics(&self, data: &[MetricDatum]) -> Result<()> {
        let url = self.http.url("metrics");
        let response = self.http.client.post(&url).json(data).send().await?;

        self.http.handle_empty_response(response).await
    }
}
