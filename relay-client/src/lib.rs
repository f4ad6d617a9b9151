//! Relay HTTP Clients
//!
//! Thin, typed HTTP clients for the external services the coordinator talks
//! to: the durable job queue, the result object store, the metrics sink and
//! the Ollama inference endpoint.
//!
//! # Example
//!
//! ```no_run
//! use relay_client::QueueClient;
//! use relay_core::dto::queue::ReceiveRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relay_client::ClientError> {
//!     let queue = QueueClient::new("http://localhost:9324/queues/relay-jobs");
//!
//!     let messages = queue.receive(ReceiveRequest::new(10, 20)).await?;
//!     println!("Leased {} messages", messages.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod metrics;
mod ollama;
mod queue;
mod store;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use metrics::MetricsClient;
pub use ollama::OllamaClient;
pub use queue::QueueClient;
pub use store::StoreClient;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Base URL plus a shared reqwest client
///
/// Every service client wraps one of these and reuses its response handlers.
#[derive(Debug, Clone)]
pub(crate) struct HttpService {
    base_url: String,
    client: Client,
}

impl HttpService {
    pub(crate) fn new(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize a JSON body
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check the status code of a response that carries no content
    pub(crate) async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await.map(|_| ())
    }

    /// Check the status code and return the raw body
    pub(crate) async fn handle_text_response(&self, response: reqwest::Response) -> Result<String> {
        let response = Self::check_status(response).await?;

        response
            .text()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to read response body: {}", e)))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_trims_trailing_slash() {
        let service = HttpService::new("http://localhost:9324/", Client::new());
        assert_eq!(service.base_url, "http://localhost:9324");
    }

    #[test]
    fn test_url_joins_paths() {
        let service = HttpService::new("http://localhost:9324/queues/jobs", Client::new());
        assert_eq!(
            service.url("/messages/batch"),
            "http://localhost:9324/queues/jobs/messages/batch"
        );
        assert_eq!(
            service.url("attributes"),
            "http://localhost:9324/queues/jobs/attributes"
        );
    }
}
