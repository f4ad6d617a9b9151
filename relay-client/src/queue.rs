//! Durable queue endpoints

use crate::error::Result;
use crate::HttpService;
use relay_core::dto::queue::{
    BatchEntry, BatchSendOutcome, OutboundMessage, QueueAttributes, ReceiveRequest,
    ReceivedMessage, SendBatchRequest, SendReceipt,
};
use reqwest::Client;
use tracing::debug;

/// HTTP client for a single durable queue
///
/// The queue exposes a small JSON API: single and batch sends, long-poll
/// receives that lease messages, deletes by lease token, and approximate
/// counts.
#[derive(Debug, Clone)]
pub struct QueueClient {
    http: HttpService,
}

impl QueueClient {
    /// Create a client for the queue at `queue_url`
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self::with_client(queue_url, Client::new())
    }

    /// Create a client with a preconfigured reqwest client
    pub fn with_client(queue_url: impl Into<String>, client: Client) -> Self {
        Self {
            http: HttpService::new(queue_url, client),
        }
    }

    // =============================================================================
    // Sending
    // =============================================================================

    /// Send one message
    pub async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt> {
        let url = self.http.url("messages");
        let response = self.http.client.post(&url).json(message).send().await?;

        self.http.handle_response(response).await
    }

    /// Send up to ten messages in one call
    ///
    /// The queue reports success or failure per entry, keyed by entry id.
    pub async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchSendOutcome> {
        let url = self.http.url("messages/batch");
        debug!("Sending batch of {} messages", entries.len());
        let response = self
            .http
            .client
            .post(&url)
            .json(&SendBatchRequest { entries })
            .send()
            .await?;

        self.http.handle_response(response).await
    }

    // =============================================================================
    // Receiving
    // =============================================================================

    /// Long-poll for messages, leasing each one returned
    pub async fn receive(&self, request: ReceiveRequest) -> Result<Vec<ReceivedMessage>> {
        let url = self.http.url("messages/receive");
        let response = self.http.client.post(&url).json(&request).send().await?;

        self.http.handle_response(response).await
    }

    /// Acknowledge a leased message
    pub async fn delete(&self, lease_token: &str) -> Result<()> {
        let url = self.http.url(&format!("messages/{}", lease_token));
        let response = self.http.client.delete(&url).send().await?;

        self.http.handle_empty_response(response).await
    }

    /// Approximate available, in-flight and delayed counts
    pub async fn attributes(&self) -> Result<QueueAttributes> {
        let url = self.http.url("attributes");
        let response = self.http.client.get(&url).send().await?;

        self.http.handle_response(response).await
    }
}
