//! Queue repository

use async_trait::async_trait;
use relay_client::QueueClient;
use relay_core::dto::queue::{
    BatchEntry, BatchSendOutcome, OutboundMessage, QueueAttributes, ReceiveRequest,
    ReceivedMessage,
};
use std::time::Duration;

use crate::error::Result;

/// Repository trait for the durable job queue
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Sends one message, returning the delivery id assigned by the queue
    async fn send(&self, message: OutboundMessage) -> Result<String>;

    /// Sends up to `MAX_BATCH_SIZE` messages in one call
    ///
    /// Partial failure is reported per entry, not as an error.
    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchSendOutcome>;

    /// Long-polls for up to `max_messages`, leasing each one returned
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>>;

    /// Acknowledges a leased message
    async fn delete(&self, lease_token: &str) -> Result<()>;

    /// Approximate message counts
    async fn attributes(&self) -> Result<QueueAttributes>;
}

/// HTTP implementation of QueueService
pub struct HttpQueue {
    client: QueueClient,
}

impl HttpQueue {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            client: QueueClient::new(queue_url),
        }
    }
}

#[async_trait]
impl QueueService for HttpQueue {
    async fn send(&self, message: OutboundMessage) -> Result<String> {
        let receipt = self.client.send(&message).await?;
        Ok(receipt.message_id)
    }

    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchSendOutcome> {
        Ok(self.client.send_batch(entries).await?)
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>> {
        let request = ReceiveRequest::new(max_messages, wait.as_secs());
        Ok(self.client.receive(request).await?)
    }

    async fn delete(&self, lease_token: &str) -> Result<()> {
        Ok(self.client.delete(lease_token).await?)
    }

    async fn attributes(&self) -> Result<QueueAttributes> {
        Ok(self.client.attributes().await?)
    }
}
