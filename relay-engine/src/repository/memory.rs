//! In-memory repositories
//!
//! Process-local stand-ins for the queue, object store and metrics sink. The
//! queue implements lease semantics: a received message stays invisible until
//! it is deleted or its visibility timeout expires, at which point it becomes
//! available again.

use async_trait::async_trait;
use relay_core::dto::metrics::MetricDatum;
use relay_core::dto::queue::{
    BatchEntry, BatchFailure, BatchSendOutcome, BatchSuccess, MAX_BATCH_SIZE, MessageAttributes,
    OutboundMessage, QueueAttributes, ReceivedMessage,
};
use relay_core::dto::store::ObjectMetadata;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use super::{MetricsSink, ObjectStore, QueueService};
use crate::error::{RelayError, Result};

/// Visibility timeout applied when none is configured
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Queue
// =============================================================================

#[derive(Debug, Clone)]
struct QueuedMessage {
    message_id: String,
    body: String,
    attributes: MessageAttributes,
}

#[derive(Debug)]
struct Lease {
    message: QueuedMessage,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    available: VecDeque<QueuedMessage>,
    leased: HashMap<String, Lease>,
    batch_calls: Vec<usize>,
    sends: usize,
}

impl QueueState {
    /// Returns expired leases to the front of the available set
    fn reclaim_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .leased
            .iter()
            .filter(|(_, lease)| lease.expires_at <= now)
            .map(|(token, _)| token.clone())
            .collect();

        for token in expired {
            if let Some(lease) = self.leased.remove(&token) {
                self.available.push_front(lease.message);
            }
        }
    }

    fn enqueue(&mut self, body: String, attributes: MessageAttributes) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.available.push_back(QueuedMessage {
            message_id: message_id.clone(),
            body,
            attributes,
        });
        message_id
    }
}

/// In-memory queue with visibility-timeout leases
#[derive(Debug)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    arrivals: Notify,
    visibility_timeout: Duration,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            arrivals: Notify::new(),
            visibility_timeout,
        }
    }

    /// Sizes of every `send_batch` call, in call order
    pub fn batch_call_sizes(&self) -> Vec<usize> {
        lock(&self.state).batch_calls.clone()
    }

    /// Number of single `send` calls
    pub fn send_count(&self) -> usize {
        lock(&self.state).sends
    }

    /// Messages currently available or leased
    pub fn depth(&self) -> usize {
        let state = lock(&self.state);
        state.available.len() + state.leased.len()
    }

    fn lease_available(&self, max_messages: usize) -> Vec<ReceivedMessage> {
        let now = Instant::now();
        let mut state = lock(&self.state);
        state.reclaim_expired(now);

        let mut received = Vec::new();
        while received.len() < max_messages {
            let Some(message) = state.available.pop_front() else {
                break;
            };
            let lease_token = Uuid::new_v4().to_string();
            received.push(ReceivedMessage {
                body: message.body.clone(),
                attributes: message.attributes.clone(),
                lease_token: lease_token.clone(),
            });
            state.leased.insert(
                lease_token,
                Lease {
                    message,
                    expires_at: now + self.visibility_timeout,
                },
            );
        }
        received
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueService for InMemoryQueue {
    async fn send(&self, message: OutboundMessage) -> Result<String> {
        let message_id = {
            let mut state = lock(&self.state);
            state.sends += 1;
            state.enqueue(message.body, message.attributes)
        };
        self.arrivals.notify_one();
        Ok(message_id)
    }

    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchSendOutcome> {
        if entries.len() > MAX_BATCH_SIZE {
            return Err(RelayError::Transport(format!(
                "batch of {} exceeds the maximum of {}",
                entries.len(),
                MAX_BATCH_SIZE
            )));
        }

        let mut outcome = BatchSendOutcome::default();
        {
            let mut state = lock(&self.state);
            state.batch_calls.push(entries.len());

            for entry in entries {
                if entry.body.is_empty() {
                    outcome.failed.push(BatchFailure {
                        id: entry.id,
                        message: "message body is empty".to_string(),
                    });
                    continue;
                }
                let message_id = state.enqueue(entry.body, entry.attributes);
                outcome.successful.push(BatchSuccess {
                    id: entry.id,
                    message_id,
                });
            }
        }

        if !outcome.successful.is_empty() {
            self.arrivals.notify_one();
        }
        Ok(outcome)
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>> {
        let max_messages = max_messages.clamp(1, MAX_BATCH_SIZE);
        let deadline = Instant::now() + wait;

        loop {
            let arrival = self.arrivals.notified();

            let received = self.lease_available(max_messages);
            if !received.is_empty() {
                return Ok(received);
            }

            // Wake for the next arrival, an expiring lease or the end of the poll
            let next_expiry = lock(&self.state)
                .leased
                .values()
                .map(|lease| lease.expires_at)
                .min();
            let wake_at = next_expiry.map_or(deadline, |expiry| expiry.min(deadline));

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            let _ = tokio::time::timeout_at(wake_at, arrival).await;
        }
    }

    async fn delete(&self, lease_token: &str) -> Result<()> {
        // Deleting an unknown or expired lease is a no-op, as with real queues
        lock(&self.state).leased.remove(lease_token);
        Ok(())
    }

    async fn attributes(&self) -> Result<QueueAttributes> {
        let mut state = lock(&self.state);
        state.reclaim_expired(Instant::now());

        Ok(QueueAttributes {
            approx_available: state.available.len() as u64,
            approx_in_flight: state.leased.len() as u64,
            approx_delayed: 0,
        })
    }
}

// =============================================================================
// Object store
// =============================================================================

/// An object held by [`InMemoryObjectStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: String,
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

/// In-memory object store keyed by object key
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        lock(&self.objects).get(key).cloned()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.objects).keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        body: String,
        content_type: &str,
        metadata: ObjectMetadata,
    ) -> Result<()> {
        lock(&self.objects).insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                metadata,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.objects).get(key).map(|object| object.body.clone()))
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metrics sink that keeps every datum
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    data: Mutex<Vec<MetricDatum>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<MetricDatum> {
        lock(&self.data).clone()
    }

    /// Sum of all values recorded under `name`
    pub fn total(&self, name: &str) -> f64 {
        lock(&self.data)
            .iter()
            .filter(|datum| datum.name == name)
            .map(|datum| datum.value)
            .sum()
    }
}

#[async_trait]
impl MetricsSink for InMemoryMetrics {
    async fn put_metric(&self, datum: MetricDatum) -> Result<()> {
        lock(&self.data).push(datum);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> OutboundMessage {
        OutboundMessage {
            body: body.to_string(),
            attributes: MessageAttributes::new(),
        }
    }

    #[tokio::test]
    async fn test_receive_leases_message() {
        let queue = InMemoryQueue::new();
        queue.send(message("a")).await.unwrap();

        let received = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(received.len(), 1);

        let attributes = queue.attributes().await.unwrap();
        assert_eq!(attributes.approx_available, 0);
        assert_eq!(attributes.approx_in_flight, 1);

        queue.delete(&received[0].lease_token).await.unwrap();
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_is_redelivered() {
        let queue = InMemoryQueue::with_visibility_timeout(Duration::from_secs(5));
        queue.send(message("a")).await.unwrap();

        let first = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(queue.receive(1, Duration::ZERO).await.unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(6)).await;

        let second = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, "a");
        assert_ne!(second[0].lease_token, first[0].lease_token);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_poll_wakes_on_send() {
        let queue = std::sync::Arc::new(InMemoryQueue::new());
        let receiver = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.receive(10, Duration::from_secs(20)).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        queue.send(message("late")).await.unwrap();

        let received = receiver.await.unwrap().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].body, "late");
    }

    #[tokio::test]
    async fn test_batch_reports_per_entry() {
        let queue = InMemoryQueue::new();
        let entries = vec![
            BatchEntry {
                id: "ok".to_string(),
                body: "x".to_string(),
                attributes: MessageAttributes::new(),
            },
            BatchEntry {
                id: "empty".to_string(),
                body: String::new(),
                attributes: MessageAttributes::new(),
            },
        ];

        let outcome = queue.send_batch(entries).await.unwrap();
        assert_eq!(outcome.successful.len(), 1);
        assert_eq!(outcome.failed[0].id, "empty");
        assert_eq!(queue.batch_call_sizes(), vec![2]);
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let store = InMemoryObjectStore::new();
        store
            .put("a/b.json", "{}".to_string(), "application/json", ObjectMetadata::new())
            .await
            .unwrap();

        assert_eq!(store.get("a/b.json").await.unwrap().as_deref(), Some("{}"));
        assert!(store.get("missing").await.unwrap().is_none());
        assert_eq!(store.keys(), vec!["a/b.json".to_string()]);
    }
}
