#![allow(dead_code)]

use async_trait::async_trait;
use relay_core::domain::job::{Job, TestKind};
use relay_core::domain::result::{Outcome, TestOutcome};
use relay_core::dto::queue::{
    BatchEntry, BatchSendOutcome, OutboundMessage, QueueAttributes, ReceivedMessage,
};
use relay_engine::error::{RelayError, Result};
use relay_engine::repository::{InMemoryMetrics, InMemoryObjectStore, InMemoryQueue, QueueService};
use relay_engine::service::InferenceBackend;
use relay_engine::{ConsumerSettings, JobCoordinator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Inference stub that records call order and peak concurrency
pub struct StubBackend {
    delay: Duration,
    fail_prefix: Option<&'static str>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl StubBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_prefix: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Fails every job whose id starts with `prefix`
    pub fn failing(mut self, prefix: &'static str) -> Self {
        self.fail_prefix = Some(prefix);
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for StubBackend {
    async fn infer(&self, job: &Job) -> Result<Outcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push(job.id.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_prefix.is_some_and(|prefix| job.id.starts_with(prefix)) {
            return Err(RelayError::Inference("model overloaded".to_string()));
        }

        Ok(Outcome::Tests(TestOutcome {
            tests_generated: 2,
            coverage_percentage: 80.0,
            ..TestOutcome::default()
        }))
    }
}

/// Queue that reports fixed attributes and delegates everything else
pub struct FixedStatsQueue {
    inner: Arc<InMemoryQueue>,
    attributes: QueueAttributes,
}

impl FixedStatsQueue {
    pub fn new(inner: Arc<InMemoryQueue>, available: u64, in_flight: u64) -> Self {
        Self {
            inner,
            attributes: QueueAttributes {
                approx_available: available,
                approx_in_flight: in_flight,
                approx_delayed: 0,
            },
        }
    }
}

#[async_trait]
impl QueueService for FixedStatsQueue {
    async fn send(&self, message: OutboundMessage) -> Result<String> {
        self.inner.send(message).await
    }

    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchSendOutcome> {
        self.inner.send_batch(entries).await
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>> {
        self.inner.receive(max_messages, wait).await
    }

    async fn delete(&self, lease_token: &str) -> Result<()> {
        self.inner.delete(lease_token).await
    }

    async fn attributes(&self) -> Result<QueueAttributes> {
        Ok(self.attributes)
    }
}

/// Queue that fails chosen calls with transport errors and delegates the rest
pub struct FaultyQueue {
    inner: Arc<InMemoryQueue>,
    sends_allowed: Option<usize>,
    failing_receives: usize,
    failing_batches: Vec<usize>,
    sends: AtomicUsize,
    rejected_sends: AtomicUsize,
    receives: AtomicUsize,
    failed_receives: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl FaultyQueue {
    pub fn new(inner: Arc<InMemoryQueue>) -> Self {
        Self {
            inner,
            sends_allowed: None,
            failing_receives: 0,
            failing_batches: Vec::new(),
            sends: AtomicUsize::new(0),
            rejected_sends: AtomicUsize::new(0),
            receives: AtomicUsize::new(0),
            failed_receives: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// Accepts the first `n` single sends and rejects every later one
    pub fn reject_sends_after(mut self, n: usize) -> Self {
        self.sends_allowed = Some(n);
        self
    }

    /// Fails the first `n` receive calls
    pub fn fail_receives(mut self, n: usize) -> Self {
        self.failing_receives = n;
        self
    }

    /// Fails the batch calls at the given zero-based positions
    pub fn fail_batch_calls(mut self, calls: Vec<usize>) -> Self {
        self.failing_batches = calls;
        self
    }

    pub fn rejected_sends(&self) -> usize {
        self.rejected_sends.load(Ordering::SeqCst)
    }

    pub fn failed_receives(&self) -> usize {
        self.failed_receives.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueService for FaultyQueue {
    async fn send(&self, message: OutboundMessage) -> Result<String> {
        let call = self.sends.fetch_add(1, Ordering::SeqCst);
        if self.sends_allowed.is_some_and(|allowed| call >= allowed) {
            self.rejected_sends.fetch_add(1, Ordering::SeqCst);
            return Err(RelayError::Transport("send rejected".to_string()));
        }
        self.inner.send(message).await
    }

    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<BatchSendOutcome> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_batches.contains(&call) {
            return Err(RelayError::Transport("batch rejected".to_string()));
        }
        self.inner.send_batch(entries).await
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<ReceivedMessage>> {
        let call = self.receives.fetch_add(1, Ordering::SeqCst);
        if call < self.failing_receives {
            self.failed_receives.fetch_add(1, Ordering::SeqCst);
            return Err(RelayError::Transport("connection reset".to_string()));
        }
        self.inner.receive(max_messages, wait).await
    }

    async fn delete(&self, lease_token: &str) -> Result<()> {
        self.inner.delete(lease_token).await
    }

    async fn attributes(&self) -> Result<QueueAttributes> {
        self.inner.attributes().await
    }
}

pub struct Harness {
    pub coordinator: JobCoordinator,
    pub queue: Arc<InMemoryQueue>,
    pub store: Arc<InMemoryObjectStore>,
    pub metrics: Arc<InMemoryMetrics>,
    pub backend: Arc<StubBackend>,
}

pub fn consumer_settings() -> ConsumerSettings {
    ConsumerSettings {
        receive_batch: 10,
        receive_wait: Duration::from_millis(20),
        error_pause: Duration::from_millis(20),
    }
}

impl Harness {
    pub fn new(backend: StubBackend) -> Self {
        let queue = Arc::new(InMemoryQueue::new());
        Self::with_queue(queue.clone(), queue, backend)
    }

    /// Routes the coordinator through `service` while keeping `queue` for inspection
    pub fn with_queue(
        queue: Arc<InMemoryQueue>,
        service: Arc<dyn QueueService>,
        backend: StubBackend,
    ) -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let metrics = Arc::new(InMemoryMetrics::new());
        let backend = Arc::new(backend);
        let coordinator = JobCoordinator::new(service, store.clone(), backend.clone())
            .with_metrics(metrics.clone())
            .with_settings(consumer_settings());

        Self {
            coordinator,
            queue,
            store,
            metrics,
            backend,
        }
    }

    /// Starts a consumer loop in the background
    pub fn start_consumer(&self, max_concurrency: usize) -> Consumer {
        let shutdown = CancellationToken::new();
        let coordinator = self.coordinator.clone();
        let token = shutdown.clone();
        let handle =
            tokio::spawn(async move { coordinator.run_consumer_loop(max_concurrency, token).await });
        Consumer { shutdown, handle }
    }
}

pub struct Consumer {
    shutdown: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl Consumer {
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

pub fn test_jobs(prefix: &str, n: usize) -> Vec<Job> {
    (0..n)
        .map(|i| Job::test_generation(format!("{}-{}", prefix, i), "fn f() {}", "rust", TestKind::Unit))
        .collect()
}
