//! Job coordinator
//!
//! Owns the queue, the result archive and the job tracker. Jobs enter through
//! [`JobCoordinator::submit`] or [`JobCoordinator::submit_batch`], are leased
//! and executed by the consumer loop, and surface again through
//! [`JobCoordinator::get_status`] and [`JobCoordinator::wait_for_completion`].

mod archive;
mod consumer;
mod tracker;

pub use archive::ResultArchive;

use chrono::NaiveDate;
use relay_core::domain::job::Job;
use relay_core::domain::result::JobResult;
use relay_core::dto::metrics::DISTRIBUTED_NAMESPACE;
use relay_core::dto::queue::{
    BatchEntry, MAX_BATCH_SIZE, OutboundMessage, QueueStats, routing_attributes,
};
use relay_core::dto::status::JobStatusView;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{RelayError, Result};
use crate::repository::{LogMetricsSink, MetricsSink, ObjectStore, QueueService, record_metric};
use crate::service::InferenceBackend;
use tracker::JobTracker;

/// Consumer loop tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// Max messages leased per receive
    pub receive_batch: usize,
    /// Long-poll duration
    pub receive_wait: Duration,
    /// Pause after a failed receive
    pub error_pause: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            receive_batch: MAX_BATCH_SIZE,
            receive_wait: Duration::from_secs(20),
            error_pause: Duration::from_secs(5),
        }
    }
}

/// Queue-backed job coordinator
///
/// Cheap to clone; clones share the same tracker, so every clone observes the
/// same active and completed jobs.
#[derive(Clone)]
pub struct JobCoordinator {
    queue: Arc<dyn QueueService>,
    archive: ResultArchive,
    metrics: Arc<dyn MetricsSink>,
    inference: Arc<dyn InferenceBackend>,
    tracker: Arc<JobTracker>,
    settings: ConsumerSettings,
}

impl JobCoordinator {
    /// Creates a coordinator that logs metrics instead of publishing them
    pub fn new(
        queue: Arc<dyn QueueService>,
        store: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceBackend>,
    ) -> Self {
        Self {
            queue,
            archive: ResultArchive::new(store),
            metrics: Arc::new(LogMetricsSink),
            inference,
            tracker: Arc::new(JobTracker::new()),
            settings: ConsumerSettings::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_settings(mut self, settings: ConsumerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn archive(&self) -> &ResultArchive {
        &self.archive
    }

    // =============================================================================
    // Submission
    // =============================================================================

    /// Sends one job to the queue, returning its delivery id
    ///
    /// Transport failures are returned as is; this call does not retry.
    pub async fn submit(&self, job: &Job) -> Result<String> {
        self.tracker.begin(job);

        self.send_job(job).await.inspect_err(|_| {
            self.tracker.abandon(&job.id);
        })
    }

    /// Sends a job without touching the tracker
    pub(crate) async fn send_job(&self, job: &Job) -> Result<String> {
        let message = OutboundMessage {
            body: job.encode()?,
            attributes: routing_attributes(job),
        };

        match self.queue.send(message).await {
            Ok(delivery_id) => {
                info!("Submitted job {} as message {}", job.id, delivery_id);
                record_metric(self.metrics.as_ref(), DISTRIBUTED_NAMESPACE, "JobsSubmitted", 1.0)
                    .await;
                Ok(delivery_id)
            }
            Err(e) => {
                error!("Failed to submit job {}: {:#}", job.id, e);
                Err(e)
            }
        }
    }

    /// Sends jobs in chunks of the queue's maximum batch size
    ///
    /// Each chunk reports its own partial failures, which are logged and
    /// skipped. An error is returned only when every chunk fails.
    pub async fn submit_batch(&self, jobs: &[Job]) -> Result<Vec<String>> {
        let mut delivery_ids = Vec::with_capacity(jobs.len());
        let mut failed_chunks = 0;
        let mut last_error = None;
        let chunk_count = jobs.len().div_ceil(MAX_BATCH_SIZE);

        for (index, chunk) in jobs.chunks(MAX_BATCH_SIZE).enumerate() {
            let mut entries = Vec::with_capacity(chunk.len());
            for job in chunk {
                match job.encode() {
                    Ok(body) => {
                        self.tracker.begin(job);
                        entries.push(BatchEntry {
                            id: job.id.clone(),
                            body,
                            attributes: routing_attributes(job),
                        });
                    }
                    Err(e) => error!("Failed to encode job {}: {}", job.id, e),
                }
            }

            if entries.is_empty() {
                failed_chunks += 1;
                continue;
            }

            let entry_ids: Vec<String> = entries.iter().map(|entry| entry.id.clone()).collect();

            match self.queue.send_batch(entries).await {
                Ok(outcome) => {
                    for failure in &outcome.failed {
                        warn!(
                            "Batch {}: job {} rejected: {}",
                            index + 1,
                            failure.id,
                            failure.message
                        );
                        self.tracker.abandon(&failure.id);
                    }
                    if outcome.successful.is_empty() {
                        failed_chunks += 1;
                    }
                    debug!(
                        "Batch {}: {} sent, {} rejected",
                        index + 1,
                        outcome.successful.len(),
                        outcome.failed.len()
                    );
                    delivery_ids.extend(outcome.successful.into_iter().map(|s| s.message_id));
                }
                Err(e) => {
                    error!("Batch {} failed: {:#}", index + 1, e);
                    for id in &entry_ids {
                        self.tracker.abandon(id);
                    }
                    failed_chunks += 1;
                    last_error = Some(e);
                }
            }
        }

        if chunk_count > 0 && failed_chunks == chunk_count {
            return Err(last_error.unwrap_or_else(|| {
                RelayError::Transport(format!("all {} batch chunk(s) were rejected", chunk_count))
            }));
        }

        info!("Submitted {}/{} jobs in batches", delivery_ids.len(), jobs.len());
        record_metric(
            self.metrics.as_ref(),
            DISTRIBUTED_NAMESPACE,
            "BatchJobsSubmitted",
            delivery_ids.len() as f64,
        )
        .await;

        Ok(delivery_ids)
    }

    // =============================================================================
    // Status
    // =============================================================================

    /// Where a job stands in this coordinator
    pub fn get_status(&self, job_id: &str) -> JobStatusView {
        self.tracker.status(job_id)
    }

    /// Status lookup that falls back to the result archive
    ///
    /// Lets a process that never saw the job (such as a separate CLI
    /// invocation) find results another consumer stored on `date`.
    pub async fn lookup_status(&self, job_id: &str, date: NaiveDate) -> Result<JobStatusView> {
        let status = self.get_status(job_id);
        if !matches!(status, JobStatusView::NotFound { .. }) {
            return Ok(status);
        }

        Ok(match self.archive.find(date, job_id).await? {
            Some(stored) => JobStatusView::Completed {
                result: stored.result,
            },
            None => status,
        })
    }

    /// Queue counts combined with this coordinator's tracking
    pub async fn get_queue_stats(&self) -> Result<QueueStats> {
        let attributes = self.queue.attributes().await?;
        let (active_count, completed_count) = self.tracker.counts();

        Ok(QueueStats {
            available: attributes.approx_available,
            in_flight: attributes.approx_in_flight,
            delayed: attributes.approx_delayed,
            active_count,
            completed_count,
        })
    }

    /// Waits until a job has a terminal result
    ///
    /// Checks `get_status` whenever a completion is recorded and at least every
    /// `poll_interval`. Expiry yields [`RelayError::Timeout`].
    pub async fn wait_for_completion(
        &self,
        job_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<JobResult> {
        let wait = async {
            loop {
                let completion = self.tracker.next_completion();

                if let JobStatusView::Completed { result } = self.get_status(job_id) {
                    return result;
                }

                tokio::select! {
                    _ = completion => {}
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| RelayError::timeout(job_id, timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryMetrics, InMemoryObjectStore, InMemoryQueue};
    use async_trait::async_trait;
    use relay_core::domain::job::TestKind;
    use relay_core::domain::result::{Outcome, TestOutcome};

    struct NoopBackend;

    #[async_trait]
    impl InferenceBackend for NoopBackend {
        async fn infer(&self, _job: &Job) -> Result<Outcome> {
            Ok(Outcome::Tests(TestOutcome::default()))
        }
    }

    fn coordinator(queue: Arc<InMemoryQueue>, metrics: Arc<InMemoryMetrics>) -> JobCoordinator {
        JobCoordinator::new(queue, Arc::new(InMemoryObjectStore::new()), Arc::new(NoopBackend))
            .with_metrics(metrics)
    }

    fn jobs(n: usize) -> Vec<Job> {
        (0..n)
            .map(|i| Job::test_generation(format!("job-{}", i), "code", "rust", TestKind::Unit))
            .collect()
    }

    #[tokio::test]
    async fn test_submit_tracks_job() {
        let queue = Arc::new(InMemoryQueue::new());
        let metrics = Arc::new(InMemoryMetrics::new());
        let coordinator = coordinator(queue.clone(), metrics.clone());

        let job = &jobs(1)[0];
        coordinator.submit(job).await.unwrap();

        assert_eq!(coordinator.get_status(&job.id).label(), "processing");
        assert_eq!(queue.send_count(), 1);
        assert_eq!(metrics.total("JobsSubmitted"), 1.0);

        let stats = coordinator.get_queue_stats().await.unwrap();
        assert_eq!(stats.available, 1);
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.completed_count, 0);
    }

    #[tokio::test]
    async fn test_submit_batch_chunks() {
        let queue = Arc::new(InMemoryQueue::new());
        let metrics = Arc::new(InMemoryMetrics::new());
        let coordinator = coordinator(queue.clone(), metrics.clone());

        let ids = coordinator.submit_batch(&jobs(25)).await.unwrap();

        assert_eq!(ids.len(), 25);
        assert_eq!(queue.batch_call_sizes(), vec![10, 10, 5]);
        assert_eq!(metrics.total("BatchJobsSubmitted"), 25.0);
    }

    #[tokio::test]
    async fn test_submit_batch_empty() {
        let coordinator = coordinator(
            Arc::new(InMemoryQueue::new()),
            Arc::new(InMemoryMetrics::new()),
        );
        assert!(coordinator.submit_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_completion_times_out() {
        let coordinator = coordinator(
            Arc::new(InMemoryQueue::new()),
            Arc::new(InMemoryMetrics::new()),
        );

        let err = coordinator
            .wait_for_completion("ghost", Duration::from_secs(3), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_wait_for_completion_sees_recorded_result() {
        let coordinator = coordinator(
            Arc::new(InMemoryQueue::new()),
            Arc::new(InMemoryMetrics::new()),
        );
        let job = &jobs(1)[0];
        coordinator.submit(job).await.unwrap();

        let waiter = {
            let coordinator = coordinator.clone();
            let id = job.id.clone();
            tokio::spawn(async move {
                coordinator
                    .wait_for_completion(&id, Duration::from_secs(5), Duration::from_secs(1))
                    .await
            })
        };
        tokio::task::yield_now().await;
        coordinator.tracker.complete(JobResult::failed(&job.id, "boom"));

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result.error_message.as_deref(), Some("boom"));
    }
}
