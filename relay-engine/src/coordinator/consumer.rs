//! Consumer loop
//!
//! Leases messages from the queue and executes each one in its own task,
//! with at most `max_concurrency` tasks in flight. Each task runs the job
//! through the inference backend, persists the result, acknowledges the
//! message and records the result with the tracker. Failed jobs are requeued
//! until their retry budget is spent.

use relay_core::domain::job::{Job, RetryDecision};
use relay_core::domain::result::JobResult;
use relay_core::dto::metrics::DISTRIBUTED_NAMESPACE;
use relay_core::dto::queue::ReceivedMessage;
use relay_core::dto::store::{ERROR_FIXES_NAMESPACE, TEST_RESULTS_NAMESPACE};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::JobCoordinator;
use crate::error::{RelayError, Result};
use crate::repository::record_metric;

impl JobCoordinator {
    /// Runs the consumer loop until `shutdown` is cancelled
    ///
    /// Receive errors are logged and followed by the configured pause; they
    /// never end the loop. On cancellation no further messages are leased and
    /// the tasks already running finish their current job before this returns.
    pub async fn run_consumer_loop(
        &self,
        max_concurrency: usize,
        shutdown: CancellationToken,
    ) -> Result<()> {
        if max_concurrency == 0 {
            return Err(RelayError::Configuration(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        info!(
            "Starting consumer loop (max concurrency: {}, batch: {}, wait: {:?})",
            max_concurrency, self.settings.receive_batch, self.settings.receive_wait
        );

        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let mut tasks = JoinSet::new();

        loop {
            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    warn!("Job task panicked: {}", e);
                }
            }

            // Lease only what can start now; the rest stays on the queue
            let capacity = semaphore
                .available_permits()
                .clamp(1, self.settings.receive_batch.max(1));

            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.queue.receive(capacity, self.settings.receive_wait) => received,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    error!("Error receiving messages: {:#}", e);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.error_pause) => continue,
                    }
                }
            };

            if messages.is_empty() {
                debug!("No messages available");
                continue;
            }

            debug!("Leased {} message(s)", messages.len());

            for message in messages {
                // Unstarted messages return to the queue when their lease expires
                let permit = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };
                self.spawn_message_task(&mut tasks, message, permit);
            }
        }

        info!(
            "Consumer loop stopping, waiting for {} in-flight job(s)",
            tasks.len()
        );
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Job task panicked: {}", e);
            }
        }
        info!("Consumer loop stopped");

        Ok(())
    }

    fn spawn_message_task(
        &self,
        tasks: &mut JoinSet<()>,
        message: ReceivedMessage,
        permit: OwnedSemaphorePermit,
    ) {
        let coordinator = self.clone();
        tasks.spawn(async move {
            coordinator.process_message(message).await;
            // Permit is released when dropped
            drop(permit);
        });
    }

    /// Handles one leased message end to end
    async fn process_message(&self, message: ReceivedMessage) {
        let job = match Job::decode(&message.body) {
            Ok(job) => job,
            Err(e) => {
                self.handle_malformed(&message, RelayError::from(e)).await;
                return;
            }
        };

        info!("Processing job {} ({})", job.id, job.describe());

        match self.execute_job(&job).await {
            Ok(result) => {
                self.acknowledge(&message).await;
                info!(
                    "Job {} completed in {}ms",
                    job.id, result.execution_time_ms
                );
                let tests_generated = result.tests_generated();
                self.tracker.complete(result);

                record_metric(self.metrics.as_ref(), DISTRIBUTED_NAMESPACE, "JobsCompleted", 1.0)
                    .await;
                if tests_generated > 0 {
                    record_metric(
                        self.metrics.as_ref(),
                        DISTRIBUTED_NAMESPACE,
                        "TestsGenerated",
                        f64::from(tests_generated),
                    )
                    .await;
                }
            }
            Err(e) => {
                error!("Job {} failed: {:#}", job.id, e);
                self.handle_failure(job, &message, e).await;
            }
        }
    }

    /// Runs inference and persists the successful result
    async fn execute_job(&self, job: &Job) -> Result<JobResult> {
        let started = Instant::now();
        let outcome = self.inference.infer(job).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = JobResult::succeeded(job.id.clone(), outcome).with_execution_time(elapsed_ms);
        self.archive.store(job, &result).await?;

        Ok(result)
    }

    /// Requeues the job or records its terminal failure
    async fn handle_failure(&self, mut job: Job, message: &ReceivedMessage, cause: RelayError) {
        match job.record_failure() {
            RetryDecision::Requeue => {
                info!(
                    "Requeueing job {} (retry {}/{})",
                    job.id,
                    job.retry_count(),
                    job.max_retries()
                );
                self.tracker.requeue(&job);

                match self.send_job(&job).await {
                    // The original delivery is dropped so it is not redelivered
                    Ok(_) => self.acknowledge(message).await,
                    // Left leased and still active; it returns when the lease expires
                    Err(e) => error!("Failed to requeue job {}: {:#}", job.id, e),
                }
            }
            RetryDecision::Exhausted => {
                warn!(
                    "Job {} failed after {} attempt(s), giving up",
                    job.id,
                    job.max_retries()
                );
                let result = JobResult::failed(job.id.clone(), cause.to_string());

                if let Err(e) = self.archive.store(&job, &result).await {
                    error!("Failed to store terminal result for job {}: {:#}", job.id, e);
                }
                self.acknowledge(message).await;
                self.tracker.complete(result);

                record_metric(self.metrics.as_ref(), DISTRIBUTED_NAMESPACE, "JobsFailed", 1.0)
                    .await;
            }
        }
    }

    /// Records a terminal failure for a body that cannot be decoded
    ///
    /// Resubmitting would reproduce the same error, so the message is always
    /// deleted. A result is recorded when the job id can still be recovered.
    async fn handle_malformed(&self, message: &ReceivedMessage, cause: RelayError) {
        error!("Discarding malformed message: {}", cause);

        let salvaged = serde_json::from_str::<serde_json::Value>(&message.body)
            .ok()
            .and_then(|value| {
                let id = value.get("id")?.as_str()?.to_string();
                let is_fix = value
                    .get("spec")
                    .and_then(|spec| spec.get("type"))
                    .and_then(|kind| kind.as_str())
                    == Some("error_fix");
                Some((id, is_fix))
            });

        if let Some((job_id, is_fix)) = salvaged {
            let namespace = if is_fix {
                ERROR_FIXES_NAMESPACE
            } else {
                TEST_RESULTS_NAMESPACE
            };
            let result = JobResult::failed(job_id.clone(), cause.to_string());

            if let Err(e) = self.archive.store_in(namespace, &result, None).await {
                error!("Failed to store terminal result for job {}: {:#}", job_id, e);
            }
            self.tracker.complete(result);
            record_metric(self.metrics.as_ref(), DISTRIBUTED_NAMESPACE, "JobsFailed", 1.0).await;
        }

        self.acknowledge(message).await;
    }

    async fn acknowledge(&self, message: &ReceivedMessage) {
        if let Err(e) = self.queue.delete(&message.lease_token).await {
            warn!("Failed to delete message {}: {:#}", message.lease_token, e);
        }
    }
}
