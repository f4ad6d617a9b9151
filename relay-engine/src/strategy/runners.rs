//! Concrete execution shapes

use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use relay_core::domain::job::Job;
use relay_core::domain::result::JobResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::progress::ProgressTracker;
use super::{StrategyEngine, tier_of};
use crate::error::{RelayError, Result};

/// Results gathered by one runner, in the order the runner produced them
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub(crate) results: Vec<JobResult>,
    pub(crate) timed_out: Vec<String>,
}

impl Collected {
    /// Turns a job's wait outcome into its terminal result
    fn settle(&mut self, job_id: &str, outcome: Result<JobResult>) -> JobResult {
        match outcome {
            Ok(result) => result,
            Err(e) if e.is_timeout() => {
                self.timed_out.push(job_id.to_string());
                JobResult::failed(job_id, e.to_string())
            }
            Err(e) => {
                error!("Job {} failed before completing: {:#}", job_id, e);
                JobResult::failed(job_id, e.to_string())
            }
        }
    }

    async fn push(&mut self, job_id: &str, outcome: Result<JobResult>, progress: &ProgressTracker) {
        let result = self.settle(job_id, outcome);
        progress.report(&result).await;
        self.results.push(result);
    }

    fn extend(&mut self, other: Collected) {
        self.results.extend(other.results);
        self.timed_out.extend(other.timed_out);
    }
}

impl StrategyEngine {
    async fn submit_and_wait(&self, job: &Job) -> Result<JobResult> {
        self.coordinator.submit(job).await?;
        self.wait_for_completion(&job.id, self.config.timeout())
            .await
    }

    /// One job at a time, results in submission order
    pub(crate) async fn run_sequential(
        &self,
        jobs: Vec<Job>,
        progress: &ProgressTracker,
    ) -> Collected {
        let mut collected = Collected::default();
        let total = jobs.len();

        for (index, job) in jobs.iter().enumerate() {
            debug!("Sequential job {}/{}: {}", index + 1, total, job.id);
            let outcome = self.submit_and_wait(job).await;
            collected.push(&job.id, outcome, progress).await;
        }

        collected
    }

    /// Windows of `batch_size`; each window is fully resolved before the next
    /// and its results keep the input order
    pub(crate) async fn run_batched(
        &self,
        jobs: Vec<Job>,
        progress: &ProgressTracker,
    ) -> Collected {
        let mut collected = Collected::default();
        let window_count = jobs.len().div_ceil(self.config.batch_size);

        for (index, window) in jobs.chunks(self.config.batch_size).enumerate() {
            info!(
                "Processing batch {}/{} ({} jobs)",
                index + 1,
                window_count,
                window.len()
            );

            let submitted = join_all(window.iter().map(|job| self.coordinator.submit(job))).await;

            let waits = window.iter().zip(submitted).map(|(job, submitted)| async move {
                let outcome = match submitted {
                    Ok(_) => {
                        self.wait_for_completion(&job.id, self.config.timeout())
                            .await
                    }
                    Err(e) => Err(e),
                };
                (job.id.as_str(), outcome)
            });

            for (job_id, outcome) in join_all(waits).await {
                collected.push(job_id, outcome, progress).await;
            }
        }

        collected
    }

    /// At most `max_workers` jobs in flight, results in completion order
    pub(crate) async fn run_bounded(
        &self,
        jobs: Vec<Job>,
        progress: &ProgressTracker,
    ) -> Collected {
        let permits = Arc::new(Semaphore::new(self.config.max_workers));
        let mut collected = Collected::default();

        let mut running: FuturesUnordered<_> = jobs
            .iter()
            .map(|job| {
                let permits = permits.clone();
                async move {
                    let outcome = match permits.acquire_owned().await {
                        Ok(_permit) => self.submit_and_wait(job).await,
                        Err(_) => Err(RelayError::Configuration(
                            "worker pool closed".to_string(),
                        )),
                    };
                    (job.id.as_str(), outcome)
                }
            })
            .collect();

        while let Some((job_id, outcome)) = running.next().await {
            collected.push(job_id, outcome, progress).await;
        }

        collected
    }

    /// Tier 1 sequential, tier 2 batched, tier 3 bounded, tiers in order
    pub(crate) async fn run_tiered(&self, jobs: Vec<Job>, progress: &ProgressTracker) -> Collected {
        let mut tiers: BTreeMap<u8, Vec<Job>> = BTreeMap::new();
        for job in jobs {
            tiers.entry(tier_of(job.priority)).or_default().push(job);
        }

        let mut collected = Collected::default();
        for (tier, jobs) in tiers {
            info!("Processing priority tier {} ({} jobs)", tier, jobs.len());
            let phase = match tier {
                1 => self.run_sequential(jobs, progress).await,
                2 => self.run_batched(jobs, progress).await,
                _ => self.run_bounded(jobs, progress).await,
            };
            collected.extend(phase);
        }

        collected
    }
}
