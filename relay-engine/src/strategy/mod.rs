//! Execution strategy engine
//!
//! Decides the concurrency shape for a set of jobs and drives the coordinator
//! accordingly: submit, wait for each terminal result, and fold the results
//! into an [`ExecutionResult`].

mod progress;
mod runners;

pub use progress::ProgressSink;

use relay_core::domain::execution::{ExecutionResult, ExecutionStrategy};
use relay_core::domain::job::Job;
use relay_core::domain::result::JobResult;
use relay_core::dto::queue::QueueStats;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::coordinator::JobCoordinator;
use crate::error::{RelayError, Result};
use progress::ProgressTracker;

/// Queue depth above which the adaptive strategy falls back to sequential
pub const BACKLOG_HIGH_WATER: u64 = 50;

/// In-flight count below which the adaptive strategy treats the system as idle
pub const IDLE_IN_FLIGHT: u64 = 10;

/// Strategy and limits for one engine
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub strategy: ExecutionStrategy,
    pub max_workers: usize,
    pub timeout_seconds: u64,
    pub batch_size: usize,
    /// Status polling interval while waiting for a result
    pub poll_interval: Duration,
}

impl ExecutionConfig {
    pub fn new(strategy: ExecutionStrategy) -> Self {
        Self {
            strategy,
            max_workers: 4,
            timeout_seconds: 300,
            batch_size: 10,
            poll_interval: Duration::from_secs(1),
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(RelayError::Configuration(
                "max_workers must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(RelayError::Configuration(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(RelayError::Configuration(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(RelayError::Configuration(
                "poll_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new(ExecutionStrategy::BatchedParallel)
    }
}

/// Snapshot of the engine's settings and tracked executions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionStats {
    pub active_executions: usize,
    pub strategy: ExecutionStrategy,
    pub max_workers: usize,
    pub batch_size: usize,
    pub timeout_seconds: u64,
}

/// Parses a strategy name, accepting the legacy aliases
pub fn parse_strategy(name: &str) -> Result<ExecutionStrategy> {
    name.parse().map_err(RelayError::Configuration)
}

/// Picks the concrete strategy for the current backlog
pub fn select_for_backlog(stats: &QueueStats) -> ExecutionStrategy {
    if stats.available > BACKLOG_HIGH_WATER {
        ExecutionStrategy::Sequential
    } else if stats.in_flight < IDLE_IN_FLIGHT {
        ExecutionStrategy::BoundedParallel
    } else {
        ExecutionStrategy::BatchedParallel
    }
}

/// Priority tier (1..=3) a job is scheduled in
pub fn tier_of(priority: u8) -> u8 {
    priority.clamp(1, 3)
}

/// Drives a coordinator with one execution strategy
#[derive(Clone)]
pub struct StrategyEngine {
    coordinator: JobCoordinator,
    config: ExecutionConfig,
    executions: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl StrategyEngine {
    /// Creates an engine, rejecting invalid configuration up front
    pub fn new(coordinator: JobCoordinator, config: ExecutionConfig) -> Result<Self> {
        config.validate()?;
        info!("Initialized strategy engine with strategy: {}", config.strategy);

        Ok(Self {
            coordinator,
            config,
            executions: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    fn executions(&self) -> MutexGuard<'_, HashMap<String, AbortHandle>> {
        self.executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs every job to a terminal result with the configured strategy
    ///
    /// Per-job failures and timeouts become failed results; only invalid
    /// configuration is returned as an error.
    pub async fn execute(
        &self,
        jobs: Vec<Job>,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<ExecutionResult> {
        self.config.validate()?;

        let started = Instant::now();
        let total = jobs.len();
        let strategy = self.resolve_strategy().await;

        info!(
            "Starting execution of {} jobs using {} strategy",
            total, strategy
        );

        let progress = ProgressTracker::new(progress, total);
        let collected = match strategy {
            ExecutionStrategy::Sequential => self.run_sequential(jobs, &progress).await,
            ExecutionStrategy::BatchedParallel => self.run_batched(jobs, &progress).await,
            ExecutionStrategy::BoundedParallel => self.run_bounded(jobs, &progress).await,
            ExecutionStrategy::PriorityTiered => self.run_tiered(jobs, &progress).await,
            ExecutionStrategy::BacklogAdaptive => {
                return Err(RelayError::Configuration(
                    "adaptive strategy did not resolve".to_string(),
                ));
            }
        };

        if !collected.timed_out.is_empty() {
            warn!(
                "{} job(s) timed out after {}s: {}",
                collected.timed_out.len(),
                self.config.timeout_seconds,
                collected.timed_out.join(", ")
            );
        }

        let result = ExecutionResult::from_results(
            total,
            strategy,
            collected.results,
            collected.timed_out,
            started.elapsed(),
        );

        info!(
            "Execution completed: {}/{} jobs successful, throughput: {:.2} jobs/sec, error rate: {:.1}%",
            result.completed, total, result.throughput_per_second, result.error_rate_percent
        );

        Ok(result)
    }

    /// Replaces the adaptive strategy with a concrete one
    async fn resolve_strategy(&self) -> ExecutionStrategy {
        if self.config.strategy != ExecutionStrategy::BacklogAdaptive {
            return self.config.strategy;
        }

        match self.coordinator.get_queue_stats().await {
            Ok(stats) => {
                let chosen = select_for_backlog(&stats);
                info!(
                    "Queue has {} available, {} in flight; using {} execution",
                    stats.available, stats.in_flight, chosen
                );
                chosen
            }
            Err(e) => {
                warn!(
                    "Could not read queue stats ({:#}), using {} execution",
                    e,
                    ExecutionStrategy::BatchedParallel
                );
                ExecutionStrategy::BatchedParallel
            }
        }
    }

    /// Waits for a job's terminal result using the engine's poll interval
    pub async fn wait_for_completion(&self, job_id: &str, timeout: Duration) -> Result<JobResult> {
        self.coordinator
            .wait_for_completion(job_id, timeout, self.config.poll_interval)
            .await
    }

    // =============================================================================
    // Tracked executions
    // =============================================================================

    /// Starts `execute` in the background and tracks it under a fresh id
    pub fn spawn_execution(
        &self,
        jobs: Vec<Job>,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> (String, JoinHandle<Result<ExecutionResult>>) {
        let execution_id = Uuid::new_v4().to_string();
        let (registered_tx, registered_rx) = oneshot::channel::<()>();

        let engine = self.clone();
        let id = execution_id.clone();
        let handle = tokio::spawn(async move {
            // Start only once the abort handle is registered
            let _ = registered_rx.await;
            let result = engine.execute(jobs, progress).await;
            engine.executions().remove(&id);
            result
        });

        self.executions()
            .insert(execution_id.clone(), handle.abort_handle());
        let _ = registered_tx.send(());

        info!("Started execution {}", execution_id);
        (execution_id, handle)
    }

    /// Cancels a tracked execution
    ///
    /// Messages already sent are not retracted; their jobs still complete or
    /// return to the queue when their lease expires.
    pub fn cancel_execution(&self, execution_id: &str) -> bool {
        match self.executions().remove(execution_id) {
            Some(handle) => {
                handle.abort();
                info!("Cancelled execution {}", execution_id);
                true
            }
            None => false,
        }
    }

    pub fn get_execution_stats(&self) -> ExecutionStats {
        ExecutionStats {
            active_executions: self.executions().len(),
            strategy: self.config.strategy,
            max_workers: self.config.max_workers,
            batch_size: self.config.batch_size,
            timeout_seconds: self.config.timeout_seconds,
        }
    }
}
