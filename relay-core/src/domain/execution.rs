//! Execution domain types
//!
//! Types describing how a set of jobs is scheduled and the aggregate outcome
//! of running it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::result::JobResult;

/// Concurrency shape used to run a set of jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One job at a time, in submission order
    Sequential,
    /// Fixed-size windows, each fully resolved before the next; results
    /// come back in input order within each window
    BatchedParallel,
    /// Global worker limit, results in completion order
    BoundedParallel,
    /// Sequential / batched / bounded per priority tier
    PriorityTiered,
    /// Picks a shape from live queue depth
    BacklogAdaptive,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStrategy::Sequential => "sequential",
            ExecutionStrategy::BatchedParallel => "batched",
            ExecutionStrategy::BoundedParallel => "bounded",
            ExecutionStrategy::PriorityTiered => "tiered",
            ExecutionStrategy::BacklogAdaptive => "adaptive",
        }
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "sequential" => Ok(ExecutionStrategy::Sequential),
            "batched" | "batched_parallel" | "parallel_files" => {
                Ok(ExecutionStrategy::BatchedParallel)
            }
            "bounded" | "bounded_parallel" | "parallel_functions" => {
                Ok(ExecutionStrategy::BoundedParallel)
            }
            "tiered" | "priority_tiered" | "hybrid" => Ok(ExecutionStrategy::PriorityTiered),
            "adaptive" | "backlog_adaptive" | "load_balanced" => {
                Ok(ExecutionStrategy::BacklogAdaptive)
            }
            other => Err(format!("unknown execution strategy: {}", other)),
        }
    }
}

/// Aggregate outcome of running a set of jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub execution_time_ms: u64,
    pub average_job_time_ms: f64,
    pub throughput_per_second: f64,
    pub error_rate_percent: f64,
    /// Strategy that actually ran (the adaptive choice, not `BacklogAdaptive`)
    pub strategy: ExecutionStrategy,
    /// Jobs whose completion wait expired; they also appear as failed results
    pub timed_out: Vec<String>,
    pub results: Vec<JobResult>,
}

impl ExecutionResult {
    /// Computes the aggregate metrics from the per-job results
    pub fn from_results(
        total: usize,
        strategy: ExecutionStrategy,
        results: Vec<JobResult>,
        timed_out: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        let completed = results.iter().filter(|r| r.success).count();
        let failed = total.saturating_sub(completed);

        let average_job_time_ms = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.execution_time_ms as f64).sum::<f64>() / results.len() as f64
        };

        let seconds = elapsed.as_secs_f64();
        let throughput_per_second = if seconds > 0.0 {
            results.len() as f64 / seconds
        } else {
            0.0
        };

        let error_rate_percent = if total > 0 {
            failed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            completed,
            failed,
            execution_time_ms: elapsed.as_millis() as u64,
            average_job_time_ms,
            throughput_per_second,
            error_rate_percent,
            strategy,
            timed_out,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::{Outcome, TestOutcome};

    #[test]
    fn test_strategy_parsing_accepts_aliases() {
        assert_eq!(
            "hybrid".parse::<ExecutionStrategy>(),
            Ok(ExecutionStrategy::PriorityTiered)
        );
        assert_eq!(
            "parallel-files".parse::<ExecutionStrategy>(),
            Ok(ExecutionStrategy::BatchedParallel)
        );
        assert_eq!(
            "Adaptive".parse::<ExecutionStrategy>(),
            Ok(ExecutionStrategy::BacklogAdaptive)
        );
        assert!("round_robin".parse::<ExecutionStrategy>().is_err());
    }

    #[test]
    fn test_metrics_from_results() {
        let results = vec![
            JobResult::succeeded("a", Outcome::Tests(TestOutcome::default()))
                .with_execution_time(100),
            JobResult::failed("b", "boom").with_execution_time(300),
        ];

        let summary = ExecutionResult::from_results(
            2,
            ExecutionStrategy::Sequential,
            results,
            vec![],
            Duration::from_secs(2),
        );

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.average_job_time_ms, 200.0);
        assert_eq!(summary.throughput_per_second, 1.0);
        assert_eq!(summary.error_rate_percent, 50.0);
        assert_eq!(summary.execution_time_ms, 2000);
    }

    #[test]
    fn test_metrics_for_empty_run() {
        let summary = ExecutionResult::from_results(
            0,
            ExecutionStrategy::BoundedParallel,
            vec![],
            vec![],
            Duration::ZERO,
        );

        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_job_time_ms, 0.0);
        assert_eq!(summary.throughput_per_second, 0.0);
        assert_eq!(summary.error_rate_percent, 0.0);
    }
}
