//! Job result domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal (or per-attempt) outcome of a job
///
/// `error_message` is present exactly when `success` is false; use the
/// [`JobResult::succeeded`] and [`JobResult::failed`] constructors to keep it so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub outcome: Option<Outcome>,
    pub execution_time_ms: u64,
    pub error_message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Artifact produced by the inference backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Tests(TestOutcome),
    Fix(FixOutcome),
}

/// Generated tests and their measured quality
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub tests_generated: u32,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub coverage_percentage: f64,
    pub generated_tests: Option<String>,
}

/// Proposed fix for a classified error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixOutcome {
    pub fixed_code: Option<String>,
    pub explanation: Option<String>,
    pub confidence_score: f64,
    pub model_used: String,
}

impl JobResult {
    pub fn succeeded(job_id: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            job_id: job_id.into(),
            success: true,
            outcome: Some(outcome),
            execution_time_ms: 0,
            error_message: None,
            completed_at: Utc::now(),
        }
    }

    /// Failure with zeroed metrics
    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            success: false,
            outcome: None,
            execution_time_ms: 0,
            error_message: Some(error.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    /// Coverage percentage for tests, confidence score for fixes
    pub fn metric(&self) -> f64 {
        match &self.outcome {
            Some(Outcome::Tests(tests)) => tests.coverage_percentage,
            Some(Outcome::Fix(fix)) => fix.confidence_score,
            None => 0.0,
        }
    }

    pub fn tests_generated(&self) -> u32 {
        match &self.outcome {
            Some(Outcome::Tests(tests)) => tests.tests_generated,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_has_message_and_zeroed_metrics() {
        let result = JobResult::failed("job-1", "backend unavailable");
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("backend unavailable"));
        assert_eq!(result.metric(), 0.0);
        assert_eq!(result.execution_time_ms, 0);
    }

    #[test]
    fn test_metric_follows_outcome_kind() {
        let tests = JobResult::succeeded(
            "a",
            Outcome::Tests(TestOutcome {
                coverage_percentage: 85.5,
                ..Default::default()
            }),
        );
        let fix = JobResult::succeeded(
            "b",
            Outcome::Fix(FixOutcome {
                confidence_score: 0.75,
                ..Default::default()
            }),
        );

        assert!(tests.error_message.is_none());
        assert_eq!(tests.metric(), 85.5);
        assert_eq!(fix.metric(), 0.75);
    }
}
