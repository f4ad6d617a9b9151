//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error_fix::{ErrorFix, Severity};

/// Retry budget given to jobs unless overridden
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Highest scheduling priority (tier 1)
pub const HIGHEST_PRIORITY: u8 = 1;

/// Unit of work distributed through the queue
///
/// The envelope fields (priority, retry budget, timestamps) are shared by every
/// kind of work; the `spec` carries what actually has to be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub priority: u8,
    retry_count: u32,
    max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub spec: JobSpec,
}

/// What a job asks the inference backend to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSpec {
    TestGeneration(TestGeneration),
    ErrorFix(ErrorFix),
}

/// Request to generate tests for a piece of code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestGeneration {
    /// Source code or diff text
    pub payload: String,
    pub language: String,
    pub kind: TestKind,
}

/// Kind of tests to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Unit,
    Integration,
    Mutation,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Unit => "unit",
            TestKind::Integration => "integration",
            TestKind::Mutation => "mutation",
        }
    }
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unit" => Ok(TestKind::Unit),
            "integration" => Ok(TestKind::Integration),
            "mutation" => Ok(TestKind::Mutation),
            other => Err(format!("unknown test kind: {}", other)),
        }
    }
}

/// Outcome of recording a failed attempt against the retry budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget remains; the job should be resubmitted
    Requeue,
    /// Budget spent; the failure is terminal
    Exhausted,
}

impl Job {
    /// Creates a test generation job with default priority and retry budget
    pub fn test_generation(
        id: impl Into<String>,
        payload: impl Into<String>,
        language: impl Into<String>,
        kind: TestKind,
    ) -> Self {
        Self {
            id: id.into(),
            priority: HIGHEST_PRIORITY,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: Utc::now(),
            spec: JobSpec::TestGeneration(TestGeneration {
                payload: payload.into(),
                language: language.into(),
                kind,
            }),
        }
    }

    /// Creates an error fix job from a classified error
    ///
    /// The priority tier follows the severity: critical errors land in tier 1,
    /// high in tier 2, everything else in tier 3.
    pub fn error_fix(id: impl Into<String>, fix: ErrorFix) -> Self {
        let priority = match fix.severity() {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium | Severity::Low => 3,
        };

        Self {
            id: id.into(),
            priority,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: Utc::now(),
            spec: JobSpec::ErrorFix(fix),
        }
    }

    /// Sets the scheduling priority (1 = highest, 0 is clamped to 1)
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.max(HIGHEST_PRIORITY);
        self
    }

    /// Sets the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self.retry_count = self.retry_count.min(max_retries);
        self
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Records a failed attempt
    ///
    /// `retry_count` only grows and stops at `max_retries`. The attempt that
    /// would bring it to `max_retries` is the terminal one.
    pub fn record_failure(&mut self) -> RetryDecision {
        if self.retry_count.saturating_add(1) < self.max_retries {
            self.retry_count += 1;
            RetryDecision::Requeue
        } else {
            self.retry_count = self.max_retries;
            RetryDecision::Exhausted
        }
    }

    /// Language of the code under work, if the job carries one
    pub fn language(&self) -> Option<&str> {
        match &self.spec {
            JobSpec::TestGeneration(spec) => Some(&spec.language),
            JobSpec::ErrorFix(_) => None,
        }
    }

    /// Short human-readable description used in logs
    pub fn describe(&self) -> String {
        match &self.spec {
            JobSpec::TestGeneration(spec) => format!("{} tests ({})", spec.kind, spec.language),
            JobSpec::ErrorFix(fix) => format!(
                "{} fix (severity {})",
                fix.error_type(),
                fix.severity().ordinal()
            ),
        }
    }

    /// Serializes the job into a queue message body
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a queue message body
    ///
    /// A body claiming more retries than its budget allows is clamped so the
    /// retry invariant holds for everything that enters the system.
    pub fn decode(body: &str) -> serde_json::Result<Self> {
        let mut job: Job = serde_json::from_str(body)?;
        job.retry_count = job.retry_count.min(job.max_retries);
        job.priority = job.priority.max(HIGHEST_PRIORITY);
        Ok(job)
    }
}
