//! Error taxonomy for the coordination engine

use relay_client::ClientError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors raised while distributing and executing jobs
///
/// Each variant maps to a distinct handling policy: transport errors are
/// retried at the loop level, serialization errors are terminal for the job,
/// inference errors consume the job's retry budget, timeouts are surfaced to
/// the caller of `execute` and configuration errors abort before any work.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Queue, store or sink unreachable or rejected the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// Message body or stored object could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The inference backend failed for this job
    #[error("Inference error: {0}")]
    Inference(String),

    /// A completion wait expired
    #[error("Job {job_id} did not complete within {} seconds", .timeout.as_secs())]
    Timeout { job_id: String, timeout: Duration },

    /// Invalid strategy, type or setting
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RelayError {
    pub fn timeout(job_id: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            job_id: job_id.into(),
            timeout,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ClientError> for RelayError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::ParseError(message) => Self::Serialization(message),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
