//! Queue DTOs
//!
//! Messages, batch entries and attribute snapshots exchanged with the queue
//! service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::job::{Job, JobSpec};

/// Largest number of entries a single batch send may carry
pub const MAX_BATCH_SIZE: usize = 10;

/// Routing attributes attached to a queue message
pub type MessageAttributes = BTreeMap<String, String>;

/// Builds the routing attributes for a job
///
/// Test jobs are routed by priority, language and test kind; error fix jobs by
/// error type, severity, priority score and suggested backend.
pub fn routing_attributes(job: &Job) -> MessageAttributes {
    let mut attributes = MessageAttributes::new();

    match &job.spec {
        JobSpec::TestGeneration(spec) => {
            attributes.insert("Priority".to_string(), job.priority.to_string());
            attributes.insert("Language".to_string(), spec.language.clone());
            attributes.insert("TestType".to_string(), spec.kind.to_string());
        }
        JobSpec::ErrorFix(fix) => {
            attributes.insert("ErrorType".to_string(), fix.error_type().to_string());
            attributes.insert(
                "Severity".to_string(),
                fix.severity().ordinal().to_string(),
            );
            attributes.insert("Priority".to_string(), fix.priority_score().to_string());
            attributes.insert("Model".to_string(), fix.suggested_backend().to_string());
        }
    }

    attributes
}

/// Message to send to the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub body: String,
    pub attributes: MessageAttributes,
}

/// One member of a batch send, keyed by the job id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub id: String,
    pub body: String,
    pub attributes: MessageAttributes,
}

/// Request body of a batch send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendBatchRequest {
    pub entries: Vec<BatchEntry>,
}

/// Per-entry outcome of a batch send
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSendOutcome {
    pub successful: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSuccess {
    /// Entry id (the job id)
    pub id: String,
    /// Delivery id assigned by the queue
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub id: String,
    pub message: String,
}

/// Response to a single send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
}

/// Long-poll receive parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveRequest {
    pub max_messages: usize,
    pub wait_seconds: u64,
    /// Lease duration; the queue's default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_timeout_seconds: Option<u64>,
}

impl ReceiveRequest {
    pub fn new(max_messages: usize, wait_seconds: u64) -> Self {
        Self {
            max_messages: max_messages.clamp(1, MAX_BATCH_SIZE),
            wait_seconds,
            visibility_timeout_seconds: None,
        }
    }
}

/// A leased delivery
///
/// The message stays invisible to other consumers until it is deleted with
/// `lease_token` or the lease expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub body: String,
    pub attributes: MessageAttributes,
    pub lease_token: String,
}

/// Approximate message counts reported by the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueAttributes {
    pub approx_available: u64,
    pub approx_in_flight: u64,
    pub approx_delayed: u64,
}

/// Queue counts combined with the coordinator's own tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub available: u64,
    pub in_flight: u64,
    pub delayed: u64,
    pub active_count: usize,
    pub completed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::TestKind;

    #[test]
    fn test_routing_attributes_for_test_job() {
        let job = Job::test_generation("j", "code", "typescript", TestKind::Mutation)
            .with_priority(2);
        let attributes = routing_attributes(&job);

        assert_eq!(attributes.get("Priority").map(String::as_str), Some("2"));
        assert_eq!(
            attributes.get("Language").map(String::as_str),
            Some("typescript")
        );
        assert_eq!(
            attributes.get("TestType").map(String::as_str),
            Some("mutation")
        );
    }

    #[test]
    fn test_receive_request_clamps_batch() {
        assert_eq!(ReceiveRequest::new(0, 20).max_messages, 1);
        assert_eq!(ReceiveRequest::new(50, 20).max_messages, MAX_BATCH_SIZE);
    }
}
