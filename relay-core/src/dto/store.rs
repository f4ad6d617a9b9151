//! Object store DTOs
//!
//! Results are stored as JSON envelopes under date-partitioned keys:
//! `<namespace>/<yyyy>/<mm>/<dd>/<job_id>.json`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::job::{Job, JobSpec};
use crate::domain::result::JobResult;

/// Namespace for test generation results
pub const TEST_RESULTS_NAMESPACE: &str = "test-results";

/// Namespace for error fix results
pub const ERROR_FIXES_NAMESPACE: &str = "error-fixes";

/// Content type of stored result envelopes
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Version stamped into every stored envelope
pub const COORDINATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User metadata attached to a stored object
pub type ObjectMetadata = BTreeMap<String, String>;

/// Namespace a job's results are stored under
pub fn namespace_for(job: &Job) -> &'static str {
    match job.spec {
        JobSpec::TestGeneration(_) => TEST_RESULTS_NAMESPACE,
        JobSpec::ErrorFix(_) => ERROR_FIXES_NAMESPACE,
    }
}

/// Builds the date-partitioned key for a result
pub fn result_key(namespace: &str, date: NaiveDate, job_id: &str) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/{}.json",
        namespace,
        date.year(),
        date.month(),
        date.day(),
        job_id
    )
}

/// Stored representation of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub result: JobResult,
    pub metadata: StoredMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub stored_at: DateTime<Utc>,
    pub coordinator_version: String,
    /// Error type label for fix results, used when aggregating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl StoredResult {
    pub fn new(result: JobResult, error_type: Option<String>) -> Self {
        Self {
            result,
            metadata: StoredMetadata {
                stored_at: Utc::now(),
                coordinator_version: COORDINATOR_VERSION.to_string(),
                error_type,
            },
        }
    }

    /// Object metadata sent alongside the body
    pub fn object_metadata(&self) -> ObjectMetadata {
        let mut metadata = ObjectMetadata::new();
        metadata.insert("job-id".to_string(), self.result.job_id.clone());
        metadata.insert("success".to_string(), self.result.success.to_string());
        metadata.insert(
            "tests-generated".to_string(),
            self.result.tests_generated().to_string(),
        );
        metadata
    }
}
