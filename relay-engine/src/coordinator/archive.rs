//! Result persistence
//!
//! Wraps the object store with the envelope format and the date-partitioned
//! key convention used for job results.

use chrono::NaiveDate;
use relay_core::domain::job::{Job, JobSpec};
use relay_core::domain::result::JobResult;
use relay_core::dto::store::{
    ERROR_FIXES_NAMESPACE, JSON_CONTENT_TYPE, StoredResult, TEST_RESULTS_NAMESPACE,
    namespace_for, result_key,
};
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::repository::ObjectStore;

/// Reads and writes stored result envelopes
#[derive(Clone)]
pub struct ResultArchive {
    store: Arc<dyn ObjectStore>,
}

impl ResultArchive {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Persists a job's result under its namespace, returning the key
    pub async fn store(&self, job: &Job, result: &JobResult) -> Result<String> {
        let error_type = match &job.spec {
            JobSpec::ErrorFix(fix) => Some(fix.error_type().to_string()),
            JobSpec::TestGeneration(_) => None,
        };
        self.store_in(namespace_for(job), result, error_type).await
    }

    /// Persists a result when only its namespace is known
    pub async fn store_in(
        &self,
        namespace: &str,
        result: &JobResult,
        error_type: Option<String>,
    ) -> Result<String> {
        let key = result_key(namespace, result.completed_at.date_naive(), &result.job_id);
        let envelope = StoredResult::new(result.clone(), error_type);
        let body = serde_json::to_string_pretty(&envelope)?;

        self.store
            .put(&key, body, JSON_CONTENT_TYPE, envelope.object_metadata())
            .await?;

        info!("Stored result for job {} at {}", result.job_id, key);
        Ok(key)
    }

    /// Loads a stored envelope, `None` when nothing was stored under the key
    pub async fn load(
        &self,
        namespace: &str,
        date: NaiveDate,
        job_id: &str,
    ) -> Result<Option<StoredResult>> {
        let key = result_key(namespace, date, job_id);

        match self.store.get(&key).await? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Looks a job up in every namespace
    pub async fn find(&self, date: NaiveDate, job_id: &str) -> Result<Option<StoredResult>> {
        for namespace in [TEST_RESULTS_NAMESPACE, ERROR_FIXES_NAMESPACE] {
            if let Some(stored) = self.load(namespace, date, job_id).await? {
                return Ok(Some(stored));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryObjectStore;
    use relay_core::domain::job::TestKind;
    use relay_core::domain::result::{Outcome, TestOutcome};

    #[tokio::test]
    async fn test_store_writes_envelope_and_metadata() {
        let store = Arc::new(InMemoryObjectStore::new());
        let archive = ResultArchive::new(store.clone());
        let job = Job::test_generation("job-1", "code", "typescript", TestKind::Unit);
        let result = JobResult::succeeded(
            "job-1",
            Outcome::Tests(TestOutcome {
                tests_generated: 2,
                tests_passed: 2,
                tests_failed: 0,
                coverage_percentage: 85.5,
                generated_tests: Some("it('works', () => {})".to_string()),
            }),
        );

        let key = archive.store(&job, &result).await.unwrap();
        assert!(key.starts_with("test-results/"));
        assert!(key.ends_with("/job-1.json"));

        let object = store.object(&key).unwrap();
        assert_eq!(object.content_type, "application/json");
        assert_eq!(object.metadata.get("tests-generated").map(String::as_str), Some("2"));

        let found = archive
            .find(result.completed_at.date_naive(), "job-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.result, result);
    }

    #[tokio::test]
    async fn test_load_missing() {
        let archive = ResultArchive::new(Arc::new(InMemoryObjectStore::new()));
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(archive.find(date, "nope").await.unwrap().is_none());
    }
}
