//! Error distribution
//!
//! Classifies raw error reports and submits one error fix job per report.

use relay_core::classifier::ErrorClassifier;
use relay_core::domain::job::Job;
use relay_core::dto::error_report::ErrorReport;
use relay_core::dto::metrics::ERROR_DISTRIBUTION_NAMESPACE;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::coordinator::JobCoordinator;
use crate::repository::{LogMetricsSink, MetricsSink, record_metric};

pub struct ErrorDistributor {
    coordinator: JobCoordinator,
    classifier: ErrorClassifier,
    metrics: Arc<dyn MetricsSink>,
}

impl ErrorDistributor {
    pub fn new(coordinator: JobCoordinator) -> Self {
        Self {
            coordinator,
            classifier: ErrorClassifier::new(),
            metrics: Arc::new(LogMetricsSink),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Classifies and submits every report, returning the submitted job ids
    ///
    /// A report that fails to submit is logged and skipped.
    pub async fn distribute_errors(&self, reports: &[ErrorReport]) -> Vec<String> {
        info!("Distributing {} errors for processing", reports.len());

        let mut job_ids = Vec::with_capacity(reports.len());
        for report in reports {
            let fix = self.classifier.assess(report.message.clone(), report.context());
            let job = Job::error_fix(format!("error-{}", Uuid::new_v4()), fix);

            match self.coordinator.submit(&job).await {
                Ok(_) => {
                    info!("Submitted error job {}: {}", job.id, job.describe());
                    job_ids.push(job.id);
                }
                Err(e) => error!("Failed to process error '{}': {:#}", report.message, e),
            }
        }

        record_metric(
            self.metrics.as_ref(),
            ERROR_DISTRIBUTION_NAMESPACE,
            "ErrorsDistributed",
            job_ids.len() as f64,
        )
        .await;

        job_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::repository::{InMemoryMetrics, InMemoryObjectStore, InMemoryQueue, QueueService};
    use crate::service::InferenceBackend;
    use async_trait::async_trait;
    use relay_core::domain::job::JobSpec;
    use relay_core::domain::result::{FixOutcome, Outcome};
    use std::time::Duration;

    struct NoopBackend;

    #[async_trait]
    impl InferenceBackend for NoopBackend {
        async fn infer(&self, _job: &Job) -> Result<Outcome> {
            Ok(Outcome::Fix(FixOutcome::default()))
        }
    }

    fn report(message: &str, file: &str) -> ErrorReport {
        serde_json::from_value(serde_json::json!({ "message": message, "file": file })).unwrap()
    }

    #[tokio::test]
    async fn test_distribute_classifies_and_submits() {
        let queue = Arc::new(InMemoryQueue::new());
        let metrics = Arc::new(InMemoryMetrics::new());
        let coordinator = JobCoordinator::new(
            queue.clone(),
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(NoopBackend),
        );
        let distributor = ErrorDistributor::new(coordinator).with_metrics(metrics.clone());

        let ids = distributor
            .distribute_errors(&[
                report("TS2345: Argument of type 'string' is not assignable", "src/app.ts"),
                report("Missing semicolon", "src/util.js"),
            ])
            .await;

        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| id.starts_with("error-")));
        assert_eq!(metrics.total("ErrorsDistributed"), 2.0);

        let received = queue.receive(10, Duration::ZERO).await.unwrap();
        let first = Job::decode(&received[0].body).unwrap();
        assert_eq!(first.priority, 1);
        assert!(matches!(first.spec, JobSpec::ErrorFix(_)));
    }
}
