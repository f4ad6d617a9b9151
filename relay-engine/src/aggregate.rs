//! Aggregation of stored error fix results

use chrono::NaiveDate;
use relay_core::dto::store::{ERROR_FIXES_NAMESPACE, StoredResult};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::coordinator::ResultArchive;

/// Label used when a stored result carries no error type
const UNKNOWN_ERROR_TYPE: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeStats {
    pub total: usize,
    pub successful: usize,
}

/// Summary over a set of error fix jobs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    /// Number of requested job ids, found or not
    pub total_jobs: usize,
    pub successful_fixes: usize,
    /// Requested jobs without a successful stored result
    pub failed_fixes: usize,
    pub success_rate: f64,
    pub average_confidence: f64,
    pub average_execution_time_ms: f64,
    pub error_type_breakdown: BTreeMap<String, TypeStats>,
    pub results: Vec<StoredResult>,
}

pub struct ErrorAggregator {
    archive: ResultArchive,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ErrorAggregator {
    pub fn new(archive: ResultArchive) -> Self {
        Self { archive }
    }

    /// Reads the results stored on `date` for each job and summarizes them
    ///
    /// Missing or unreadable results are logged and count as failed fixes.
    pub async fn aggregate_results(&self, job_ids: &[String], date: NaiveDate) -> AggregateReport {
        let mut results = Vec::new();
        for job_id in job_ids {
            match self.archive.load(ERROR_FIXES_NAMESPACE, date, job_id).await {
                Ok(Some(stored)) => results.push(stored),
                Ok(None) => warn!("No stored result for job {} on {}", job_id, date),
                Err(e) => warn!("Could not retrieve result for job {}: {:#}", job_id, e),
            }
        }

        summarize(job_ids.len(), results)
    }
}

fn summarize(total_jobs: usize, results: Vec<StoredResult>) -> AggregateReport {
    let successful_fixes = results.iter().filter(|r| r.result.success).count();

    let (average_confidence, average_execution_time_ms) = if results.is_empty() {
        (0.0, 0.0)
    } else {
        let n = results.len() as f64;
        (
            results.iter().map(|r| r.result.metric()).sum::<f64>() / n,
            results
                .iter()
                .map(|r| r.result.execution_time_ms as f64)
                .sum::<f64>()
                / n,
        )
    };

    let mut error_type_breakdown: BTreeMap<String, TypeStats> = BTreeMap::new();
    for stored in &results {
        let label = stored
            .metadata
            .error_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_ERROR_TYPE.to_string());
        let stats = error_type_breakdown.entry(label).or_default();
        stats.total += 1;
        if stored.result.success {
            stats.successful += 1;
        }
    }

    let success_rate = if total_jobs > 0 {
        successful_fixes as f64 / total_jobs as f64 * 100.0
    } else {
        0.0
    };

    AggregateReport {
        total_jobs,
        successful_fixes,
        failed_fixes: total_jobs - successful_fixes,
        success_rate,
        average_confidence: round2(average_confidence),
        average_execution_time_ms: round2(average_execution_time_ms),
        error_type_breakdown,
        results,
    }
}
