//! Job status views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::Job;
use crate::domain::result::JobResult;

/// Where a job stands from the coordinator's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatusView {
    /// A terminal result was recorded
    Completed { result: JobResult },
    /// Submitted and not yet terminal
    Processing {
        job: Job,
        submitted_at: DateTime<Utc>,
    },
    /// Unknown to this coordinator
    NotFound { message: String },
}

impl JobStatusView {
    pub fn not_found(job_id: &str) -> Self {
        JobStatusView::NotFound {
            message: format!("Job {} not found", job_id),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobStatusView::Completed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatusView::Completed { .. } => "completed",
            JobStatusView::Processing { .. } => "processing",
            JobStatusView::NotFound { .. } => "not_found",
        }
    }
}
