//! Active and completed job tracking
//!
//! Single owner of the coordinator's job maps. Transitions happen only at
//! submit, lease-complete and lease-fail; every completion wakes the tasks
//! waiting in `wait_for_completion`.

use chrono::{DateTime, Utc};
use relay_core::domain::job::Job;
use relay_core::domain::result::JobResult;
use relay_core::dto::status::JobStatusView;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

#[derive(Debug)]
struct ActiveJob {
    job: Job,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct TrackerState {
    active: HashMap<String, ActiveJob>,
    completed: HashMap<String, JobResult>,
}

#[derive(Debug, Default)]
pub(crate) struct JobTracker {
    state: Mutex<TrackerState>,
    completions: Notify,
}

impl JobTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a job as submitted
    ///
    /// A fresh submission supersedes any earlier terminal result for the id.
    pub(crate) fn begin(&self, job: &Job) {
        let mut state = self.state();
        state.completed.remove(&job.id);
        state.active.insert(
            job.id.clone(),
            ActiveJob {
                job: job.clone(),
                submitted_at: Utc::now(),
            },
        );
    }

    /// Forgets a submission the queue rejected
    pub(crate) fn abandon(&self, job_id: &str) {
        self.state().active.remove(job_id);
    }

    /// Updates the tracked copy of a requeued job
    pub(crate) fn requeue(&self, job: &Job) {
        if let Some(active) = self.state().active.get_mut(&job.id) {
            active.job = job.clone();
        }
    }

    /// Records a terminal result and wakes waiters
    pub(crate) fn complete(&self, result: JobResult) {
        {
            let mut state = self.state();
            state.active.remove(&result.job_id);
            state.completed.insert(result.job_id.clone(), result);
        }
        self.completions.notify_waiters();
    }

    pub(crate) fn status(&self, job_id: &str) -> JobStatusView {
        let state = self.state();

        if let Some(result) = state.completed.get(job_id) {
            return JobStatusView::Completed {
                result: result.clone(),
            };
        }

        match state.active.get(job_id) {
            Some(active) => JobStatusView::Processing {
                job: active.job.clone(),
                submitted_at: active.submitted_at,
            },
            None => JobStatusView::not_found(job_id),
        }
    }

    /// (active, completed) counts
    pub(crate) fn counts(&self) -> (usize, usize) {
        let state = self.state();
        (state.active.len(), state.completed.len())
    }

    /// Future resolved by the next completion
    ///
    /// Registered on creation, so a completion between creating it and
    /// awaiting it is not lost.
    pub(crate) fn next_completion(&self) -> Notified<'_> {
        self.completions.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::domain::job::TestKind;

    fn job(id: &str) -> Job {
        Job::test_generation(id, "fn main() {}", "rust", TestKind::Unit)
    }

    #[test]
    fn test_lifecycle() {
        let tracker = JobTracker::new();
        assert_eq!(tracker.status("a").label(), "not_found");

        tracker.begin(&job("a"));
        assert_eq!(tracker.status("a").label(), "processing");
        assert_eq!(tracker.counts(), (1, 0));

        tracker.complete(JobResult::failed("a", "boom"));
        assert!(tracker.status("a").is_completed());
        assert_eq!(tracker.counts(), (0, 1));
    }

    #[test]
    fn test_resubmission_clears_previous_result() {
        let tracker = JobTracker::new();
        tracker.begin(&job("a"));
        tracker.complete(JobResult::failed("a", "boom"));

        tracker.begin(&job("a"));
        assert_eq!(tracker.status("a").label(), "processing");
    }

    #[test]
    fn test_abandon() {
        let tracker = JobTracker::new();
        tracker.begin(&job("a"));
        tracker.abandon("a");
        assert_eq!(tracker.counts(), (0, 0));
    }

    #[tokio::test]
    async fn test_completion_wakes_waiter() {
        let tracker = std::sync::Arc::new(JobTracker::new());
        let waiter = tracker.next_completion();

        let completer = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.complete(JobResult::failed("a", "x")) })
        };
        completer.await.unwrap();

        waiter.await;
        assert!(tracker.status("a").is_completed());
    }
}
