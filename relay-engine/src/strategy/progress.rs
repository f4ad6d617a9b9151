//! Progress reporting

use async_trait::async_trait;
use relay_core::domain::result::JobResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives a notification each time a job reaches a terminal result
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// `completed` counts every settled job so far, out of `total`
    async fn on_progress(&self, completed: usize, total: usize, last: &JobResult);
}

/// Counts settled jobs across every phase of one execution
pub(crate) struct ProgressTracker {
    sink: Option<Arc<dyn ProgressSink>>,
    total: usize,
    settled: AtomicUsize,
}

impl ProgressTracker {
    pub(crate) fn new(sink: Option<Arc<dyn ProgressSink>>, total: usize) -> Self {
        Self {
            sink,
            total,
            settled: AtomicUsize::new(0),
        }
    }

    pub(crate) async fn report(&self, result: &JobResult) {
        let settled = self.settled.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(sink) = &self.sink {
            sink.on_progress(settled, self.total, result).await;
        }
    }
}
