mod common;

use async_trait::async_trait;
use common::{FixedStatsQueue, Harness, StubBackend, test_jobs};
use relay_core::domain::execution::ExecutionStrategy;
use relay_core::domain::job::{Job, TestKind};
use relay_core::domain::result::JobResult;
use relay_core::dto::store::TEST_RESULTS_NAMESPACE;
use relay_engine::repository::InMemoryQueue;
use relay_engine::{ExecutionConfig, ProgressSink, StrategyEngine};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn config(strategy: ExecutionStrategy) -> ExecutionConfig {
    ExecutionConfig::new(strategy)
        .with_timeout(10)
        .with_poll_interval(Duration::from_millis(10))
}

fn ids(results: &[JobResult]) -> Vec<String> {
    results.iter().map(|r| r.job_id.clone()).collect()
}

#[tokio::test]
async fn test_sequential_keeps_submission_order() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(5)));
    let consumer = h.start_consumer(4);
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::Sequential)).unwrap();

    let jobs = test_jobs("seq", 4);
    let expected: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
    let result = engine.execute(jobs, None).await.unwrap();

    assert_eq!(result.strategy, ExecutionStrategy::Sequential);
    assert_eq!(result.completed, 4);
    assert_eq!(result.failed, 0);
    assert_eq!(ids(&result.results), expected);
    assert_eq!(h.backend.peak(), 1);
    consumer.stop().await;
}

#[tokio::test]
async fn test_bounded_never_exceeds_max_workers() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(30)));
    let consumer = h.start_consumer(8);
    let engine = StrategyEngine::new(
        h.coordinator.clone(),
        config(ExecutionStrategy::BoundedParallel).with_max_workers(2),
    )
    .unwrap();

    let result = engine.execute(test_jobs("bounded", 5), None).await.unwrap();

    assert_eq!(result.completed, 5);
    assert_eq!(h.backend.calls(), 5);
    assert!(h.backend.peak() <= 2, "peak was {}", h.backend.peak());
    consumer.stop().await;
}

#[tokio::test]
async fn test_batched_runs_every_window() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(5)));
    let consumer = h.start_consumer(10);
    let engine = StrategyEngine::new(
        h.coordinator.clone(),
        config(ExecutionStrategy::BatchedParallel).with_batch_size(3),
    )
    .unwrap();

    let jobs = test_jobs("batched", 7);
    let expected: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
    let result = engine.execute(jobs, None).await.unwrap();

    assert_eq!(result.total, 7);
    assert_eq!(ids(&result.results), expected);
    assert_eq!(result.completed, 7);
    assert_eq!(result.error_rate_percent, 0.0);
    assert!(result.timed_out.is_empty());
    consumer.stop().await;
}

#[tokio::test]
async fn test_tiered_runs_tiers_in_order() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(5)));
    let consumer = h.start_consumer(4);
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::PriorityTiered))
            .unwrap();

    let job = |id: &str, priority: u8| {
        Job::test_generation(id, "code", "rust", TestKind::Unit).with_priority(priority)
    };
    let jobs = vec![job("low", 3), job("urgent-a", 1), job("normal", 2), job("urgent-b", 1)];

    let result = engine.execute(jobs, None).await.unwrap();

    assert_eq!(result.strategy, ExecutionStrategy::PriorityTiered);
    assert_eq!(ids(&result.results), vec!["urgent-a", "urgent-b", "normal", "low"]);
    consumer.stop().await;
}

#[tokio::test]
async fn test_adaptive_picks_sequential_under_backlog() {
    let queue = Arc::new(InMemoryQueue::new());
    let service = Arc::new(FixedStatsQueue::new(queue.clone(), 60, 0));
    let h = Harness::with_queue(queue, service, StubBackend::new(Duration::from_millis(5)));
    let consumer = h.start_consumer(4);
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::BacklogAdaptive))
            .unwrap();

    let result = engine.execute(test_jobs("adaptive", 3), None).await.unwrap();

    assert_eq!(result.strategy, ExecutionStrategy::Sequential);
    assert_eq!(result.completed, 3);
    consumer.stop().await;
}

#[tokio::test]
async fn test_adaptive_picks_bounded_when_idle() {
    let queue = Arc::new(InMemoryQueue::new());
    let service = Arc::new(FixedStatsQueue::new(queue.clone(), 5, 2));
    let h = Harness::with_queue(queue, service, StubBackend::new(Duration::from_millis(5)));
    let consumer = h.start_consumer(4);
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::BacklogAdaptive))
            .unwrap();

    let result = engine.execute(test_jobs("idle", 2), None).await.unwrap();

    assert_eq!(result.strategy, ExecutionStrategy::BoundedParallel);
    consumer.stop().await;
}

#[tokio::test]
async fn test_failed_jobs_do_not_abort_execution() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(5)).failing("doomed"));
    let consumer = h.start_consumer(4);
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::BatchedParallel))
            .unwrap();

    let mut jobs = test_jobs("fine", 2);
    jobs.push(
        Job::test_generation("doomed-1", "code", "rust", TestKind::Unit).with_max_retries(1),
    );

    let result = engine.execute(jobs, None).await.unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.completed, 2);
    assert_eq!(result.failed, 1);
    let doomed = result.results.iter().find(|r| r.job_id == "doomed-1").unwrap();
    assert!(!doomed.success);
    assert!(doomed.error_message.is_some());
    consumer.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_wait_timeout_becomes_failed_result() {
    let h = Harness::new(StubBackend::new(Duration::from_secs(3600)));
    let consumer = h.start_consumer(4);
    let engine = StrategyEngine::new(
        h.coordinator.clone(),
        ExecutionConfig::new(ExecutionStrategy::Sequential).with_timeout(2),
    )
    .unwrap();

    let result = engine.execute(test_jobs("slow", 1), None).await.unwrap();

    assert_eq!(result.failed, 1);
    assert_eq!(result.timed_out, vec!["slow-0".to_string()]);
    assert!(!result.results[0].success);
    drop(consumer);
}

#[tokio::test]
async fn test_persisted_result_reads_back_equal() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(5)));
    let consumer = h.start_consumer(2);
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::Sequential)).unwrap();

    let result = engine.execute(test_jobs("persist", 1), None).await.unwrap();
    let original = &result.results[0];

    let stored = h
        .coordinator
        .archive()
        .load(
            TEST_RESULTS_NAMESPACE,
            original.completed_at.date_naive(),
            &original.job_id,
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(&stored.result, original);
    assert_eq!(h.store.keys().len(), 1);
    consumer.stop().await;
}

struct RecordingSink {
    seen: Mutex<Vec<(usize, usize)>>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn on_progress(&self, completed: usize, total: usize, _last: &JobResult) {
        self.seen.lock().unwrap().push((completed, total));
    }
}

#[tokio::test]
async fn test_progress_reports_every_job() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(5)));
    let consumer = h.start_consumer(4);
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::PriorityTiered))
            .unwrap();
    let sink = Arc::new(RecordingSink {
        seen: Mutex::new(Vec::new()),
    });

    let mut jobs = test_jobs("tier-one", 2);
    jobs.extend(
        test_jobs("tier-three", 2)
            .into_iter()
            .map(|job| job.with_priority(3)),
    );
    engine.execute(jobs, Some(sink.clone())).await.unwrap();

    assert_eq!(
        *sink.seen.lock().unwrap(),
        vec![(1, 4), (2, 4), (3, 4), (4, 4)]
    );
    consumer.stop().await;
}

#[tokio::test]
async fn test_spawned_execution_can_be_cancelled() {
    let h = Harness::new(StubBackend::new(Duration::from_millis(5)));
    let engine =
        StrategyEngine::new(h.coordinator.clone(), config(ExecutionStrategy::Sequential)).unwrap();

    // No consumer is running, so the execution stays pending
    let (execution_id, handle) = engine.spawn_execution(test_jobs("pending", 1), None);
    assert_eq!(engine.get_execution_stats().active_executions, 1);

    assert!(engine.cancel_execution(&execution_id));
    assert!(!engine.cancel_execution(&execution_id));
    assert_eq!(engine.get_execution_stats().active_executions, 0);
    assert!(handle.await.unwrap_err().is_cancelled());
}

#[test]
fn test_invalid_config_is_rejected() {
    let h = Harness::new(StubBackend::new(Duration::ZERO));
    assert!(
        StrategyEngine::new(
            h.coordinator.clone(),
            ExecutionConfig::default().with_max_workers(0)
        )
        .is_err()
    );
}
