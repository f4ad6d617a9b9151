//! Execute command handler

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use colored::*;
use relay_core::domain::execution::ExecutionResult;
use relay_core::domain::result::JobResult;
use relay_engine::config::Config;
use relay_engine::strategy::parse_strategy;
use relay_engine::{ExecutionConfig, ProgressSink, StrategyEngine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::JobSource;
use crate::config::build_coordinator;

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    #[command(flatten)]
    pub source: JobSource,

    /// sequential, batched, bounded, tiered or adaptive
    #[arg(long, short = 's', default_value = "adaptive")]
    pub strategy: String,

    /// Max jobs in flight for bounded execution
    #[arg(long, default_value_t = 4)]
    pub max_workers: usize,

    /// Window size for batched execution
    #[arg(long, default_value_t = 10)]
    pub batch_size: usize,

    /// Seconds to wait for each job
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Also consume the queue in this process
    #[arg(long)]
    pub consume: bool,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Prints one line per settled job
struct ProgressPrinter;

#[async_trait]
impl ProgressSink for ProgressPrinter {
    async fn on_progress(&self, completed: usize, total: usize, last: &JobResult) {
        let mark = if last.success {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "  {} [{}/{}] {}",
            mark,
            completed,
            total,
            last.job_id.dimmed()
        );
    }
}

/// Run jobs to completion and print the summary
pub async fn execute(args: ExecuteArgs, config: &Config) -> Result<()> {
    let execution = ExecutionConfig::new(parse_strategy(&args.strategy)?)
        .with_max_workers(args.max_workers)
        .with_batch_size(args.batch_size)
        .with_timeout(args.timeout);

    let jobs = args.source.load().await?;
    let coordinator = build_coordinator(config);
    let engine = StrategyEngine::new(coordinator.clone(), execution)?;

    let shutdown = CancellationToken::new();
    let consumer = args.consume.then(|| {
        let coordinator = coordinator.clone();
        let shutdown = shutdown.clone();
        let concurrency = config.max_concurrent_jobs;
        tokio::spawn(async move { coordinator.run_consumer_loop(concurrency, shutdown).await })
    });

    println!(
        "{}",
        format!("Executing {} job(s) with {} strategy", jobs.len(), args.strategy).bold()
    );
    let progress: Option<Arc<dyn ProgressSink>> = if args.json {
        None
    } else {
        Some(Arc::new(ProgressPrinter))
    };
    let result = engine.execute(jobs, progress).await;

    shutdown.cancel();
    if let Some(consumer) = consumer {
        consumer
            .await
            .context("Consumer task panicked")?
            .context("Consumer loop failed")?;
    }

    let result = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &ExecutionResult) {
    println!();
    println!(
        "{}",
        format!("Execution finished ({} strategy)", result.strategy).bold()
    );
    println!("  Total:       {}", result.total);
    println!("  Completed:   {}", result.completed.to_string().green());
    println!("  Failed:      {}", result.failed.to_string().red());
    println!("  Duration:    {}ms", result.execution_time_ms);
    println!("  Avg job:     {:.1}ms", result.average_job_time_ms);
    println!("  Throughput:  {:.2} jobs/sec", result.throughput_per_second);
    println!("  Error rate:  {:.1}%", result.error_rate_percent);

    if !result.timed_out.is_empty() {
        println!(
            "{}",
            format!("⚠ Timed out: {}", result.timed_out.join(", ")).yellow()
        );
    }
}
