//! Status command handler

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::*;
use relay_core::domain::result::JobResult;
use relay_core::dto::status::JobStatusView;
use relay_engine::config::Config;

use super::today;
use crate::config::build_coordinator;

/// Print the status of each job, then the queue counts
pub async fn show_status(job_ids: Vec<String>, date: Option<NaiveDate>, config: &Config) -> Result<()> {
    let coordinator = build_coordinator(config);
    let date = date.unwrap_or_else(today);

    for job_id in &job_ids {
        let status = coordinator
            .lookup_status(job_id, date)
            .await
            .with_context(|| format!("Failed to look up job {}", job_id))?;
        print_status(job_id, &status);
    }

    let stats = coordinator
        .get_queue_stats()
        .await
        .context("Failed to read queue attributes")?;

    println!("{}", "Queue:".bold());
    println!("  Available: {}", stats.available);
    println!("  In flight: {}", stats.in_flight);
    println!("  Delayed:   {}", stats.delayed);

    Ok(())
}

fn print_status(job_id: &str, status: &JobStatusView) {
    println!("  {} Job {}", "▸".cyan(), job_id.dimmed());
    match status {
        JobStatusView::Completed { result } => print_result(result),
        JobStatusView::Processing { job, submitted_at } => {
            println!("    Status:    {}", "processing".yellow());
            println!("    Work:      {}", job.describe());
            println!(
                "    Submitted: {}",
                submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        JobStatusView::NotFound { message } => {
            println!("    Status:    {}", "not found".red());
            println!("    {}", message.dimmed());
        }
    }
    println!();
}

fn print_result(result: &JobResult) {
    if result.success {
        println!("    Status:    {}", "completed".green());
        println!("    Metric:    {:.2}", result.metric());
    } else {
        println!("    Status:    {}", "failed".red());
        if let Some(message) = &result.error_message {
            println!("    Error:     {}", message.red());
        }
    }
    println!("    Time:      {}ms", result.execution_time_ms);
    println!(
        "    Completed: {}",
        result.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
}
