//! Error distribution and aggregation handlers

use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::*;
use relay_core::dto::error_report::ErrorReport;
use relay_engine::config::Config;
use relay_engine::{ErrorAggregator, ErrorDistributor};
use std::path::Path;

use super::today;
use crate::config::{build_coordinator, metrics_sink};

/// Classify the reports in `errors_file` and submit one fix job each
pub async fn distribute(errors_file: &Path, config: &Config) -> Result<()> {
    let raw = tokio::fs::read_to_string(errors_file)
        .await
        .with_context(|| format!("Failed to read {}", errors_file.display()))?;
    let reports: Vec<ErrorReport> =
        serde_json::from_str(&raw).context("Errors file must be a JSON array of error reports")?;

    let distributor =
        ErrorDistributor::new(build_coordinator(config)).with_metrics(metrics_sink(config));
    let job_ids = distributor.distribute_errors(&reports).await;

    println!(
        "{}",
        format!("Distributed {} error fixing job(s)", job_ids.len()).bold()
    );
    for job_id in &job_ids {
        println!("  - {}", job_id);
    }
    if job_ids.len() < reports.len() {
        println!(
            "{}",
            format!("⚠ {} error(s) could not be submitted", reports.len() - job_ids.len()).yellow()
        );
    }

    Ok(())
}

/// Summarize the stored results of error fix jobs
pub async fn aggregate(
    job_ids: Vec<String>,
    date: Option<NaiveDate>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let coordinator = build_coordinator(config);
    let aggregator = ErrorAggregator::new(coordinator.archive().clone());
    let report = aggregator
        .aggregate_results(&job_ids, date.unwrap_or_else(today))
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Error fix summary".bold());
    println!("  Jobs:            {}", report.total_jobs);
    println!(
        "  Successful:      {}",
        report.successful_fixes.to_string().green()
    );
    println!("  Failed:          {}", report.failed_fixes.to_string().red());
    println!("  Success rate:    {:.1}%", report.success_rate);
    println!("  Avg confidence:  {:.2}", report.average_confidence);
    println!("  Avg time:        {:.2}ms", report.average_execution_time_ms);

    if !report.error_type_breakdown.is_empty() {
        println!();
        println!("{}", "By error type:".bold());
        for (error_type, stats) in &report.error_type_breakdown {
            println!(
                "  {:<12} {}/{} fixed",
                error_type, stats.successful, stats.total
            );
        }
    }

    Ok(())
}
