//! Submit command handler

use anyhow::{Context, Result};
use colored::*;
use relay_engine::config::Config;

use super::JobSource;
use crate::config::build_coordinator;

/// Submit jobs and print their ids
pub async fn submit_jobs(source: JobSource, no_batch: bool, config: &Config) -> Result<()> {
    let jobs = source.load().await?;
    let coordinator = build_coordinator(config);

    if no_batch {
        for job in &jobs {
            coordinator
                .submit(job)
                .await
                .with_context(|| format!("Failed to submit job {}", job.id))?;
        }
    } else {
        coordinator
            .submit_batch(&jobs)
            .await
            .context("Failed to submit jobs")?;
    }

    println!(
        "{}",
        format!("✓ Submitted {} job(s)", jobs.len()).green().bold()
    );
    for job in &jobs {
        println!("  {} {} {}", "▸".cyan(), job.id, job.describe().dimmed());
    }

    Ok(())
}
