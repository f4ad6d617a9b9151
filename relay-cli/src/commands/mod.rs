//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod errors;
mod execute;
mod process;
mod source;
mod status;
mod submit;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use relay_engine::config::Config;
use std::path::PathBuf;

pub use execute::ExecuteArgs;
pub use source::JobSource;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit test generation jobs to the queue
    Submit {
        #[command(flatten)]
        source: JobSource,

        /// Send one message per job instead of batches
        #[arg(long)]
        no_batch: bool,
    },
    /// Consume jobs from the queue until interrupted
    Process {
        /// Max jobs processed at once (defaults to RELAY_MAX_CONCURRENT_JOBS)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Show job status and queue counts
    Status {
        /// Job IDs to look up
        job_ids: Vec<String>,

        /// Day the results were stored (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Classify errors from a JSON file and submit fix jobs
    Distribute {
        /// JSON array of error reports
        errors_file: PathBuf,
    },
    /// Summarize stored error fix results
    Aggregate {
        /// Job IDs to aggregate
        #[arg(required = true)]
        job_ids: Vec<String>,

        /// Day the results were stored (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run jobs to completion with an execution strategy
    Execute(ExecuteArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Submit { source, no_batch } => submit::submit_jobs(source, no_batch, config).await,
        Commands::Process { concurrency } => process::run_consumer(concurrency, config).await,
        Commands::Status { job_ids, date } => status::show_status(job_ids, date, config).await,
        Commands::Distribute { errors_file } => errors::distribute(&errors_file, config).await,
        Commands::Aggregate {
            job_ids,
            date,
            json,
        } => errors::aggregate(job_ids, date, json, config).await,
        Commands::Execute(args) => execute::execute(args, config).await,
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
