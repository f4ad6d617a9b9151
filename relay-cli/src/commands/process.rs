//! Process command handler

use anyhow::{Context, Result};
use colored::*;
use relay_engine::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::build_coordinator;

/// Run the consumer loop until Ctrl-C
pub async fn run_consumer(concurrency: Option<usize>, config: &Config) -> Result<()> {
    let coordinator = build_coordinator(config);
    let concurrency = concurrency.unwrap_or(config.max_concurrent_jobs);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing in-flight jobs");
            signal.cancel();
        }
    });

    println!(
        "{}",
        format!("Processing jobs from {} (Ctrl-C to stop)", config.queue_url).bold()
    );

    coordinator
        .run_consumer_loop(concurrency, shutdown)
        .await
        .context("Consumer loop failed")?;

    let stats = coordinator.get_queue_stats().await.ok();
    println!("{}", "✓ Consumer stopped".green());
    if let Some(stats) = stats {
        println!("  Completed here: {}", stats.completed_count);
    }

    Ok(())
}
