//! Configuration module
//!
//! Resolves engine configuration from the environment and command-line flags
//! and wires the HTTP services into a coordinator.

use anyhow::{Context, Result};
use clap::Args;
use relay_engine::config::Config;
use relay_engine::repository::{
    HttpMetricsSink, HttpObjectStore, HttpQueue, LogMetricsSink, MetricsSink,
};
use relay_engine::service::OllamaBackend;
use relay_engine::JobCoordinator;
use std::sync::Arc;
use tracing::info;

/// Connection flags shared by every command
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Queue endpoint
    #[arg(long, global = true, env = "RELAY_QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Object store endpoint
    #[arg(long, global = true, env = "RELAY_STORE_URL")]
    pub store_url: Option<String>,

    /// Bucket results are stored in
    #[arg(long, global = true, env = "RELAY_RESULT_BUCKET")]
    pub result_bucket: Option<String>,

    /// Metrics sink endpoint
    #[arg(long, global = true, env = "RELAY_METRICS_URL")]
    pub metrics_url: Option<String>,

    /// Deployment region
    #[arg(long, global = true, env = "RELAY_REGION")]
    pub region: Option<String>,

    /// Ollama server used for inference
    #[arg(long, global = true, env = "RELAY_OLLAMA_URL")]
    pub ollama_url: Option<String>,
}

/// Builds the configuration: environment first, flags on top
///
/// The queue and bucket flags already fall back to their environment
/// variables, so only a value missing from both is an error.
pub fn load_config(args: ConnectionArgs) -> Result<Config> {
    let queue_url = args
        .queue_url
        .context("No queue configured: pass --queue-url or set RELAY_QUEUE_URL")?;
    let result_bucket = args
        .result_bucket
        .context("No result bucket configured: pass --result-bucket or set RELAY_RESULT_BUCKET")?;

    let mut config = Config::from_env_with(queue_url, result_bucket);

    if let Some(store_url) = args.store_url {
        config.store_url = store_url;
    }
    if args.metrics_url.is_some() {
        config.metrics_url = args.metrics_url;
    }
    if let Some(region) = args.region {
        config.region = region;
    }
    if let Some(ollama_url) = args.ollama_url {
        config.ollama_url = ollama_url;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Connects a coordinator to the configured HTTP services
pub fn build_coordinator(config: &Config) -> JobCoordinator {
    info!(
        "Using queue {} and bucket {} in {}",
        config.queue_url, config.result_bucket, config.region
    );

    JobCoordinator::new(
        Arc::new(HttpQueue::new(config.queue_url.clone())),
        Arc::new(HttpObjectStore::new(
            config.store_url.clone(),
            config.result_bucket.clone(),
        )),
        Arc::new(OllamaBackend::new(
            config.ollama_url.clone(),
            config.test_model.clone(),
        )),
    )
    .with_settings(config.consumer_settings())
    .with_metrics(metrics_sink(config))
}

/// Publishes metrics when a sink is configured, logs them otherwise
pub fn metrics_sink(config: &Config) -> Arc<dyn MetricsSink> {
    match &config.metrics_url {
        Some(url) => Arc::new(HttpMetricsSink::new(url.clone())),
        None => Arc::new(LogMetricsSink),
    }
}
