//! Engine configuration
//!
//! Connection settings for the queue, object store, metrics sink and
//! inference endpoint, plus the consumer loop's tuning knobs.

use std::time::Duration;

use crate::coordinator::ConsumerSettings;
use relay_core::dto::queue::MAX_BATCH_SIZE;

/// Longest long-poll the queue accepts
pub const MAX_RECEIVE_WAIT_SECS: u64 = 20;

/// Model used for test generation unless overridden
pub const DEFAULT_TEST_MODEL: &str = "deepseek-coder:6.7b";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue endpoint (e.g., "http://localhost:9324/queues/relay-jobs")
    pub queue_url: String,

    /// Object store endpoint
    pub store_url: String,

    /// Bucket results are written to
    pub result_bucket: String,

    /// Metrics sink endpoint; metrics are only logged when absent
    pub metrics_url: Option<String>,

    /// Deployment region, reported with every run
    pub region: String,

    /// Max jobs the consumer loop processes at once
    pub max_concurrent_jobs: usize,

    /// Long-poll duration for each receive
    pub receive_wait: Duration,

    /// Max messages leased per receive
    pub receive_batch: usize,

    /// Pause after a failed receive before polling again
    pub error_pause: Duration,

    /// Ollama server used for inference
    pub ollama_url: String,

    /// Model used for test generation jobs
    pub test_model: String,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(queue_url: String, result_bucket: String) -> Self {
        Self {
            queue_url,
            store_url: "http://localhost:9000".to_string(),
            result_bucket,
            metrics_url: None,
            region: "us-east-1".to_string(),
            max_concurrent_jobs: 10,
            receive_wait: Duration::from_secs(MAX_RECEIVE_WAIT_SECS),
            receive_batch: MAX_BATCH_SIZE,
            error_pause: Duration::from_secs(5),
            ollama_url: "http://localhost:11434".to_string(),
            test_model: DEFAULT_TEST_MODEL.to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - RELAY_QUEUE_URL (required)
    /// - RELAY_RESULT_BUCKET (required)
    /// - RELAY_STORE_URL (optional, default: http://localhost:9000)
    /// - RELAY_METRICS_URL (optional)
    /// - RELAY_REGION (optional, default: us-east-1)
    /// - RELAY_MAX_CONCURRENT_JOBS (optional, default: 10)
    /// - RELAY_RECEIVE_WAIT (optional, seconds, default: 20)
    /// - RELAY_RECEIVE_BATCH (optional, default: 10)
    /// - RELAY_ERROR_PAUSE (optional, seconds, default: 5)
    /// - RELAY_OLLAMA_URL (optional, default: http://localhost:11434)
    /// - RELAY_TEST_MODEL (optional, default: deepseek-coder:6.7b)
    pub fn from_env() -> anyhow::Result<Self> {
        let queue_url = std::env::var("RELAY_QUEUE_URL")
            .map_err(|_| anyhow::anyhow!("RELAY_QUEUE_URL environment variable not set"))?;

        let result_bucket = std::env::var("RELAY_RESULT_BUCKET")
            .map_err(|_| anyhow::anyhow!("RELAY_RESULT_BUCKET environment variable not set"))?;

        Ok(Self::from_env_with(queue_url, result_bucket))
    }

    /// Layers the optional environment variables over the given endpoints
    ///
    /// Used when the required values come from somewhere else, such as
    /// command-line flags.
    pub fn from_env_with(queue_url: String, result_bucket: String) -> Self {
        Self::from_lookup(queue_url, result_bucket, |name| std::env::var(name).ok())
    }

    fn from_lookup(
        queue_url: String,
        result_bucket: String,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::new(queue_url, result_bucket);

        Self {
            store_url: lookup("RELAY_STORE_URL").unwrap_or(defaults.store_url.clone()),
            metrics_url: lookup("RELAY_METRICS_URL"),
            region: lookup("RELAY_REGION").unwrap_or(defaults.region.clone()),
            max_concurrent_jobs: parsed(lookup("RELAY_MAX_CONCURRENT_JOBS"))
                .unwrap_or(defaults.max_concurrent_jobs),
            receive_wait: parsed(lookup("RELAY_RECEIVE_WAIT"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.receive_wait),
            receive_batch: parsed(lookup("RELAY_RECEIVE_BATCH"))
                .unwrap_or(defaults.receive_batch),
            error_pause: parsed(lookup("RELAY_ERROR_PAUSE"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.error_pause),
            ollama_url: lookup("RELAY_OLLAMA_URL").unwrap_or(defaults.ollama_url.clone()),
            test_model: lookup("RELAY_TEST_MODEL").unwrap_or(defaults.test_model.clone()),
            ..defaults
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("queue_url", Some(&self.queue_url)),
            ("store_url", Some(&self.store_url)),
            ("metrics_url", self.metrics_url.as_ref()),
            ("ollama_url", Some(&self.ollama_url)),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("{} must start with http:// or https://", name);
                }
            }
        }

        if self.result_bucket.is_empty() {
            anyhow::bail!("result_bucket cannot be empty");
        }

        if self.max_concurrent_jobs == 0 {
            anyhow::bail!("max_concurrent_jobs must be greater than 0");
        }

        if self.receive_batch == 0 || self.receive_batch > MAX_BATCH_SIZE {
            anyhow::bail!("receive_batch must be between 1 and {}", MAX_BATCH_SIZE);
        }

        if self.receive_wait.as_secs() > MAX_RECEIVE_WAIT_SECS {
            anyhow::bail!(
                "receive_wait cannot exceed {} seconds",
                MAX_RECEIVE_WAIT_SECS
            );
        }

        if self.error_pause.is_zero() {
            anyhow::bail!("error_pause must be greater than 0");
        }

        Ok(())
    }

    /// Consumer loop settings derived from this configuration
    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            receive_batch: self.receive_batch,
            receive_wait: self.receive_wait,
            error_pause: self.error_pause,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            "http://localhost:9324/queues/relay-jobs".to_string(),
            "relay-results".to_string(),
        )
    }
}

fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.parse::<T>().ok())
}
