//! Ollama generation endpoint

use crate::error::Result;
use crate::HttpService;
use relay_core::dto::inference::{GenerateRequest, GenerateResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout for generation calls
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: HttpService,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the server at `ollama_url` (e.g. "http://localhost:11434")
    pub fn new(ollama_url: impl Into<String>) -> Self {
        Self::with_client(ollama_url, Client::new())
    }

    pub fn with_client(ollama_url: impl Into<String>, client: Client) -> Self {
        Self {
            http: HttpService::new(ollama_url, client),
            timeout: DEFAULT_GENERATE_TIMEOUT,
        }
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a single non-streaming generation
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = self.http.url("api/generate");
        debug!("Generating with model {}", request.model);
        let response = self
            .http
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        self.http.handle_response(response).await
    }
}
