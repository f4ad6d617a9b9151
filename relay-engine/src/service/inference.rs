//! Inference backends

use async_trait::async_trait;
use relay_client::OllamaClient;
use relay_core::domain::error_fix::{Complexity, ErrorFix};
use relay_core::domain::job::{Job, JobSpec, TestGeneration};
use relay_core::domain::result::{FixOutcome, Outcome, TestOutcome};
use relay_core::dto::inference::GenerateRequest;
use tracing::{debug, info};

use super::prompt::{clean_generated, count_test_cases, fix_prompt, test_prompt};
use crate::error::{RelayError, Result};

/// Turns a job into an outcome
///
/// Failures are reported as [`RelayError::Inference`] and consume the job's
/// retry budget. Implementations must tolerate seeing the same job twice:
/// the queue delivers at least once.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn infer(&self, job: &Job) -> Result<Outcome>;
}

/// Named model sizes for test generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Default,
    Quality,
}

impl ModelTier {
    pub fn model(&self) -> &'static str {
        match self {
            ModelTier::Fast => "deepseek-coder:1.3b",
            ModelTier::Default => "deepseek-coder:6.7b",
            ModelTier::Quality => "deepseek-coder:33b",
        }
    }
}

impl std::str::FromStr for ModelTier {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(ModelTier::Fast),
            "default" => Ok(ModelTier::Default),
            "quality" => Ok(ModelTier::Quality),
            other => Err(RelayError::Configuration(format!(
                "unknown model tier: {}",
                other
            ))),
        }
    }
}

/// Backend that generates through a local Ollama server
///
/// Test jobs use the configured test model; error fix jobs use the backend
/// the classifier suggested for them.
pub struct OllamaBackend {
    client: OllamaClient,
    test_model: String,
}

impl OllamaBackend {
    pub fn new(ollama_url: impl Into<String>, test_model: impl Into<String>) -> Self {
        Self {
            client: OllamaClient::new(ollama_url),
            test_model: test_model.into(),
        }
    }

    pub fn with_tier(ollama_url: impl Into<String>, tier: ModelTier) -> Self {
        Self::new(ollama_url, tier.model())
    }

    async fn generate(&self, model: &str, prompt: String) -> Result<String> {
        let response = self
            .client
            .generate(&GenerateRequest::new(model, prompt))
            .await
            .map_err(|e| RelayError::Inference(format!("{} generation failed: {}", model, e)))?;

        let text = clean_generated(&response.response);
        if text.is_empty() {
            return Err(RelayError::Inference(format!(
                "{} returned an empty response",
                model
            )));
        }
        debug!("{} produced {} chars", model, text.len());
        Ok(text)
    }

    async fn generate_tests(&self, spec: &TestGeneration) -> Result<Outcome> {
        let tests = self.generate(&self.test_model, test_prompt(spec)).await?;
        let count = count_test_cases(&tests);
        info!("Generated {} {} test case(s)", count, spec.kind);

        Ok(Outcome::Tests(TestOutcome {
            tests_generated: count,
            generated_tests: Some(tests),
            ..TestOutcome::default()
        }))
    }

    async fn generate_fix(&self, fix: &ErrorFix) -> Result<Outcome> {
        let model = fix.suggested_backend();
        let fixed_code = self.generate(model, fix_prompt(fix)).await?;

        Ok(Outcome::Fix(FixOutcome {
            fixed_code: Some(fixed_code),
            explanation: None,
            confidence_score: confidence_for(fix.complexity()),
            model_used: model.to_string(),
        }))
    }
}

/// Prior confidence in a fix, by how hard the error looked
fn confidence_for(complexity: Complexity) -> f64 {
    match complexity {
        Complexity::Simple => 0.9,
        Complexity::Complex => 0.75,
        Complexity::Advanced => 0.6,
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    async fn infer(&self, job: &Job) -> Result<Outcome> {
        match &job.spec {
            JobSpec::TestGeneration(spec) => self.generate_tests(spec).await,
            JobSpec::ErrorFix(fix) => self.generate_fix(fix).await,
        }
    }
}
