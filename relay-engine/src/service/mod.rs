//! Service layer
//!
//! Services turn a job into an outcome. The coordinator only sees the
//! [`InferenceBackend`] trait, so the Ollama backend can be swapped for an
//! instrumented stub in tests.

mod inference;
mod prompt;

// Re-export traits
pub use inference::InferenceBackend;

// Re-export implementations
pub use inference::{ModelTier, OllamaBackend};
pub use prompt::{clean_generated, count_test_cases};
