//! Generative content client.
//!
//! [`ContentGenerator`] is the seam managers depend on; [`GeminiClient`]
//! talks to the remote endpoint and [`MockGenerator`] serves tests and the
//! offline demo mode. The retry loop lives in [`retry`] and knows nothing
//! about missions or profiles.

pub mod gemini;
pub mod mock;
pub mod retry;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::MockGenerator;
pub use retry::{retry_with_backoff, RetryPolicy};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("response carried no text content")]
    MissingContent,
    #[error("structured output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Backend identifier, e.g. the model name.
    fn id(&self) -> &str;

    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Requests JSON constrained by `schema` and returns it parsed.
    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Value, GenerationError>;
}
