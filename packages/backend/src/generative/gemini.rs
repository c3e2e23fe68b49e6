use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::retry::{retry_with_backoff, RetryPolicy};
use super::{ContentGenerator, GenerationError};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_string("GEMINI_API_KEY"),
            model: env_string("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_endpoint: env_string("GEMINI_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            timeout: Duration::from_millis(env_u64("GEMINI_TIMEOUT_MS").unwrap_or(DEFAULT_TIMEOUT_MS)),
            retry: RetryPolicy::default(),
        }
    }
}

// ==================== Wire types ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn text(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt.to_string() }],
            }],
            generation_config: None,
        }
    }

    pub fn structured(prompt: &str, schema: &Value) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema.clone(),
            }),
            ..Self::text(prompt)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()
            .map(|p| p.text.as_str())
    }
}

// ==================== Client ====================

#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(GeminiConfig::from_env())
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(GenerationError::NotConfigured("GEMINI_API_KEY"))
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    /// One request/response round trip; every failure mode is an error so
    /// the retry loop treats them alike.
    async fn attempt(&self, api_key: &str, request: &GenerateContentRequest) -> Result<String, GenerationError> {
        let resp = self
            .client
            .post(self.url())
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::HttpStatus { status, body });
        }

        let bytes = resp.bytes().await?;
        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(body = %String::from_utf8_lossy(&bytes), "undecodable generation response");
            GenerationError::Malformed(e.to_string())
        })?;

        parsed
            .first_text()
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .ok_or(GenerationError::MissingContent)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    fn id(&self) -> &str {
        &self.config.model
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key()?;
        let request = GenerateContentRequest::text(prompt);
        let request = &request;

        retry_with_backoff(&self.config.retry, move |_| self.attempt(api_key, request)).await
    }

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Value, GenerationError> {
        let api_key = self.api_key()?;
        let request = GenerateContentRequest::structured(prompt, schema);
        let request = &request;

        retry_with_backoff(&self.config.retry, move |_| async move {
            let text = self.attempt(api_key, request).await?;
            let value: Value = serde_json::from_str(strip_code_fence(&text))?;
            Ok::<Value, GenerationError>(value)
        })
        .await
    }
}

/// Models occasionally wrap JSON in a markdown fence despite the mime type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}
