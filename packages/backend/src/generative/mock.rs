//! Mock generator for tests and the offline demo mode.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{ContentGenerator, GenerationError};

/// Serves scripted replies first, then falls back to canned defaults.
///
/// Structured defaults are keyed by a top-level property name of the
/// requested schema, so one mock can answer mission and quiz requests.
pub struct MockGenerator {
    model_id: String,
    script: Mutex<VecDeque<Result<String, String>>>,
    default_text: String,
    structured_defaults: Vec<(String, Value)>,
    call_count: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            script: Mutex::new(VecDeque::new()),
            default_text: "Mock response".to_string(),
            structured_defaults: Vec::new(),
            call_count: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Canned Korean content used when `LLM_MOCK=true`.
    pub fn demo() -> Self {
        Self::new("mock-demo")
            .with_default_text("오늘도 꾸준히 기록했네요! 느낀 점을 한 문장 더 적어 보면 생각이 더 또렷해질 거예요.")
            .with_structured_default(
                "missions",
                json!({
                    "missions": [
                        { "title": "짧은 동화 한 편 읽기", "category": "READING", "description": "읽은 내용을 세 문장으로 정리해요.", "xpReward": 30, "goldReward": 10 },
                        { "title": "곱셈 문제 10개 풀기", "category": "MATH", "description": "틀린 문제는 다시 풀어 봐요.", "xpReward": 30, "goldReward": 10 },
                        { "title": "내 방 정리하기", "category": "LIFE_HABIT", "description": "책상 위를 깨끗하게 정리해요.", "xpReward": 20, "goldReward": 5 }
                    ]
                }),
            )
            .with_structured_default(
                "questions",
                json!({
                    "questions": [
                        { "question": "오늘 일기에서 가장 기억에 남는 일은 무엇인가요?", "type": "SHORT_ANSWER", "options": [], "answer": "자유 답변", "explanation": "일기 내용을 떠올려 보세요." }
                    ]
                }),
            )
    }

    pub fn with_default_text(mut self, text: impl Into<String>) -> Self {
        self.default_text = text.into();
        self
    }

    pub fn with_structured_default(mut self, schema_key: impl Into<String>, value: Value) -> Self {
        self.structured_defaults.push((schema_key.into(), value));
        self
    }

    /// Queues a successful reply (raw text; JSON text for structured calls).
    pub fn push_reply(&self, text: impl Into<String>) -> &Self {
        self.script.lock().push_back(Ok(text.into()));
        self
    }

    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.script.lock().push_back(Err(message.into()));
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn next_scripted(&self, prompt: &str) -> Option<Result<String, GenerationError>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        self.script
            .lock()
            .pop_front()
            .map(|reply| reply.map_err(GenerationError::Malformed))
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        match self.next_scripted(prompt) {
            Some(reply) => reply,
            None => Ok(self.default_text.clone()),
        }
    }

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Value, GenerationError> {
        if let Some(reply) = self.next_scripted(prompt) {
            return Ok(serde_json::from_str(&reply?)?);
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        self.structured_defaults
            .iter()
            .find(|(key, _)| properties.is_some_and(|p| p.contains_key(key)))
            .map(|(_, value)| value.clone())
            .ok_or(GenerationError::MissingContent)
    }
}
