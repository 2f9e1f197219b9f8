//! Mock provider for tests and offline runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use biolab_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage};

/// Reply with `response` when the request text contains `contains`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockRule {
    pub contains: String,
    pub response: String,
}

impl MockRule {
    pub fn new(contains: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
            response: response.into(),
        }
    }
}

/// A mock provider that answers without any network access.
///
/// Rules are checked in order against the request's text parts; the first
/// match wins, otherwise the default response is returned.
pub struct MockProvider {
    rules: Vec<MockRule>,
    default_response: String,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    pub fn new(rules: Vec<MockRule>) -> Self {
        Self {
            rules,
            default_response: "{}".to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self::new(Vec::new()).with_default(response)
    }

    pub fn with_default(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let text = request.text();
        let content = self
            .rules
            .iter()
            .find(|rule| text.contains(rule.contains.as_str()))
            .map(|rule| rule.response.clone())
            .unwrap_or_else(|| self.default_response.clone());

        // Rough estimate
        let prompt_tokens = (text.len() / 4) as u32;
        let completion_tokens = (content.len() / 4) as u32;

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            supports_images: true,
        }]
    }
}
