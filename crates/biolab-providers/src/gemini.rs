//! Google Gemini API provider implementation.
//!
//! Uses `generateContent` with a native `responseSchema`, so the model is
//! constrained to the requested JSON shape on the server side.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use biolab_core::traits::{
    ContentPart, GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

use crate::error::ProviderError;
use crate::http::{build_client, check_status, encode_base64, read_json, send};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    timeout_secs: Option<u64>,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs,
            client: build_client(timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum GeminiPart {
    InlineData(GeminiBlob),
    Text(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsage,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

/// Gemini spells schema types as upper-case enum names (`OBJECT`, `STRING`, ...).
fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let converted = match (key.as_str(), value) {
                        ("type", Value::String(t)) => Value::String(t.to_uppercase()),
                        _ => to_gemini_schema(value),
                    };
                    (key.clone(), converted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

fn to_gemini_parts(parts: &[ContentPart]) -> Vec<GeminiPart> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::InlineData(a) => GeminiPart::InlineData(GeminiBlob {
                mime_type: a.mime_type.clone(),
                data: encode_base64(&a.data),
            }),
            ContentPart::Text(t) => GeminiPart::Text(t.clone()),
        })
        .collect()
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: to_gemini_parts(&request.parts),
            }],
            system_instruction: request.system_instruction.as_ref().map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text(s.clone())],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: "application/json",
                response_schema: to_gemini_schema(&request.response_schema),
            },
        };

        let http_request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, request.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body);

        let response = send(http_request, self.timeout_secs).await?;
        let response = check_status(response, &request.model).await?;
        let api_response: GeminiResponse = read_json(response).await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let candidate = api_response.candidates.first();
        let content: String = candidate
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        if content.trim().is_empty() {
            let reason = candidate
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ProviderError::EmptyResponse(reason).into());
        }

        let usage = &api_response.usage_metadata;
        Ok(GenerateResponse {
            content,
            model: api_response
                .model_version
                .unwrap_or_else(|| request.model.clone()),
            token_usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gemini-2.5-flash".into(),
                name: "Gemini 2.5 Flash".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                supports_images: true,
            },
            ModelInfo {
                id: "gemini-2.5-pro".into(),
                name: "Gemini 2.5 Pro".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                supports_images: true,
            },
            ModelInfo {
                id: "gemini-2.5-flash-lite".into(),
                name: "Gemini 2.5 Flash-Lite".into(),
                provider: "gemini".into(),
                max_context: 1_048_576,
                supports_images: true,
            },
        ]
    }
}
