//! Anthropic API provider implementation.
//!
//! The Messages API has no response-schema parameter, so the schema is
//! appended to the system prompt and the reply is decoded by the caller.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use biolab_core::traits::{
    ContentPart, GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

use crate::error::ProviderError;
use crate::http::{build_client, check_status, encode_base64, read_json, send};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic API provider.
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    timeout_secs: Option<u64>,
    client: reqwest::Client,
}

impl AnthropicProvider {
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
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum AnthropicBlock {
    Image { source: AnthropicImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: AnthropicUsage,
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

fn system_prompt(request: &GenerateRequest) -> String {
    let schema = serde_json::to_string_pretty(&request.response_schema)
        .unwrap_or_else(|_| request.response_schema.to_string());
    let mut system = request.system_instruction.clone().unwrap_or_default();
    if !system.is_empty() {
        system.push_str("\n\n");
    }
    system.push_str(
        "Respond ONLY with a JSON document, without markdown fences or commentary, \
         that conforms to this JSON schema:\n",
    );
    system.push_str(&schema);
    system
}

fn to_anthropic_blocks(parts: &[ContentPart]) -> Vec<AnthropicBlock> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::InlineData(a) => AnthropicBlock::Image {
                source: AnthropicImageSource {
                    kind: "base64",
                    media_type: a.mime_type.clone(),
                    data: encode_base64(&a.data),
                },
            },
            ContentPart::Text(t) => AnthropicBlock::Text { text: t.clone() },
        })
        .collect()
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let body = AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: system_prompt(request),
            messages: vec![AnthropicMessage {
                role: "user",
                content: to_anthropic_blocks(&request.parts),
            }],
        };

        let http_request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let response = send(http_request, self.timeout_secs).await?;
        let response = check_status(response, &request.model).await?;
        let api_response: AnthropicResponse = read_json(response).await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let content: String = api_response
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect();

        if content.trim().is_empty() {
            let reason = api_response
                .stop_reason
                .unwrap_or_else(|| "no text blocks".to_string());
            return Err(ProviderError::EmptyResponse(reason).into());
        }

        let usage = &api_response.usage;
        Ok(GenerateResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: usage.input_tokens,
                completion_tokens: usage.output_tokens,
                total_tokens: usage.input_tokens + usage.output_tokens,
            },
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "claude-sonnet-4-20250514".into(),
                name: "Claude Sonnet 4".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                supports_images: true,
            },
            ModelInfo {
                id: "claude-haiku-4-5-20251001".into(),
                name: "Claude Haiku 4.5".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                supports_images: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biolab_core::traits::{Attachment, GenerationConfig};
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(parts: Vec<ContentPart>) -> GenerateRequest {
        let config = GenerationConfig {
            model: "claude-sonnet-4-20250514".into(),
            ..Default::default()
        };
        config.request(
            Some("You are a biology teacher."),
            parts,
            json!({ "type": "object", "required": ["summary"] }),
        )
    }

    #[test]
    fn system_prompt_embeds_schema() {
        let prompt = system_prompt(&request(vec![]));
        assert!(prompt.starts_with("You are a biology teacher.\n\n"));
        assert!(prompt.contains("\"required\""));
        assert!(prompt.contains("\"summary\""));
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = json!({
            "content": [{ "type": "text", "text": "{\"summary\": \"ok\"}" }],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 50, "output_tokens": 20 }
        });

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", Some(server.uri()), None).unwrap();
        let response = provider
            .generate(&request(vec![ContentPart::Text("Assess this.".into())]))
            .await
            .unwrap();
        assert_eq!(response.content, "{\"summary\": \"ok\"}");
        assert_eq!(response.token_usage.prompt_tokens, 50);
        assert_eq!(response.token_usage.total_tokens, 70);
    }

    #[tokio::test]
    async fn image_block_precedes_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "{}" }],
                "model": "claude-sonnet-4-20250514"
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("k", Some(server.uri()), None).unwrap();
        provider
            .generate(&request(vec![
                ContentPart::InlineData(Attachment::new("image/png", b"biolab".to_vec())),
                ContentPart::Text("Assess this.".into()),
            ]))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let body: Value = received[0].body_json().unwrap();
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[0]["source"]["data"], "YmlvbGFi");
        assert_eq!(content[1]["type"], "text");
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("bad-key", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&request(vec![ContentPart::Text("x".into())]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "authentication failed: invalid x-api-key");
    }

    #[tokio::test]
    async fn rate_limiting() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("test-key", Some(server.uri()), None).unwrap();
        let err = provider
            .generate(&request(vec![ContentPart::Text("x".into())]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "rate limited, retry after 5000ms");
    }
}
