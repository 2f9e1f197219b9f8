//! OpenAI API provider implementation.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use biolab_core::traits::{
    ContentPart, GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

use crate::error::ProviderError;
use crate::http::{build_client, check_status, encode_base64, read_json, send};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const SCHEMA_NAME: &str = "biolab_response";
const WRAPPED_FIELD: &str = "items";

/// OpenAI-compatible API provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    timeout_secs: Option<u64>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            timeout_secs,
            client: build_client(timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage>,
    response_format: OpenAiResponseFormat,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: OpenAiContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiPart {
    ImageUrl { image_url: OpenAiImageUrl },
    Text { text: String },
}

#[derive(Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: OpenAiJsonSchema,
}

#[derive(Serialize)]
struct OpenAiJsonSchema {
    name: &'static str,
    schema: Value,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// Images travel as `data:` URLs ahead of the text, in request order.
fn to_openai_parts(parts: &[ContentPart]) -> Vec<OpenAiPart> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::InlineData(a) => OpenAiPart::ImageUrl {
                image_url: OpenAiImageUrl {
                    url: format!("data:{};base64,{}", a.mime_type, encode_base64(&a.data)),
                },
            },
            ContentPart::Text(t) => OpenAiPart::Text { text: t.clone() },
        })
        .collect()
}

/// Structured outputs only accept an object at the schema root. Any other
/// root is wrapped as the single required `items` field of an object.
fn wrap_schema(schema: &Value) -> Option<Value> {
    if schema.get("type").and_then(Value::as_str) == Some("object") {
        return None;
    }
    Some(json!({
        "type": "object",
        "properties": { "items": schema },
        "required": ["items"],
        "additionalProperties": false
    }))
}

/// Undo [`wrap_schema`] on the reply. Content that is not the expected
/// wrapper is passed through for the caller to reject.
fn unwrap_content(content: String) -> String {
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(mut fields)) => match fields.remove(WRAPPED_FIELD) {
            Some(inner) => inner.to_string(),
            None => content,
        },
        _ => content,
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_instruction {
            messages.push(OpenAiMessage {
                role: "system",
                content: OpenAiContent::Text(system.clone()),
            });
        }
        messages.push(OpenAiMessage {
            role: "user",
            content: OpenAiContent::Parts(to_openai_parts(&request.parts)),
        });

        let wrapped_schema = wrap_schema(&request.response_schema);
        let body = OpenAiRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages,
            response_format: OpenAiResponseFormat {
                kind: "json_schema",
                json_schema: OpenAiJsonSchema {
                    name: SCHEMA_NAME,
                    schema: wrapped_schema
                        .clone()
                        .unwrap_or_else(|| request.response_schema.clone()),
                },
            },
        };

        let mut http_request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            http_request = http_request.header("OpenAI-Organization", org);
        }

        let response = send(http_request.json(&body), self.timeout_secs).await?;
        let response = check_status(response, &request.model).await?;
        let api_response: OpenAiResponse = read_json(response).await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let choice = api_response.choices.first();
        let content = choice
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            let reason = choice
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "no choices".to_string());
            return Err(ProviderError::EmptyResponse(reason).into());
        }
        let content = if wrapped_schema.is_some() {
            unwrap_content(content)
        } else {
            content
        };

        Ok(GenerateResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: api_response.usage.prompt_tokens,
                completion_tokens: api_response.usage.completion_tokens,
                total_tokens: api_response.usage.total_tokens,
            },
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1".into(),
                name: "GPT-4.1".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                supports_images: true,
            },
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                supports_images: true,
            },
            ModelInfo {
                id: "gpt-4o".into(),
                name: "GPT-4o".into(),
                provider: "openai".into(),
                max_context: 128_000,
                supports_images: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biolab_core::traits::{Attachment, GenerationConfig};
    use biolab_core::schema::quiz_schema;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str, parts: Vec<ContentPart>) -> GenerateRequest {
        let config = GenerationConfig {
            model: model.into(),
            ..Default::default()
        };
        config.request(
            Some("You are a biology teacher."),
            parts,
            json!({ "type": "object", "properties": {} }),
        )
    }

    fn ok_body(model: &str, content: &str) -> Value {
        json!({
            "choices": [{
                "message": { "content": content, "role": "assistant" },
                "index": 0,
                "finish_reason": "stop"
            }],
            "model": model,
            "usage": { "prompt_tokens": 40, "completion_tokens": 15, "total_tokens": 55 }
        })
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("gpt-4.1", "{\"ok\": true}")))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test-key", Some(server.uri()), None, None).unwrap();
        let response = provider
            .generate(&request("gpt-4.1", vec![ContentPart::Text("hi".into())]))
            .await
            .unwrap();
        assert_eq!(response.content, "{\"ok\": true}");
        assert_eq!(response.token_usage.total_tokens, 55);
    }

    #[tokio::test]
    async fn request_uses_json_schema_and_data_urls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("OpenAI-Organization", "org-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("gpt-4o", "{}")))
            .mount(&server)
            .await;

        let provider =
            OpenAiProvider::new("k", Some(server.uri()), Some("org-1".into()), None).unwrap();
        provider
            .generate(&request(
                "gpt-4o",
                vec![
                    ContentPart::InlineData(Attachment::new("image/jpeg", vec![0xFF, 0xD8, 0xFF])),
                    ContentPart::Text("Assess this.".into()),
                ],
            ))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let body: Value = received[0].body_json().unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a biology teacher.");
        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/jpeg;base64,/9j/");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], "Assess this.");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], SCHEMA_NAME);
        assert_eq!(body["response_format"]["json_schema"]["schema"]["type"], "object");
    }

    #[tokio::test]
    async fn array_schema_is_wrapped_in_an_object() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_body("gpt-4.1", "{\"items\": [{\"id\": 1}]}")),
            )
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("k", Some(server.uri()), None, None).unwrap();
        let quiz = GenerationConfig::default().request(
            None,
            vec![ContentPart::Text("Make a quiz.".into())],
            quiz_schema(),
        );
        let response = provider.generate(&quiz).await.unwrap();
        assert_eq!(response.content, "[{\"id\":1}]");

        let received = server.received_requests().await.unwrap();
        let body: Value = received[0].body_json().unwrap();
        let schema = &body["response_format"]["json_schema"]["schema"];
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["items"]));
        assert_eq!(schema["properties"]["items"], quiz_schema());
    }

    #[test]
    fn object_schema_is_sent_unchanged() {
        assert!(wrap_schema(&json!({ "type": "object", "properties": {} })).is_none());
        assert_eq!(unwrap_content("not json".into()), "not json");
        assert_eq!(unwrap_content("{\"other\": 1}".into()), "{\"other\": 1}");
    }

    #[tokio::test]
    async fn custom_base_url() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("custom-model", "{}")))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None, None).unwrap();
        let response = provider
            .generate(&request("custom-model", vec![ContentPart::Text("x".into())]))
            .await
            .unwrap();
        assert_eq!(response.model, "custom-model");
    }

    #[tokio::test]
    async fn refusal_without_content_is_an_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": { "content": null, "refusal": "no", "role": "assistant" },
                    "finish_reason": "content_filter"
                }],
                "model": "gpt-4.1"
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None, None).unwrap();
        let err = provider
            .generate(&request("gpt-4.1", vec![ContentPart::Text("x".into())]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("content_filter"));
    }

    #[tokio::test]
    async fn error_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None, None).unwrap();
        let err = provider
            .generate(&request("gpt-4.1", vec![ContentPart::Text("x".into())]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error (HTTP 500): internal error");
    }
}
