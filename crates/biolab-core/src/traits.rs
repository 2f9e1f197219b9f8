//! The AI boundary: provider trait, request/response types, and structured
//! payload decoding.
//!
//! Every generative call in biolab (quiz generation, single-submission
//! analysis, class analysis) goes through [`LlmProvider::generate`] with the
//! same request shape: ordered content parts, an optional system instruction,
//! and a JSON response schema.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for generative backends that answer with schema-shaped JSON.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Run one generation request.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List available models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// An inline binary attachment (an image of a growth curve or petri dish).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// MIME type, e.g. "image/jpeg".
    pub mime_type: String,
    /// Raw bytes; providers base64-encode on the wire.
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Guess an image MIME type from a file extension.
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            "gif" => Some("image/gif"),
            "heic" => Some("image/heic"),
            _ => None,
        }
    }
}

/// One piece of the user turn, kept in send order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPart {
    InlineData(Attachment),
    Text(String),
}

/// Request to generate a structured response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gemini-2.5-flash").
    pub model: String,
    /// Persona / tone instruction sent separately from the user turn.
    #[serde(default)]
    pub system_instruction: Option<String>,
    /// User turn content, attachments first.
    pub parts: Vec<ContentPart>,
    /// JSON schema the answer must follow.
    pub response_schema: serde_json::Value,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl GenerateRequest {
    /// All text parts joined with blank lines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::InlineData(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Binary attachments in send order.
    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.parts.iter().filter_map(|p| match p {
            ContentPart::InlineData(a) => Some(a),
            ContentPart::Text(_) => None,
        })
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw text content, expected to hold JSON.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Whether the model accepts inline images.
    pub supports_images: bool,
}

// ---------------------------------------------------------------------------
// Generation settings
// ---------------------------------------------------------------------------

/// Model and sampling settings shared by every request a session makes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            max_tokens: 8192,
        }
    }
}

impl GenerationConfig {
    /// Build a request for this model.
    pub fn request(
        &self,
        system_instruction: Option<&str>,
        parts: Vec<ContentPart>,
        response_schema: serde_json::Value,
    ) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            system_instruction: system_instruction.map(str::to_string),
            parts,
            response_schema,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON payload extraction
// ---------------------------------------------------------------------------

/// Extract the JSON document from a model response.
///
/// Handles:
/// - Bare JSON (returned as-is, trimmed)
/// - A ```json``` or generic ``` fenced block (the first one wins)
/// - Prose around a single top-level object or array
pub fn extract_json_payload(response: &str) -> &str {
    let trimmed = response.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }

    if let Some(fence) = trimmed.find("```") {
        let after = &trimmed[fence + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(after.len());
        let body = &after[body_start..];
        let body = match body.find("```") {
            Some(end) => &body[..end],
            // Truncated (unclosed) fence: take what we have
            None => body,
        };
        return body.trim();
    }

    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if e > s => &trimmed[s..=e],
        _ => trimmed,
    }
}

/// Send a request and decode the answer into `T`.
///
/// Transport, HTTP and parse failures are logged with their cause and then
/// folded into [`AssessmentError::Generation`].
pub async fn generate_structured<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    request: &GenerateRequest,
) -> Result<T, AssessmentError> {
    let response = provider.generate(request).await.map_err(|e| {
        tracing::error!(provider = provider.name(), error = %format!("{e:#}"), "AI request failed");
        AssessmentError::generation(e)
    })?;

    if response.content.trim().is_empty() {
        tracing::error!(provider = provider.name(), "AI returned an empty response");
        return Err(AssessmentError::generation("empty response"));
    }

    tracing::debug!(
        provider = provider.name(),
        model = %response.model,
        latency_ms = response.latency_ms,
        total_tokens = response.token_usage.total_tokens,
        "AI response received"
    );

    let payload = extract_json_payload(&response.content);
    serde_json::from_str::<T>(payload).map_err(|e| {
        tracing::error!(provider = provider.name(), error = %e, "AI response did not match schema");
        AssessmentError::generation(format!("schema violation: {e}"))
    })
}
