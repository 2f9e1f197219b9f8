//! HTTP plumbing shared by the hosted providers.

use std::time::Duration;

use base64::Engine as _;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;

use crate::error::ProviderError;

/// Build a client. Without `timeout_secs` requests may wait indefinitely.
pub(crate) fn build_client(timeout_secs: Option<u64>) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| ProviderError::Client(e.to_string()))
}

pub(crate) async fn send(
    request: RequestBuilder,
    timeout_secs: Option<u64>,
) -> Result<Response, ProviderError> {
    request.send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout(timeout_secs.unwrap_or_default())
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    })
}

// Gemini, OpenAI and Anthropic all wrap failures as {"error": {"message": ...}}.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pass successful responses through; map everything else onto [`ProviderError`].
pub(crate) async fn check_status(response: Response, model: &str) -> Result<Response, ProviderError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            * 1000;
        return Err(ProviderError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(match status {
        401 | 403 => ProviderError::AuthenticationFailed(message),
        404 => ProviderError::ModelNotFound(model.to_string()),
        _ => ProviderError::ApiError { status, message },
    })
}

/// Decode a success body.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ProviderError> {
    response.json().await.map_err(|e| ProviderError::ApiError {
        status: 0,
        message: format!("failed to parse response: {e}"),
    })
}

pub(crate) fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_matches_standard_alphabet() {
        assert_eq!(encode_base64(b"biolab"), "YmlvbGFi");
        assert_eq!(encode_base64(&[0xFF, 0xD8, 0xFF]), "/9j/");
    }
}
