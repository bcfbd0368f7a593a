//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! Structured calls use `generateContent` with a JSON response MIME type;
//! conversational turns use `streamGenerateContent` over SSE.

use crate::backend::{CompletionBackend, FragmentStream, StreamRequest, StructuredRequest};
use crate::error::BackendError;
use crate::sse;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use showroom_core::session::{Turn, TurnRole};
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_FALLBACK_MODEL: &str = "gemini-2.5-flash-lite";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Backend implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiApiAgent {
    /// Creates a new agent with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_output_tokens: 1024,
        }
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = max_tokens;
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{BASE_URL}/{model}:{method}", model = self.model)
    }

    async fn post(&self, url: String, body: &GenerateContentRequest) -> Result<Response, BackendError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Process {
                status_code: None,
                message: format!("Gemini API request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
                retry_after: None,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for GeminiApiAgent {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, request: &StructuredRequest) -> Result<String, BackendError> {
        let body = GenerateContentRequest {
            contents: vec![Content::text("user", &request.user_text)],
            system_instruction: system_instruction(&format!(
                "{}\n\n{}",
                request.system, request.schema_hint
            )),
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self.post(self.endpoint("generateContent"), &body).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| BackendError::Other(format!("Failed to parse Gemini response: {err}")))?;

        extract_text_response(parsed)
    }

    async fn open_stream(&self, request: &StreamRequest) -> Result<FragmentStream, BackendError> {
        let body = GenerateContentRequest {
            contents: build_contents(&request.history, &request.user_text),
            system_instruction: system_instruction(&request.system),
            generation_config: GenerationConfig {
                response_mime_type: None,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(url, &body).await?;

        let fragments = sse::data_payloads(response.bytes_stream()).map(|item| match item {
            Ok(data) => decode_stream_chunk(&data),
            Err(err) => Err(BackendError::Process {
                status_code: None,
                message: format!("Gemini stream read failed: {err}"),
                is_retryable: true,
                retry_after: None,
            }),
        });
        Ok(fragments.boxed())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct Part {
    text: String,
}

fn system_instruction(text: &str) -> Option<Content> {
    let text = text.trim();
    (!text.is_empty()).then(|| Content::text("system", text))
}

fn build_contents(history: &[Turn], user_text: &str) -> Vec<Content> {
    history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "model",
            };
            Content::text(role, &turn.content)
        })
        .chain(std::iter::once(Content::text("user", user_text)))
        .collect()
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl ErrorBody {
    fn describe(self, fallback: &str) -> String {
        let status_text = self.status.unwrap_or_default();
        let msg = self.message.unwrap_or_else(|| fallback.to_string());
        if status_text.is_empty() {
            msg
        } else {
            format!("{status_text}: {msg}")
        }
    }
}

fn candidate_text(response: GenerateContentResponse) -> Option<String> {
    let text: String = response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();
    Some(text)
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, BackendError> {
    candidate_text(response)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            BackendError::ExecutionFailed(
                "Gemini API returned no text in the response candidates".into(),
            )
        })
}

/// Decodes one SSE payload into a text fragment (possibly empty).
fn decode_stream_chunk(data: &str) -> Result<String, BackendError> {
    if let Ok(wrapper) = serde_json::from_str::<ErrorWrapper>(data) {
        let status_code = wrapper.error.code;
        return Err(BackendError::Process {
            status_code,
            message: wrapper.error.describe(data),
            is_retryable: false,
            retry_after: None,
        });
    }
    let chunk: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|err| BackendError::Other(format!("Failed to parse Gemini stream chunk: {err}")))?;
    Ok(candidate_text(chunk).unwrap_or_default())
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> BackendError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| wrapper.error.describe(&body))
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    if let Some(delay) = retry_after {
        BackendError::process_error_with_retry_after(status.as_u16(), message, is_retryable, delay)
    } else {
        BackendError::Process {
            status_code: Some(status.as_u16()),
            message,
            is_retryable,
            retry_after: None,
        }
    }
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_roles_and_order() {
        let history = vec![Turn::user("hi"), Turn::model("hello")];
        let contents = build_contents(&history, "a sofa?");
        let value = serde_json::to_value(&contents).unwrap();
        assert_eq!(
            value,
            json!([
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "model", "parts": [{"text": "hello"}]},
                {"role": "user", "parts": [{"text": "a sofa?"}]}
            ])
        );
    }

    #[test]
    fn test_structured_request_shape() {
        let body = GenerateContentRequest {
            contents: vec![Content::text("user", "sofa under 900")],
            system_instruction: system_instruction("extract"),
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".into()),
                max_output_tokens: 256,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "extract");
        assert!(system_instruction("   ").is_none());
    }

    #[test]
    fn test_decode_stream_chunk() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"}}]}"#;
        assert_eq!(decode_stream_chunk(data).unwrap(), "Hello");

        let finish = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(decode_stream_chunk(finish).unwrap(), "");
    }

    #[test]
    fn test_stream_error_payload() {
        let data = r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#;
        let err = decode_stream_chunk(data).unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_http_error() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            body.to_string(),
            Some(Duration::from_secs(7)),
        );
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED: Quota exceeded"));

        let err = map_http_error(StatusCode::BAD_REQUEST, "plain text".into(), None);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("plain text"));
    }

    #[test]
    fn test_empty_candidates_is_execution_failure() {
        let response: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            extract_text_response(response),
            Err(BackendError::ExecutionFailed(_))
        ));
    }
}
