//! ClaudeApiAgent - Direct REST API implementation for Claude.
//!
//! Configuration priority: ~/.config/showroom/secret.json > environment variables

use crate::backend::{CompletionBackend, FragmentStream, StreamRequest, StructuredRequest};
use crate::error::BackendError;
use crate::gemini_api_agent::parse_retry_after;
use crate::sse;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use showroom_core::session::{Turn, TurnRole};
use std::time::Duration;

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_CLAUDE_FALLBACK_MODEL: &str = "claude-haiku-4-5-20251001";
const BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Backend implementation that talks to the Claude HTTP API.
#[derive(Clone)]
pub struct ClaudeApiAgent {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeApiAgent {
    /// Creates a new agent with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 1024,
        }
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn send_request(&self, body: &CreateMessageRequest) -> Result<Response, BackendError> {
        let response = self
            .client
            .post(BASE_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| BackendError::Process {
                status_code: None,
                message: format!("Claude API request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
                retry_after: None,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Claude error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for ClaudeApiAgent {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete_json(&self, request: &StructuredRequest) -> Result<String, BackendError> {
        let body = CreateMessageRequest {
            model: self.model.clone(),
            messages: vec![Message::new("user", &request.user_text)],
            max_tokens: self.max_tokens,
            system: Some(format!("{}\n\n{}", request.system, request.schema_hint)),
            stream: false,
        };

        let parsed: CreateMessageResponse = self
            .send_request(&body)
            .await?
            .json()
            .await
            .map_err(|err| BackendError::Other(format!("Failed to parse Claude response: {err}")))?;

        extract_text_response(parsed)
    }

    async fn open_stream(&self, request: &StreamRequest) -> Result<FragmentStream, BackendError> {
        let system = request.system.trim();
        let body = CreateMessageRequest {
            model: self.model.clone(),
            messages: build_messages(&request.history, &request.user_text),
            max_tokens: self.max_tokens,
            system: (!system.is_empty()).then(|| system.to_string()),
            stream: true,
        };

        let response = self.send_request(&body).await?;

        let fragments = sse::data_payloads(response.bytes_stream()).map(|item| match item {
            Ok(data) => decode_stream_event(&data),
            Err(err) => Err(BackendError::Process {
                status_code: None,
                message: format!("Claude stream read failed: {err}"),
                is_retryable: true,
                retry_after: None,
            }),
        });
        Ok(fragments.boxed())
    }
}

#[derive(Serialize)]
struct CreateMessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

fn build_messages(history: &[Turn], user_text: &str) -> Vec<Message> {
    history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "assistant",
            };
            Message::new(role, &turn.content)
        })
        .chain(std::iter::once(Message::new("user", user_text)))
        .collect()
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlockResponse {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// One SSE payload of a streamed message.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEventPayload {
    ContentBlockDelta { delta: Delta },
    Error { error: ErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Delta {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    r#type: String,
    message: String,
}

fn extract_text_response(response: CreateMessageResponse) -> Result<String, BackendError> {
    response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlockResponse::Text { text } => Some(text),
            ContentBlockResponse::Other => None,
        })
        .ok_or_else(|| {
            BackendError::ExecutionFailed("Claude API returned no text in the response content".into())
        })
}

/// Decodes one SSE payload into a text fragment (possibly empty). Only
/// `content_block_delta` carries text; an `error` event fails the stream.
fn decode_stream_event(data: &str) -> Result<String, BackendError> {
    let event: StreamEventPayload = serde_json::from_str(data)
        .map_err(|err| BackendError::Other(format!("Failed to parse Claude stream event: {err}")))?;
    match event {
        StreamEventPayload::ContentBlockDelta { delta } => Ok(delta.text.unwrap_or_default()),
        StreamEventPayload::Error { error } => Err(BackendError::Process {
            status_code: None,
            message: format!("{}: {}", error.r#type, error.message),
            is_retryable: false,
            retry_after: None,
        }),
        StreamEventPayload::Other => Ok(String::new()),
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> BackendError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    ) || status.as_u16() == 529;

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
