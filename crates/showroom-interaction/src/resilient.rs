//! Retrying wrapper around a [`CompletionBackend`].

use crate::backend::{CompletionBackend, StreamRequest, StructuredRequest};
use crate::error::BackendError;
use crate::retry::{AttemptTracker, Decision, RetryPolicy};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of a structured completion.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutcome {
    /// The backend returned a JSON object.
    Parsed(Map<String, Value>),
    /// The backend answered, but not with a JSON object.
    ParseFailure { raw: String },
    /// Every attempt failed.
    CallFailure(BackendError),
}

impl StructuredOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    /// The parsed object, or an empty object meaning "unknown".
    pub fn into_object(self) -> Value {
        match self {
            Self::Parsed(object) => Value::Object(object),
            Self::ParseFailure { .. } | Self::CallFailure(_) => Value::Object(Map::new()),
        }
    }
}

/// One item of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Fragment(String),
    /// The stream failed after text was already emitted. Terminal.
    Interrupted(BackendError),
    /// No text could be produced by any backend. Terminal.
    Unavailable(BackendError),
}

/// Extracts a JSON object from model output, tolerating code fences and
/// prose around the outermost `{...}` span.
pub fn parse_structured(text: &str) -> Option<Map<String, Value>> {
    let trimmed = text.trim();
    if let Ok(Value::Object(object)) = serde_json::from_str(trimmed) {
        return Some(object);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&trimmed[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Retries transient failures and falls back to a secondary backend for
/// streamed completions.
///
/// Structured calls are retried wholesale: nothing has been shown to the
/// player yet. Streamed calls are retried only until the first fragment is
/// emitted; after that a failure ends the stream.
#[derive(Clone)]
pub struct ResilientClient {
    primary: Arc<dyn CompletionBackend>,
    fallback: Option<Arc<dyn CompletionBackend>>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(primary: Arc<dyn CompletionBackend>, policy: RetryPolicy) -> Self {
        Self {
            primary,
            fallback: None,
            policy,
        }
    }

    /// Sets the lower-capability backend used once after the primary gives up
    /// on a streamed completion.
    pub fn with_fallback(mut self, fallback: Arc<dyn CompletionBackend>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn complete_structured(&self, request: &StructuredRequest) -> StructuredOutcome {
        let mut tracker = AttemptTracker::new(self.policy.clone(), false);

        loop {
            match self.primary.complete_json(request).await {
                Ok(text) => {
                    return match parse_structured(&text) {
                        Some(object) => StructuredOutcome::Parsed(object),
                        None => {
                            tracing::warn!(
                                "[ResilientClient] {} returned non-object output ({} bytes)",
                                self.primary.model(),
                                text.len()
                            );
                            StructuredOutcome::ParseFailure { raw: text }
                        }
                    };
                }
                Err(err) => match tracker.record_failure(&err) {
                    Decision::Retry { delay } => {
                        tracing::debug!(
                            "[ResilientClient] structured attempt {} failed ({}), retrying in {:?}",
                            tracker.failures(),
                            err,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Decision::SwitchToFallback | Decision::GiveUp => {
                        tracing::warn!(
                            "[ResilientClient] structured completion failed after {} attempt(s): {}",
                            tracker.failures(),
                            err
                        );
                        return StructuredOutcome::CallFailure(err);
                    }
                },
            }
        }
    }

    /// Streams a completion. The returned stream ends after the last
    /// fragment, or after a terminal [`StreamEvent::Interrupted`] or
    /// [`StreamEvent::Unavailable`].
    pub fn complete_streamed(&self, request: StreamRequest) -> BoxStream<'static, StreamEvent> {
        let primary = Arc::clone(&self.primary);
        let fallback = self.fallback.clone();
        let policy = self.policy.clone();

        let stream = async_stream::stream! {
            let mut tracker = AttemptTracker::new(policy, fallback.is_some());
            let mut backend = primary;

            'attempts: loop {
                let failure = match backend.open_stream(&request).await {
                    Err(err) => err,
                    Ok(mut fragments) => {
                        let mut emitted = false;
                        let mut failure = None;
                        while let Some(item) = fragments.next().await {
                            match item {
                                Ok(fragment) if fragment.is_empty() => {}
                                Ok(fragment) => {
                                    emitted = true;
                                    yield StreamEvent::Fragment(fragment);
                                }
                                Err(err) => {
                                    failure = Some(err);
                                    break;
                                }
                            }
                        }
                        match (emitted, failure) {
                            (true, None) => break 'attempts,
                            (true, Some(err)) => {
                                tracing::warn!(
                                    "[ResilientClient] stream from {} interrupted after output started: {}",
                                    backend.model(),
                                    err
                                );
                                yield StreamEvent::Interrupted(err);
                                break 'attempts;
                            }
                            (false, None) => BackendError::EmptyStream,
                            (false, Some(err)) => err,
                        }
                    }
                };

                match tracker.record_failure(&failure) {
                    Decision::Retry { delay } => {
                        tracing::debug!(
                            "[ResilientClient] stream attempt {} on {} failed ({}), retrying in {:?}",
                            tracker.failures(),
                            backend.model(),
                            failure,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Decision::SwitchToFallback => match &fallback {
                        Some(secondary) => {
                            tracing::info!(
                                "[ResilientClient] {} gave up ({}), falling back to {}",
                                backend.model(),
                                failure,
                                secondary.model()
                            );
                            backend = Arc::clone(secondary);
                        }
                        None => {
                            yield StreamEvent::Unavailable(failure);
                            break 'attempts;
                        }
                    },
                    Decision::GiveUp => {
                        tracing::warn!(
                            "[ResilientClient] streamed completion unavailable after {} attempt(s): {}",
                            tracker.failures(),
                            failure
                        );
                        yield StreamEvent::Unavailable(failure);
                        break 'attempts;
                    }
                }
            }
        };
        stream.boxed()
    }
}
