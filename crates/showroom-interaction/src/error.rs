//! Backend failure type and retry classification.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by a completion backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The remote call failed, usually with an HTTP status.
    #[error("Process error (status {status_code:?}): {message}")]
    Process {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The request could not be built or the response carried no text.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// A stream opened but finished without producing any text.
    #[error("Stream ended without producing any text")]
    EmptyStream,

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn process_error_with_retry_after(
        status_code: u16,
        message: impl Into<String>,
        is_retryable: bool,
        retry_after: Duration,
    ) -> Self {
        Self::Process {
            status_code: Some(status_code),
            message: message.into(),
            is_retryable,
            retry_after: Some(retry_after),
        }
    }

    /// Transient failures worth another attempt: HTTP 429/500/502/503/504,
    /// an explicit retryable flag, an empty stream, or a message that reads
    /// like overload or temporary unavailability.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Process {
                status_code,
                message,
                is_retryable,
                ..
            } => {
                *is_retryable
                    || status_code.is_some_and(is_retryable_status)
                    || message_is_transient(message)
            }
            Self::EmptyStream => true,
            Self::ExecutionFailed(message) | Self::Other(message) => message_is_transient(message),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Process { status_code, .. } => *status_code,
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Process { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn message_is_transient(message: &str) -> bool {
    let lowered = message.to_lowercase();
    ["overload", "unavailable", "temporar"]
        .iter()
        .any(|marker| lowered.contains(marker))
}
