//! The completion capability consumed by the gateway.

use crate::error::BackendError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use showroom_core::session::Turn;

/// Lazily produced text fragments of one streamed completion.
pub type FragmentStream = BoxStream<'static, Result<String, BackendError>>;

/// A request expecting a single JSON object back.
#[derive(Debug, Clone, Default)]
pub struct StructuredRequest {
    pub system: String,
    pub user_text: String,
    /// Description of the expected JSON shape.
    pub schema_hint: String,
}

/// A conversational request answered with streamed prose.
#[derive(Debug, Clone, Default)]
pub struct StreamRequest {
    pub system: String,
    pub history: Vec<Turn>,
    pub user_text: String,
}

/// A text-generation backend.
///
/// Implementations report failures with enough detail (status code, message)
/// for [`BackendError::is_retryable`] to classify them; they never retry
/// themselves.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Returns the raw text of a single JSON-shaped completion.
    async fn complete_json(&self, request: &StructuredRequest) -> Result<String, BackendError>;

    /// Opens a streamed completion.
    async fn open_stream(&self, request: &StreamRequest) -> Result<FragmentStream, BackendError>;
}
