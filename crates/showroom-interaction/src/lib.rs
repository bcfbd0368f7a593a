//! Backend access for the Showroom gateway: the completion capability, the
//! Gemini and Claude HTTP agents, and the retrying client wrapped around them.

pub mod backend;
pub mod claude_api_agent;
pub mod config;
pub mod error;
pub mod gemini_api_agent;
pub mod resilient;
pub mod retry;
pub mod sse;

pub use backend::{CompletionBackend, FragmentStream, StreamRequest, StructuredRequest};
pub use error::BackendError;
pub use resilient::{ResilientClient, StreamEvent, StructuredOutcome};
pub use retry::RetryPolicy;

use claude_api_agent::{ClaudeApiAgent, DEFAULT_CLAUDE_FALLBACK_MODEL, DEFAULT_CLAUDE_MODEL};
use gemini_api_agent::{DEFAULT_GEMINI_FALLBACK_MODEL, DEFAULT_GEMINI_MODEL, GeminiApiAgent};
use showroom_core::config::{BackendConfig, BackendProvider, GatewayConfig};
use std::sync::Arc;

/// Primary and fallback model names for a backend configuration.
pub fn resolve_models(config: &BackendConfig) -> (String, Option<String>) {
    let (default_primary, default_fallback) = match config.provider {
        BackendProvider::Gemini => (DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_FALLBACK_MODEL),
        BackendProvider::Claude => (DEFAULT_CLAUDE_MODEL, DEFAULT_CLAUDE_FALLBACK_MODEL),
    };
    let primary = config
        .model
        .clone()
        .unwrap_or_else(|| default_primary.to_string());
    let fallback = config.fallback.then(|| {
        config
            .fallback_model
            .clone()
            .unwrap_or_else(|| default_fallback.to_string())
    });
    (primary, fallback)
}

fn build_agent(
    provider: BackendProvider,
    api_key: &str,
    model: String,
    max_tokens: u32,
) -> Arc<dyn CompletionBackend> {
    match provider {
        BackendProvider::Gemini => {
            Arc::new(GeminiApiAgent::new(api_key, model).with_max_tokens(max_tokens))
        }
        BackendProvider::Claude => {
            Arc::new(ClaudeApiAgent::new(api_key, model).with_max_tokens(max_tokens))
        }
    }
}

/// Builds the resilient client described by the gateway configuration.
pub fn build_client(config: &GatewayConfig, api_key: &str) -> ResilientClient {
    let backend = &config.backend;
    let (primary_model, fallback_model) = resolve_models(backend);

    tracing::info!(
        "[Backend] {:?} primary={} fallback={}",
        backend.provider,
        primary_model,
        fallback_model.as_deref().unwrap_or("none")
    );

    let primary = build_agent(backend.provider, api_key, primary_model, backend.max_tokens);
    let client = ResilientClient::new(primary, RetryPolicy::from(&config.retry));

    match fallback_model {
        Some(model) => {
            client.with_fallback(build_agent(backend.provider, api_key, model, backend.max_tokens))
        }
        None => client,
    }
}
