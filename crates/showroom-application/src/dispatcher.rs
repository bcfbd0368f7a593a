//! Routes inbound frames to intent extraction or a streamed conversational
//! turn, and emits the replies.

use crate::session::{ReplySink, SessionHandle};
use futures::StreamExt;
use serde_json::Value;
use showroom_core::config::PromptConfig;
use showroom_core::intent::{
    MATERIAL_SCHEMA_HINT, MaterialIntent, PRODUCT_SCHEMA_HINT, ProductIntent,
    normalize_material_intent, normalize_product_intent, signals_material_change,
    signals_replacement,
};
use showroom_core::protocol::{
    ControlTag, Inbound, Reply, TagEffect, is_tag_only, parse_inbound, strip_leading_tag,
};
use showroom_core::record::{encode_material, encode_product};
use showroom_interaction::{ResilientClient, StreamEvent, StreamRequest, StructuredRequest};
use std::sync::Arc;

/// Sent as `ERROR|...` when no backend could produce a reply.
pub const UNAVAILABLE_MESSAGE: &str = "The assistant is temporarily unavailable. Please try again.";

/// How a conversational turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Focus was cleared; nothing was sent.
    FocusCleared,
    /// Another turn was in flight; the message was dropped.
    Dropped,
    /// The message had no text.
    Ignored,
    /// A final reply was sent (possibly cut short by a mid-stream failure).
    Replied { text: String, interrupted: bool },
    /// No backend produced any text; an error reply was sent.
    Failed,
}

/// Per-gateway message dispatcher. Cheap to clone; holds no per-connection
/// state.
#[derive(Clone)]
pub struct Dispatcher {
    client: ResilientClient,
    prompts: Arc<PromptConfig>,
}

impl Dispatcher {
    pub fn new(client: ResilientClient, prompts: PromptConfig) -> Self {
        Self {
            client,
            prompts: Arc::new(prompts),
        }
    }

    /// Handles one inbound frame. Unrecognized frames are ignored silently.
    pub async fn handle_frame(&self, session: &SessionHandle, frame: &str, sink: &dyn ReplySink) {
        let Some(inbound) = parse_inbound(frame) else {
            tracing::debug!("[Dispatcher] Ignoring unrecognized frame ({} bytes)", frame.len());
            return;
        };
        tracing::debug!("[Dispatcher] {} message", inbound.kind());

        match inbound {
            Inbound::Spec(text) | Inbound::MatSpec(text) if text.trim().is_empty() => {
                tracing::debug!("[Dispatcher] Ignoring intent request with empty payload");
            }
            Inbound::Spec(text) => {
                let intent = self.extract_product(&text).await;
                sink.send(Reply::Spec(encode_product(&intent)));
            }
            Inbound::MatSpec(text) => {
                let intent = self.extract_material(&text).await;
                sink.send(Reply::MatSpec(encode_material(&intent)));
            }
            Inbound::User(text) => {
                self.conversational_turn(session, &text, sink).await;
            }
        }
    }

    /// Product intent for `text`, falling back to rule-based extraction when
    /// the backend gives nothing usable.
    pub async fn extract_product(&self, text: &str) -> ProductIntent {
        let raw = self
            .structured(&self.prompts.product, PRODUCT_SCHEMA_HINT, text)
            .await;
        normalize_product_intent(text, &raw)
    }

    /// Material intent for `text`, with the same fallback behaviour.
    pub async fn extract_material(&self, text: &str) -> MaterialIntent {
        let raw = self
            .structured(&self.prompts.material, MATERIAL_SCHEMA_HINT, text)
            .await;
        normalize_material_intent(text, &raw)
    }

    async fn structured(&self, system: &str, schema_hint: &str, text: &str) -> Value {
        let user_text = strip_leading_tag(text);
        if user_text.is_empty() {
            return Value::Object(Default::default());
        }
        let request = StructuredRequest {
            system: system.to_string(),
            user_text: user_text.to_string(),
            schema_hint: schema_hint.to_string(),
        };
        self.client.complete_structured(&request).await.into_object()
    }

    /// Runs one conversational turn, then any follow-up extraction the turn
    /// calls for while an item is focused.
    pub async fn conversational_turn(
        &self,
        session: &SessionHandle,
        text: &str,
        sink: &dyn ReplySink,
    ) -> TurnOutcome {
        let tag = ControlTag::parse_leading(text).map(|(tag, _)| tag);

        let history = {
            let mut state = session.lock().await;
            match tag.map(ControlTag::effect) {
                Some(TagEffect::ClearFocus) => {
                    state.clear_focus();
                    tracing::debug!("[Dispatcher] Focus cleared by {:?}", tag);
                    return TurnOutcome::FocusCleared;
                }
                Some(TagEffect::SetFocus) => state.focus(),
                Some(TagEffect::ToneOnly) | None => {}
            }

            if text.trim().is_empty() {
                return TurnOutcome::Ignored;
            }

            match state.try_begin_turn() {
                Some(history) => history,
                None => {
                    tracing::debug!("[Dispatcher] Reply in flight, dropping message");
                    return TurnOutcome::Dropped;
                }
            }
        };

        let request = StreamRequest {
            system: self.chat_system_prompt(tag),
            history,
            user_text: text.to_string(),
        };
        let outcome = self.stream_reply(request, sink).await;

        let focused = {
            let mut state = session.lock().await;
            match &outcome {
                TurnOutcome::Replied { text: reply, .. } => {
                    state.complete_turn(text, Some(reply.as_str()))
                }
                _ => state.complete_turn(text, None),
            }
            state.is_focused()
        };

        if focused && !is_tag_only(text) {
            self.follow_up(text, sink).await;
        }

        outcome
    }

    async fn stream_reply(&self, request: StreamRequest, sink: &dyn ReplySink) -> TurnOutcome {
        let mut events = self.client.complete_streamed(request);
        let mut full_text = String::new();
        let mut interrupted = false;

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Fragment(fragment) => {
                    full_text.push_str(&fragment);
                    sink.send(Reply::Chunk(fragment));
                }
                StreamEvent::Interrupted(err) => {
                    tracing::warn!(
                        "[Dispatcher] Reply cut short after {} bytes: {}",
                        full_text.len(),
                        err
                    );
                    interrupted = true;
                }
                StreamEvent::Unavailable(err) => {
                    tracing::error!("[Dispatcher] No reply could be generated: {}", err);
                    sink.send(Reply::Error(UNAVAILABLE_MESSAGE.to_string()));
                    return TurnOutcome::Failed;
                }
            }
        }

        if full_text.is_empty() {
            sink.send(Reply::Error(UNAVAILABLE_MESSAGE.to_string()));
            return TurnOutcome::Failed;
        }

        sink.send(Reply::Final(full_text.clone()));
        TurnOutcome::Replied {
            text: full_text,
            interrupted,
        }
    }

    /// Material changes take priority over replacement requests.
    async fn follow_up(&self, text: &str, sink: &dyn ReplySink) {
        if signals_material_change(text) {
            tracing::debug!("[Dispatcher] Follow-up: material change");
            let intent = self.extract_material(text).await;
            sink.send(Reply::MatSpec(encode_material(&intent)));
        } else if signals_replacement(text) {
            tracing::debug!("[Dispatcher] Follow-up: replacement");
            let intent = self.extract_product(text).await;
            sink.send(Reply::Spec(encode_product(&intent)));
        }
    }

    fn chat_system_prompt(&self, tag: Option<ControlTag>) -> String {
        match tag.and_then(ControlTag::tone_hint) {
            Some(hint) => format!("{}\n\n{}", self.prompts.chat, hint),
            None => self.prompts.chat.clone(),
        }
    }
}
