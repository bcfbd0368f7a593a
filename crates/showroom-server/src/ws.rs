//! WebSocket surface: one session per socket.

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{Sink, SinkExt, Stream, StreamExt};
use showroom_application::{Dispatcher, SessionHandle, new_session};
use showroom_core::protocol::Reply;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

/// State shared by every connection.
pub struct GatewayState {
    pub dispatcher: Dispatcher,
    pub max_turn_pairs: usize,
}

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>) {
    let session = new_session(state.max_turn_pairs);
    let session_id = session.lock().await.id();
    let span = tracing::info_span!("session", id = %session_id);
    let (outbound, inbound) = socket.split();
    serve_connection(outbound, inbound, state, session)
        .instrument(span)
        .await;
}

/// Reads frames until the socket closes. Each frame is handled on its own
/// task so a long-running turn does not hold up intent requests; replies are
/// funnelled through a single writer task.
async fn serve_connection<W, R, E>(
    mut outbound: W,
    mut inbound: R,
    state: Arc<GatewayState>,
    session: SessionHandle,
) where
    W: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    tracing::info!("[Gateway] Connection opened");

    let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();

    let writer = tokio::spawn(
        async move {
            while let Some(reply) = rx.recv().await {
                if outbound.send(Message::Text(reply.to_string())).await.is_err() {
                    tracing::debug!("[Gateway] Write failed, stopping writer");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let mut tasks = JoinSet::new();
    let mut frames = 0usize;

    while let Some(message) = inbound.next().await {
        match message {
            Ok(Message::Text(frame)) => {
                frames += 1;
                let dispatcher = state.dispatcher.clone();
                let session = Arc::clone(&session);
                let tx = tx.clone();
                tasks.spawn(
                    async move {
                        dispatcher.handle_frame(&session, &frame, &tx).await;
                    }
                    .in_current_span(),
                );
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!("[Gateway] Read error: {}", err);
                break;
            }
        }

        while let Some(result) = tasks.try_join_next() {
            if let Err(err) = result {
                tracing::error!("[Gateway] Frame handler failed: {}", err);
            }
        }
    }

    tasks.abort_all();
    writer.abort();
    tracing::info!("[Gateway] Connection closed after {} frame(s)", frames);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::channel::mpsc as channel;
    use futures::stream::{self, BoxStream};
    use showroom_core::config::{GatewayConfig, PromptConfig};
    use showroom_interaction::{
        BackendError, CompletionBackend, FragmentStream, ResilientClient, RetryPolicy,
        StreamRequest, StructuredRequest, build_client,
    };
    use std::convert::Infallible;

    fn test_state() -> Arc<GatewayState> {
        let config = GatewayConfig::default();
        let client = build_client(&config, "test-key");
        Arc::new(GatewayState {
            dispatcher: Dispatcher::new(client, config.prompts.clone()),
            max_turn_pairs: config.session.max_turn_pairs,
        })
    }

    /// Streams `fragments` for every turn; `None` never finishes.
    struct ScriptedBackend {
        fragments: Option<Vec<&'static str>>,
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete_json(&self, _request: &StructuredRequest) -> Result<String, BackendError> {
            Ok("{}".to_string())
        }

        async fn open_stream(&self, _request: &StreamRequest) -> Result<FragmentStream, BackendError> {
            let fragments: BoxStream<'static, Result<String, BackendError>> = match &self.fragments {
                Some(fragments) => {
                    let items: Vec<Result<String, BackendError>> =
                        fragments.iter().map(|f| Ok(f.to_string())).collect();
                    stream::iter(items).boxed()
                }
                None => stream::pending().boxed(),
            };
            Ok(fragments)
        }
    }

    fn scripted_state(fragments: Option<Vec<&'static str>>) -> Arc<GatewayState> {
        let client = ResilientClient::new(
            Arc::new(ScriptedBackend { fragments }),
            RetryPolicy::immediate(1),
        );
        Arc::new(GatewayState {
            dispatcher: Dispatcher::new(client, PromptConfig::default()),
            max_turn_pairs: 4,
        })
    }

    fn text(frame: &str) -> Result<Message, Infallible> {
        Ok(Message::Text(frame.to_string()))
    }

    #[tokio::test]
    async fn test_user_frame_round_trip() {
        let (in_tx, in_rx) = channel::unbounded::<Result<Message, Infallible>>();
        let (out_tx, mut out_rx) = channel::unbounded::<Message>();
        let connection = tokio::spawn(serve_connection(
            out_tx,
            in_rx,
            scripted_state(Some(vec!["Hello ", "there"])),
            new_session(4),
        ));

        in_tx.unbounded_send(text("USER|hi")).unwrap();
        for expected in ["CHUNK|Hello ", "CHUNK|there", "FINAL|Hello there"] {
            assert_eq!(out_rx.next().await, Some(Message::Text(expected.to_string())));
        }

        in_tx.unbounded_send(Ok(Message::Close(None))).unwrap();
        connection.await.unwrap();
        assert_eq!(out_rx.next().await, None);
    }

    #[tokio::test]
    async fn test_close_aborts_in_flight_turn() {
        let (in_tx, in_rx) = channel::unbounded::<Result<Message, Infallible>>();
        let (out_tx, mut out_rx) = channel::unbounded::<Message>();
        let connection = tokio::spawn(serve_connection(
            out_tx,
            in_rx,
            scripted_state(None),
            new_session(4),
        ));

        in_tx.unbounded_send(text("USER|tell me everything")).unwrap();
        in_tx.unbounded_send(text("NOT_A_FRAME")).unwrap();
        in_tx.unbounded_send(Ok(Message::Close(None))).unwrap();

        // the turn never finishes on its own; returning means it was aborted
        connection.await.unwrap();
        assert_eq!(out_rx.next().await, None);
    }

    #[tokio::test]
    async fn test_dropped_socket_ends_connection() {
        let (in_tx, in_rx) = channel::unbounded::<Result<Message, Infallible>>();
        let (out_tx, mut out_rx) = channel::unbounded::<Message>();
        let connection = tokio::spawn(serve_connection(
            out_tx,
            in_rx,
            scripted_state(None),
            new_session(4),
        ));

        drop(in_tx);
        connection.await.unwrap();
        assert_eq!(out_rx.next().await, None);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router(test_state())).await.unwrap();
        });

        let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        let response = reqwest::get(format!("http://{addr}/missing")).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);

        server.abort();
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router(test_state())).await.unwrap();
        });

        let response = reqwest::get(format!("http://{addr}/ws")).await.unwrap();
        assert!(response.status().is_client_error());

        server.abort();
    }
}
