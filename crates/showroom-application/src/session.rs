//! Connection-scoped session handle and the outbound reply seam.

use showroom_core::protocol::Reply;
use showroom_core::session::Session;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Shared handle to one connection's session. The lock is only held for
/// state transitions, never across a backend call.
pub type SessionHandle = Arc<Mutex<Session>>;

pub fn new_session(max_turn_pairs: usize) -> SessionHandle {
    Arc::new(Mutex::new(Session::new(max_turn_pairs)))
}

/// Destination for outbound replies.
///
/// Sending after the connection closed is a no-op.
pub trait ReplySink: Send + Sync {
    fn send(&self, reply: Reply);
}

impl ReplySink for mpsc::UnboundedSender<Reply> {
    fn send(&self, reply: Reply) {
        if mpsc::UnboundedSender::send(self, reply).is_err() {
            tracing::trace!("[Dispatcher] Connection closed, reply discarded");
        }
    }
}
