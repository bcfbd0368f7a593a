//! Per-connection session state.
//!
//! # Module Structure
//!
//! - `message`: Conversation turn types (`TurnRole`, `Turn`)
//! - `state`: The session state machine (`Session`, `FocusState`)

mod message;
mod state;

#[cfg(test)]
mod state_test;

pub use message::{Turn, TurnRole};
pub use state::{FocusState, Session};
