//! Application layer for the Showroom gateway.
//!
//! Coordinates the domain rules in `showroom-core` with the backend client in
//! `showroom-interaction`: one [`Dispatcher`] per gateway, one
//! [`SessionHandle`] per connection.

pub mod dispatcher;
pub mod session;

pub use dispatcher::{Dispatcher, TurnOutcome, UNAVAILABLE_MESSAGE};
pub use session::{ReplySink, SessionHandle, new_session};
