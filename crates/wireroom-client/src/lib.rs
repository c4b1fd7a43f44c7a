//! Wireroom chat client.
//!
//! Two ways to talk to a server:
//!
//! - [`run_chat`]: interactive session - receive the assigned id,
//!   multiplex terminal input against the socket, display incoming
//!   messages.
//! - [`send_once`]: one-shot sender - connect, deliver one message, exit.
//!
//! The transport layer ([`transport`]) is split into reader/writer halves
//! around the shared framing codec; [`LineSplitter`] budgets terminal
//! input to the wire payload limit.

#![forbid(unsafe_code)]

mod client;
mod error;
mod input;
mod sender;
pub mod transport;

pub use client::{SessionEnd, run_chat};
pub use error::ClientError;
pub use input::LineSplitter;
pub use sender::send_once;
