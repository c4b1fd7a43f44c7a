//! Client error types.

use std::io;

use thiserror::Error;
use wireroom_proto::{FramingError, SendError};

/// Errors that can occur in the chat client or one-shot sender.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to the server failed.
    #[error("connection failed: {0}")]
    Connect(io::Error),

    /// Reading terminal input failed.
    #[error("terminal input failed: {0}")]
    Input(io::Error),

    /// Receiving frames from the server failed.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// Sending a frame to the server failed.
    #[error(transparent)]
    Send(#[from] SendError),
}
