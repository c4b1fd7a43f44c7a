//! Server error types.

use std::fmt;

use crate::driver::DriverError;

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, bad arguments).
    ///
    /// Fatal before startup; fix configuration and restart.
    Config(String),

    /// Transport error (bind or accept-path failure, socket I/O).
    ///
    /// Fatal only when it concerns the listening endpoint itself; a
    /// per-connection failure tears down that one session.
    Transport(String),

    /// The control channel failed with something other than end-of-file.
    ///
    /// End-of-file on the control channel is orderly shutdown, not an
    /// error; anything else is unrecoverable for the event loop.
    Control(String),

    /// Driver error (from `ServerDriver` processing).
    Driver(DriverError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Control(msg) => write!(f, "control channel error: {msg}"),
            Self::Driver(err) => write!(f, "driver error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Driver(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriverError> for ServerError {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
