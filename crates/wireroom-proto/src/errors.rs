//! Error types for the framing codec.
//!
//! Receive-side and send-side failures are separate enums because their
//! consumers differ: a [`FramingError`] ends one connection's read path,
//! while a [`SendError`] decides whether a destination is removed from a
//! broadcast. Transport failure and buffer exhaustion are distinct variants
//! rather than one merged code; the distinction is load-bearing for logging
//! and for tests.

use std::io;

use thiserror::Error;

/// Failure while reassembling frames from a transport.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The transport read itself failed.
    #[error("transport read failed: {0}")]
    Io(#[from] io::Error),

    /// The buffer reached the maximum frame size without a terminator.
    ///
    /// Fatal to the connection: the peer is violating the protocol and no
    /// amount of further reading can produce a valid frame.
    #[error("no terminator within the maximum frame size ({buffered} bytes buffered)")]
    Overflow {
        /// Bytes held when the cap was hit.
        buffered: usize,
    },
}

/// Failure while writing one terminated frame.
#[derive(Debug, Error)]
pub enum SendError {
    /// The payload does not fit in one frame.
    #[error("payload is {len} bytes, over the per-frame limit")]
    PayloadTooLarge {
        /// Actual payload length.
        len: usize,
    },

    /// The payload contains the frame terminator.
    #[error("payload contains the frame terminator")]
    EmbeddedTerminator,

    /// The peer is gone: zero-length write, broken pipe, or reset.
    ///
    /// A normal lifecycle event for the caller, not a fault.
    #[error("peer disconnected")]
    Disconnected,

    /// Any other transport write failure.
    #[error("transport write failed: {0}")]
    Io(io::Error),
}
