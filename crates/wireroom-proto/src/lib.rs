//! Wire protocol for the wireroom chat service.
//!
//! Frames are lines of bytes terminated by a network newline (CRLF). The
//! codec operates on a (buffer, valid-length) pair and is deliberately
//! decoupled from connection identity so the server's per-session readers
//! and the client's server link drive the same machinery.
//!
//! # Components
//!
//! - [`FrameBuffer`]: bounded reassembly of frames from partial reads
//! - [`write_frame`]: terminate a payload and write it fully
//! - [`find_terminator`]: locate the end of the first buffered frame
//!
//! # Invariants
//!
//! - Buffered bytes never exceed [`MAX_FRAME`]; reaching the cap without a
//!   terminator is a hard [`FramingError::Overflow`], never truncation.
//! - Every frame written by [`write_frame`] carries exactly one terminator.
//! - Extraction leaves the unread remainder at offset zero, in order, with
//!   no byte lost or duplicated.

#![forbid(unsafe_code)]

mod codec;
mod errors;

pub use codec::{FrameBuffer, ReadOutcome, find_terminator, write_frame};
pub use errors::{FramingError, SendError};

/// Maximum payload bytes in one frame, terminator excluded.
pub const MAX_PAYLOAD: usize = 128;

/// Frame terminator: the network newline.
pub const TERMINATOR: &[u8; 2] = b"\r\n";

/// Maximum bytes in one complete frame, terminator included.
pub const MAX_FRAME: usize = MAX_PAYLOAD + TERMINATOR.len();
