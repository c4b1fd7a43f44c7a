//! CRLF frame reassembly and emission.
//!
//! [`FrameBuffer`] accumulates bytes from a stream transport until a
//! terminator arrives, then hands out complete payloads one at a time.
//! [`write_frame`] is the inverse: terminate a payload and push it through
//! the transport until fully flushed.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    MAX_FRAME, MAX_PAYLOAD, TERMINATOR,
    errors::{FramingError, SendError},
};

/// Outcome of folding one transport read into a [`FrameBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// At least one complete frame is buffered and ready for extraction.
    FrameReady,
    /// Bytes were buffered but no terminator has arrived yet.
    Partial,
    /// The peer closed the connection (zero-length read).
    PeerClosed,
}

/// Offset just past the first terminator in `buf`, if any.
///
/// Only the given slice is examined; a terminator split across the end of
/// the valid region is not matched until its second byte arrives.
#[must_use]
pub fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len())
        .position(|window| window == TERMINATOR.as_slice())
        .map(|at| at + TERMINATOR.len())
}

/// Bounded reassembly buffer for one direction of one connection.
///
/// Holds at most [`MAX_FRAME`] bytes. New bytes are appended after the
/// current valid region, never over it; extraction moves the remainder to
/// offset zero. Reaching the cap without a terminator is a protocol
/// violation and poisons nothing except this connection.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self { buf: BytesMut::with_capacity(MAX_FRAME) }
    }

    /// Number of valid buffered bytes.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True when no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one chunk of received bytes and classify the result.
    ///
    /// This is the pure accumulation step behind [`FrameBuffer::read_from`];
    /// it never performs I/O, so chunk-boundary behavior is directly
    /// testable. Callers feeding data by hand must keep chunks within the
    /// free capacity, as `read_from` does.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<ReadOutcome, FramingError> {
        self.buf.extend_from_slice(chunk);

        if find_terminator(&self.buf).is_some() {
            return Ok(ReadOutcome::FrameReady);
        }
        if self.buf.len() >= MAX_FRAME {
            return Err(FramingError::Overflow { buffered: self.buf.len() });
        }
        Ok(ReadOutcome::Partial)
    }

    /// Perform one transport read appended after the current valid bytes.
    ///
    /// Reads at most the free capacity, so buffered data is never
    /// overwritten. A zero-length read is reported as
    /// [`ReadOutcome::PeerClosed`]; complete frames buffered before the
    /// close remain extractable.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> Result<ReadOutcome, FramingError>
    where
        R: AsyncRead + Unpin,
    {
        if self.buf.len() >= MAX_FRAME {
            return Err(FramingError::Overflow { buffered: self.buf.len() });
        }

        let mut chunk = [0u8; MAX_FRAME];
        let free = MAX_FRAME - self.buf.len();
        let n = reader.read(&mut chunk[..free]).await?;
        if n == 0 {
            return Ok(ReadOutcome::PeerClosed);
        }
        self.ingest(&chunk[..n])
    }

    /// Pop exactly one complete frame, returning its payload without the
    /// terminator.
    ///
    /// The remainder (which may already contain further complete frames) is
    /// left at offset zero in arrival order. Returns `None` when no
    /// complete frame is buffered yet.
    pub fn extract(&mut self) -> Option<Bytes> {
        let end = find_terminator(&self.buf)?;
        let mut frame = self.buf.split_to(end);
        frame.truncate(end - TERMINATOR.len());
        Some(frame.freeze())
    }
}

/// Append the terminator to `payload` and write the frame fully.
///
/// Loops until every byte is flushed rather than failing on a short write.
/// A zero-length write outcome, broken pipe, or reset is reported as
/// [`SendError::Disconnected`] so callers can treat it as a lifecycle event
/// rather than a fault.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), SendError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_PAYLOAD {
        return Err(SendError::PayloadTooLarge { len: payload.len() });
    }
    if find_terminator(payload).is_some() {
        return Err(SendError::EmbeddedTerminator);
    }

    let mut frame = BytesMut::with_capacity(payload.len() + TERMINATOR.len());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(TERMINATOR.as_slice());

    if let Err(err) = writer.write_all(&frame).await {
        return Err(classify_write_error(err));
    }
    writer.flush().await.map_err(classify_write_error)
}

fn classify_write_error(err: std::io::Error) -> SendError {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::WriteZero
        | ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted => SendError::Disconnected,
        _ => SendError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_offset_is_one_past_the_newline() {
        assert_eq!(find_terminator(b"hi\r\n"), Some(4));
        assert_eq!(find_terminator(b"hi\r\nmore"), Some(4));
        assert_eq!(find_terminator(b"\r\n"), Some(2));
    }

    #[test]
    fn terminator_requires_both_bytes() {
        assert_eq!(find_terminator(b"hi"), None);
        assert_eq!(find_terminator(b"hi\r"), None);
        assert_eq!(find_terminator(b"hi\n"), None);
        assert_eq!(find_terminator(b""), None);
    }

    #[test]
    fn partial_then_ready() {
        let mut buf = FrameBuffer::new();
        assert!(matches!(buf.ingest(b"hel"), Ok(ReadOutcome::Partial)));
        assert!(matches!(buf.ingest(b"lo\r"), Ok(ReadOutcome::Partial)));
        assert!(matches!(buf.ingest(b"\n"), Ok(ReadOutcome::FrameReady)));
        assert_eq!(buf.extract().unwrap(), Bytes::from_static(b"hello"));
        assert!(buf.is_empty());
    }

    #[test]
    fn extraction_preserves_the_remainder() {
        let mut buf = FrameBuffer::new();
        assert!(matches!(buf.ingest(b"one\r\ntw"), Ok(ReadOutcome::FrameReady)));

        assert_eq!(buf.extract().unwrap(), Bytes::from_static(b"one"));
        assert_eq!(buf.buffered(), 2);
        assert!(buf.extract().is_none());

        assert!(matches!(buf.ingest(b"o\r\n"), Ok(ReadOutcome::FrameReady)));
        assert_eq!(buf.extract().unwrap(), Bytes::from_static(b"two"));
    }

    #[test]
    fn pipelined_frames_extract_in_arrival_order() {
        let mut buf = FrameBuffer::new();
        assert!(matches!(buf.ingest(b"a\r\nb\r\nc\r\n"), Ok(ReadOutcome::FrameReady)));
        assert_eq!(buf.extract().unwrap(), Bytes::from_static(b"a"));
        assert_eq!(buf.extract().unwrap(), Bytes::from_static(b"b"));
        assert_eq!(buf.extract().unwrap(), Bytes::from_static(b"c"));
        assert!(buf.extract().is_none());
    }

    #[test]
    fn empty_frame_extracts_as_empty_payload() {
        let mut buf = FrameBuffer::new();
        assert!(matches!(buf.ingest(b"\r\n"), Ok(ReadOutcome::FrameReady)));
        assert_eq!(buf.extract().unwrap(), Bytes::new());
    }

    #[test]
    fn cap_without_terminator_is_an_overflow() {
        let mut buf = FrameBuffer::new();
        let body = vec![b'x'; MAX_FRAME - 1];
        assert!(matches!(buf.ingest(&body), Ok(ReadOutcome::Partial)));

        match buf.ingest(b"y") {
            Err(FramingError::Overflow { buffered }) => assert_eq!(buffered, MAX_FRAME),
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn maximum_frame_still_fits() {
        let mut buf = FrameBuffer::new();
        let mut wire = vec![b'A'; MAX_PAYLOAD];
        wire.extend_from_slice(TERMINATOR.as_slice());

        assert!(matches!(buf.ingest(&wire), Ok(ReadOutcome::FrameReady)));
        assert_eq!(buf.extract().unwrap().len(), MAX_PAYLOAD);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn read_from_reports_close_after_drained_input() {
        let wire = b"ping\r\n";
        let mut reader = &wire[..];
        let mut buf = FrameBuffer::new();

        assert!(matches!(buf.read_from(&mut reader).await, Ok(ReadOutcome::FrameReady)));
        assert_eq!(buf.extract().unwrap(), Bytes::from_static(b"ping"));
        assert!(matches!(buf.read_from(&mut reader).await, Ok(ReadOutcome::PeerClosed)));
    }

    #[tokio::test]
    async fn write_frame_appends_exactly_one_terminator() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").await.unwrap();
        assert_eq!(wire, b"hello\r\n");
    }

    #[tokio::test]
    async fn write_frame_rejects_oversized_payloads() {
        let mut wire = Vec::new();
        let payload = vec![b'z'; MAX_PAYLOAD + 1];
        assert!(matches!(
            write_frame(&mut wire, &payload).await,
            Err(SendError::PayloadTooLarge { len }) if len == MAX_PAYLOAD + 1
        ));
        assert!(wire.is_empty());
    }

    #[tokio::test]
    async fn write_frame_rejects_embedded_terminators() {
        let mut wire = Vec::new();
        assert!(matches!(
            write_frame(&mut wire, b"he\r\nllo").await,
            Err(SendError::EmbeddedTerminator)
        ));
        assert!(wire.is_empty());
    }
}
