//! TCP link to a wireroom server.
//!
//! A thin layer over the socket: connect, then receive frames through the
//! codec and send payloads through it. Protocol decisions (handshake,
//! prefixing, display) stay in the session logic.
//!
//! The link is split into a reader and a writer half so a session can
//! multiplex receiving against sending without sharing a borrow.

use bytes::Bytes;
use tokio::net::{
    TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use wireroom_proto::{FrameBuffer, ReadOutcome, SendError, write_frame};

use crate::error::ClientError;

/// Receiving half of the server link: socket read half plus its own
/// reassembly buffer.
pub struct LinkReader {
    reader: OwnedReadHalf,
    buf: FrameBuffer,
}

/// Sending half of the server link.
pub struct LinkWriter {
    writer: OwnedWriteHalf,
}

/// Connect to a server, resolving `host` when it is a name.
pub async fn connect(host: &str, port: u16) -> Result<(LinkReader, LinkWriter), ClientError> {
    let stream = TcpStream::connect((host, port)).await.map_err(ClientError::Connect)?;
    let (reader, writer) = stream.into_split();
    tracing::debug!("connected to {host}:{port}");

    Ok((LinkReader { reader, buf: FrameBuffer::new() }, LinkWriter { writer }))
}

impl LinkReader {
    /// Receive the next non-empty payload.
    ///
    /// Zero-length frames are skipped. `Ok(None)` means the server closed
    /// the connection; an oversized or broken inbound stream surfaces as
    /// [`ClientError::Framing`]. Cancellation-safe: the buffer keeps
    /// whatever arrived, and the next call resumes from it.
    pub async fn recv_payload(&mut self) -> Result<Option<Bytes>, ClientError> {
        loop {
            while let Some(payload) = self.buf.extract() {
                if !payload.is_empty() {
                    return Ok(Some(payload));
                }
            }

            match self.buf.read_from(&mut self.reader).await? {
                ReadOutcome::FrameReady | ReadOutcome::Partial => {}
                // Any complete frames were drained above; what remains is at
                // most a partial frame that can never finish.
                ReadOutcome::PeerClosed => return Ok(None),
            }
        }
    }
}

impl LinkWriter {
    /// Frame and send one payload, flushing fully.
    pub async fn send_payload(&mut self, payload: &[u8]) -> Result<(), SendError> {
        write_frame(&mut self.writer, payload).await
    }
}
