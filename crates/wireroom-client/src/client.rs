//! Interactive chat session.
//!
//! Connect, take the assigned id from the server's first frame, then
//! multiplex terminal input against the socket until one side ends the
//! session. Outgoing lines carry a `client{id}:` prefix that counts
//! toward the payload budget.

use tokio::io::{AsyncRead, AsyncReadExt};
use wireroom_proto::{MAX_PAYLOAD, SendError};

use crate::{
    error::ClientError,
    input::LineSplitter,
    transport::{self, LinkReader, LinkWriter},
};

/// Read granularity for terminal input.
const INPUT_CHUNK: usize = 1024;

/// How a chat session ended.
///
/// Every variant is a clean exit: server disconnects and handshake
/// surprises are lifecycle events here, not process failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Terminal input reached end of file.
    InputClosed,
    /// The server closed the connection or sent an unrecoverable stream.
    ServerClosed,
    /// The server's first frame was not a decimal client id.
    HandshakeFailed,
}

/// Result of waiting for the server's id frame.
enum Handshake {
    Assigned(u64),
    Closed,
    Malformed,
}

/// Run an interactive chat session against `host:port`.
///
/// `input` is the user's terminal (the binary passes stdin; tests pass
/// scripted readers). Received messages go to standard output, one line
/// each; diagnostics go through `tracing`.
pub async fn run_chat<I>(host: &str, port: u16, mut input: I) -> Result<SessionEnd, ClientError>
where
    I: AsyncRead + Unpin,
{
    let (mut reader, mut writer) = transport::connect(host, port).await?;

    let client_id = match handshake(&mut reader).await? {
        Handshake::Assigned(id) => id,
        Handshake::Closed => {
            tracing::error!("server disconnected before assigning an id");
            return Ok(SessionEnd::ServerClosed);
        }
        Handshake::Malformed => {
            tracing::error!("server greeting was not a client id");
            return Ok(SessionEnd::HandshakeFailed);
        }
    };
    tracing::info!(client_id, "joined chat");

    let prefix = format!("client{client_id}:");
    let mut lines = LineSplitter::new(MAX_PAYLOAD - prefix.len());
    let mut chunk = [0u8; INPUT_CHUNK];

    loop {
        tokio::select! {
            read = input.read(&mut chunk) => {
                let n = read.map_err(ClientError::Input)?;
                if n == 0 {
                    // End of input: a final unterminated line still goes out.
                    if let Some(rest) = lines.flush() {
                        if !send_line(&mut writer, &prefix, &rest).await? {
                            return Ok(SessionEnd::ServerClosed);
                        }
                    }
                    return Ok(SessionEnd::InputClosed);
                }

                lines.push(&chunk[..n]);
                while let Some(line) = lines.next_line() {
                    if !send_line(&mut writer, &prefix, &line).await? {
                        return Ok(SessionEnd::ServerClosed);
                    }
                }
            }

            received = reader.recv_payload() => match received {
                Ok(Some(payload)) => display_message(&payload),
                Ok(None) => {
                    tracing::error!("server disconnected");
                    return Ok(SessionEnd::ServerClosed);
                }
                Err(ClientError::Framing(err)) => {
                    tracing::error!("unusable server stream: {err}");
                    return Ok(SessionEnd::ServerClosed);
                }
                Err(err) => return Err(err),
            },
        }
    }
}

/// Wait for the server's first frame and parse it as the assigned id.
async fn handshake(reader: &mut LinkReader) -> Result<Handshake, ClientError> {
    let payload = match reader.recv_payload().await {
        Ok(Some(payload)) => payload,
        Ok(None) => return Ok(Handshake::Closed),
        Err(ClientError::Framing(err)) => {
            tracing::error!("unusable server stream: {err}");
            return Ok(Handshake::Closed);
        }
        Err(err) => return Err(err),
    };

    Ok(match parse_client_id(&payload) {
        Some(id) => Handshake::Assigned(id),
        None => Handshake::Malformed,
    })
}

/// Parse an id-handshake payload: decimal digits, nothing else.
fn parse_client_id(payload: &[u8]) -> Option<u64> {
    std::str::from_utf8(payload).ok()?.trim().parse().ok()
}

/// Prefix and send one input line.
///
/// Returns `Ok(false)` when the server is gone - a clean end of session,
/// unlike a genuine write failure.
async fn send_line(
    writer: &mut LinkWriter,
    prefix: &str,
    line: &[u8],
) -> Result<bool, ClientError> {
    let mut payload = Vec::with_capacity(prefix.len() + line.len());
    payload.extend_from_slice(prefix.as_bytes());
    payload.extend_from_slice(line);

    match writer.send_payload(&payload).await {
        Ok(()) => Ok(true),
        Err(SendError::Disconnected) => {
            tracing::error!("server disconnected");
            Ok(false)
        }
        Err(err) => Err(ClientError::Send(err)),
    }
}

/// Show one received message to the user, with a trailing line break.
fn display_message(payload: &[u8]) {
    #[allow(clippy::print_stdout)] // chat content is user-facing output
    {
        println!("{}", String::from_utf8_lossy(payload));
    }
}
