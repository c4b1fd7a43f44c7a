//! Wireroom chat server.
//!
//! A single flat broadcast room over TCP with CRLF-framed messages. The
//! crate splits along the same seam as the rest of the workspace: the
//! [`ServerDriver`] is pure event→action logic with no I/O, and the
//! [`Server`] runtime here executes its actions against real sockets on
//! the Tokio runtime.
//!
//! # Architecture
//!
//! One event-loop task owns the driver, the registry, and the write half
//! of every client socket. Each accepted connection gets a reader task
//! that owns that connection's receive buffer and feeds complete frames
//! into the loop over a bounded channel. The loop multiplexes three
//! sources: the listening endpoint, the control channel, and the frame
//! queue. Because every write to a given session happens serially on the
//! loop task, broadcast delivery to one receiver is never interleaved
//! with partial frames.
//!
//! # Shutdown
//!
//! The control channel handed to [`Server::run`] is the only shutdown
//! signal: end-of-file means "stop". The packaged binary wires it to its
//! own standard input, so closing the pipe that spawned the server shuts
//! it down cleanly.

#![forbid(unsafe_code)]

mod driver;
mod error;
mod registry;
mod transport;

use std::collections::HashMap;

use bytes::Bytes;
pub use driver::{DriverConfig, DriverError, ServerAction, ServerDriver, ServerEvent};
pub use error::ServerError;
pub use registry::{ConnectionRegistry, SessionId, SessionInfo};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
    sync::mpsc,
    task::JoinHandle,
};
pub use transport::TcpTransport;
use wireroom_proto::{FrameBuffer, FramingError, ReadOutcome, SendError, write_frame};

/// In-flight events the reader tasks may queue before backpressure.
const EVENT_QUEUE_DEPTH: usize = 256;

/// Server configuration for the runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g. "0.0.0.0:7474")
    pub bind_address: String,
    /// Driver configuration (admission cap)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:7474".to_owned(), driver: DriverConfig::default() }
    }
}

/// Socket halves the runtime holds per live session.
///
/// Kept in lockstep with the driver's registry: an id is registered there
/// iff its entry is here. [`remove`](SessionTable::remove) drops the write
/// half (closing the socket) and stops the reader.
struct SessionEntry {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

#[derive(Default)]
struct SessionTable {
    entries: HashMap<SessionId, SessionEntry>,
}

impl SessionTable {
    fn insert(&mut self, session_id: SessionId, writer: OwnedWriteHalf, reader: JoinHandle<()>) {
        self.entries.insert(session_id, SessionEntry { writer, reader });
    }

    fn writer(&mut self, session_id: SessionId) -> Option<&mut OwnedWriteHalf> {
        self.entries.get_mut(&session_id).map(|entry| &mut entry.writer)
    }

    fn remove(&mut self, session_id: SessionId) {
        if let Some(entry) = self.entries.remove(&session_id) {
            entry.reader.abort();
        }
    }

    fn shutdown(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.reader.abort();
        }
    }
}

/// Production wireroom server.
///
/// Wraps the [`ServerDriver`] with the TCP transport and the event loop.
pub struct Server {
    driver: ServerDriver,
    transport: TcpTransport,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let transport = TcpTransport::bind(&config.bind_address).await?;
        Ok(Self { driver: ServerDriver::new(config.driver), transport })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Run the server until the control channel closes.
    ///
    /// Returns `Ok(())` on orderly shutdown (control end-of-file) and an
    /// error only for unrecoverable multiplexing failure. Per-session
    /// faults never end the loop. On exit every client socket, the
    /// listening endpoint, and the control channel are released.
    pub async fn run<C>(self, mut control: C) -> Result<(), ServerError>
    where
        C: AsyncRead + Unpin,
    {
        let Self { mut driver, transport } = self;

        let (events_tx, mut events) = mpsc::channel::<ServerEvent>(EVENT_QUEUE_DEPTH);
        let mut sessions = SessionTable::default();
        let mut next_session_id: SessionId = 0;
        let mut control_buf = [0u8; 32];

        let outcome = loop {
            tokio::select! {
                accepted = transport.accept() => match accepted {
                    Ok((stream, peer)) => {
                        // Ids are monotonic and never reused, even when the
                        // session is refused or dies during the handshake.
                        next_session_id += 1;
                        let session_id = next_session_id;

                        let (read_half, write_half) = stream.into_split();
                        let reader = tokio::spawn(run_session_reader(
                            session_id,
                            read_half,
                            events_tx.clone(),
                        ));
                        sessions.insert(session_id, write_half, reader);

                        dispatch_event(
                            &mut driver,
                            &mut sessions,
                            ServerEvent::ConnectionAccepted { session_id, peer },
                        )
                        .await;
                    }
                    Err(err) => tracing::error!("accept failed: {err}"),
                },

                read = control.read(&mut control_buf) => match read {
                    // End-of-file: the owning process wants shutdown.
                    Ok(0) => break Ok(()),
                    // Stray bytes on the control channel are drained and ignored.
                    Ok(_) => {}
                    Err(err) => break Err(ServerError::Control(err.to_string())),
                },

                event = events.recv() => {
                    // The loop holds a sender clone, so the queue never closes
                    // from under us.
                    if let Some(event) = event {
                        dispatch_event(&mut driver, &mut sessions, event).await;
                    }
                },
            }
        };

        sessions.shutdown();
        tracing::info!("server stopped");
        outcome
    }
}

/// Feed one event through the driver and execute the resulting actions.
async fn dispatch_event(driver: &mut ServerDriver, sessions: &mut SessionTable, event: ServerEvent) {
    // The runtime half of session teardown; the driver half happens in its
    // ConnectionClosed handler. Both halves always run together.
    if let ServerEvent::ConnectionClosed { session_id, .. } = &event {
        sessions.remove(*session_id);
    }

    match driver.process_event(event) {
        Ok(actions) => execute_actions(driver, sessions, actions).await,
        Err(err) => tracing::debug!("event dropped: {err}"),
    }
}

/// Execute driver actions against the real sockets.
async fn execute_actions(
    driver: &mut ServerDriver,
    sessions: &mut SessionTable,
    actions: Vec<ServerAction>,
) {
    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, payload } => {
                send_or_remove(driver, sessions, session_id, &payload).await;
            }

            ServerAction::Broadcast { payload } => {
                // Capture the order before sending anything: a failed
                // destination is removed mid-pass and delivery continues
                // with the rest.
                for session_id in driver.broadcast_order() {
                    send_or_remove(driver, sessions, session_id, &payload).await;
                }
            }

            ServerAction::DisplayMessage { payload } => {
                #[allow(clippy::print_stdout)] // chat content is operator output
                {
                    println!("{}", String::from_utf8_lossy(&payload));
                }
            }

            ServerAction::CloseSession { session_id, reason } => {
                remove_session(driver, sessions, session_id, &reason);
            }
        }
    }
}

/// Send one frame to one session, removing the session on failure.
async fn send_or_remove(
    driver: &mut ServerDriver,
    sessions: &mut SessionTable,
    session_id: SessionId,
    payload: &Bytes,
) {
    let Some(writer) = sessions.writer(session_id) else {
        return;
    };

    match write_frame(writer, payload).await {
        Ok(()) => {}
        Err(SendError::Disconnected) => {
            tracing::debug!(session_id, "peer disconnected during send");
            remove_session(driver, sessions, session_id, "peer disconnected");
        }
        Err(err) => {
            tracing::warn!(session_id, "send failed: {err}");
            remove_session(driver, sessions, session_id, "write failure");
        }
    }
}

/// Tear a session down: runtime half (sockets, reader task) and driver half
/// (registry) together.
fn remove_session(
    driver: &mut ServerDriver,
    sessions: &mut SessionTable,
    session_id: SessionId,
    reason: &str,
) {
    sessions.remove(session_id);

    match driver.process_event(ServerEvent::ConnectionClosed {
        session_id,
        reason: reason.to_owned(),
    }) {
        Ok(actions) => debug_assert!(actions.is_empty()),
        Err(err) => tracing::debug!(session_id, "close bookkeeping: {err}"),
    }
}

/// Per-connection read path.
///
/// Owns this connection's receive buffer. Complete frames go to the event
/// loop in arrival order; the task ends on peer close, protocol violation,
/// or read failure, always with a final `ConnectionClosed` event.
async fn run_session_reader(
    session_id: SessionId,
    mut read_half: OwnedReadHalf,
    events: mpsc::Sender<ServerEvent>,
) {
    let mut buf = FrameBuffer::new();

    loop {
        match buf.read_from(&mut read_half).await {
            Ok(ReadOutcome::FrameReady) => {
                if !deliver_frames(session_id, &mut buf, &events).await {
                    return;
                }
            }
            Ok(ReadOutcome::Partial) => {}
            Ok(ReadOutcome::PeerClosed) => {
                // Frames fully buffered before the close still count.
                if !deliver_frames(session_id, &mut buf, &events).await {
                    return;
                }
                let _ = events
                    .send(ServerEvent::ConnectionClosed {
                        session_id,
                        reason: "peer disconnected".to_owned(),
                    })
                    .await;
                return;
            }
            Err(FramingError::Overflow { buffered }) => {
                tracing::warn!(session_id, buffered, "oversized frame; disconnecting client");
                let _ = events
                    .send(ServerEvent::ConnectionClosed {
                        session_id,
                        reason: "protocol violation: oversized frame".to_owned(),
                    })
                    .await;
                return;
            }
            Err(FramingError::Io(err)) => {
                tracing::debug!(session_id, "read failed: {err}");
                let _ = events
                    .send(ServerEvent::ConnectionClosed {
                        session_id,
                        reason: format!("read failure: {err}"),
                    })
                    .await;
                return;
            }
        }
    }
}

/// Drain every complete buffered frame into the event queue.
///
/// Returns `false` when the event loop is gone (shutdown in progress).
async fn deliver_frames(
    session_id: SessionId,
    buf: &mut FrameBuffer,
    events: &mpsc::Sender<ServerEvent>,
) -> bool {
    while let Some(payload) = buf.extract() {
        if events.send(ServerEvent::FrameReceived { session_id, payload }).await.is_err() {
            return false;
        }
    }
    true
}
