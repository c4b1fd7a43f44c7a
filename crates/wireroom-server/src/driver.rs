//! Server driver.
//!
//! Pure event→action chat logic: session admission, the id handshake, the
//! in-band status query, and broadcast routing. The driver performs no I/O;
//! the runtime in `lib.rs` feeds it [`ServerEvent`]s and executes the
//! [`ServerAction`]s it returns. That keeps every protocol decision unit
//! testable without a socket.

use std::net::SocketAddr;

use bytes::Bytes;
use thiserror::Error;

use crate::registry::{ConnectionRegistry, SessionId, SessionInfo};

/// Literal token that, after the first `:`, requests the live client count
/// instead of a broadcast.
const CONNECTED_QUERY: &[u8] = b"\\connected";

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum concurrent clients; sessions over the cap are closed right
    /// after accept.
    pub max_clients: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_clients: 10_000 }
    }
}

/// Events the driver processes, produced by the runtime.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted and its reader/writer are held.
    ConnectionAccepted {
        /// Monotonic id minted by the runtime for this connection.
        session_id: SessionId,
        /// Remote address.
        peer: SocketAddr,
    },

    /// One complete frame arrived from a session.
    FrameReceived {
        /// Session the frame arrived on.
        session_id: SessionId,
        /// Frame payload, terminator stripped.
        payload: Bytes,
    },

    /// A session's read path ended (peer close, violation, read failure).
    ConnectionClosed {
        /// Session that ended.
        session_id: SessionId,
        /// Human-readable reason, for the log.
        reason: String,
    },
}

/// Actions the driver produces, executed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Send a frame to one session.
    SendToSession {
        /// Target session.
        session_id: SessionId,
        /// Payload to frame and send.
        payload: Bytes,
    },

    /// Send a frame to every registered session, in connection order,
    /// including the originator.
    Broadcast {
        /// Payload to frame and send.
        payload: Bytes,
    },

    /// Surface a payload on the operator's own output.
    DisplayMessage {
        /// Payload to display.
        payload: Bytes,
    },

    /// Tear a session down (admission refusal).
    CloseSession {
        /// Session to close.
        session_id: SessionId,
        /// Reason for the log.
        reason: String,
    },
}

/// Errors from driver event processing.
///
/// These never abort the event loop; the runtime logs and moves on. A
/// `SessionNotFound` is routine: a reader task can race a frame event
/// against the removal of its own session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The event referenced a session that is not registered.
    #[error("unknown session {0}")]
    SessionNotFound(SessionId),

    /// An accept event reused a registered id.
    #[error("session {0} is already registered")]
    DuplicateSession(SessionId),
}

/// Pure chat-room state machine.
#[derive(Debug, Default)]
pub struct ServerDriver {
    registry: ConnectionRegistry,
    config: DriverConfig,
}

impl ServerDriver {
    /// Create a driver with the given configuration.
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        Self { registry: ConnectionRegistry::new(), config }
    }

    /// Number of currently registered sessions.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.registry.session_count()
    }

    /// Broadcast order captured before any mutation.
    #[must_use]
    pub fn broadcast_order(&self) -> Vec<SessionId> {
        self.registry.snapshot()
    }

    /// Whether a session is currently registered.
    #[must_use]
    pub fn has_session(&self, session_id: SessionId) -> bool {
        self.registry.has_session(session_id)
    }

    /// Process one event and return the actions to execute.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id, peer } => {
                self.handle_connection_accepted(session_id, peer)
            }
            ServerEvent::FrameReceived { session_id, payload } => {
                self.handle_frame_received(session_id, &payload)
            }
            ServerEvent::ConnectionClosed { session_id, reason } => {
                self.handle_connection_closed(session_id, &reason)
            }
        }
    }

    /// Register the session and hand it its id as the first frame.
    ///
    /// The id send is the runtime's next action; if it reports disconnect,
    /// the runtime tears the session down before it ever joins a
    /// broadcast.
    fn handle_connection_accepted(
        &mut self,
        session_id: SessionId,
        peer: SocketAddr,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if self.registry.session_count() >= self.config.max_clients {
            tracing::warn!(session_id, %peer, "admission refused: server full");
            return Ok(vec![ServerAction::CloseSession {
                session_id,
                reason: "server full".to_owned(),
            }]);
        }

        if !self.registry.register_session(session_id, SessionInfo { peer }) {
            return Err(DriverError::DuplicateSession(session_id));
        }
        tracing::info!(session_id, %peer, "client connected");

        Ok(vec![ServerAction::SendToSession {
            session_id,
            payload: Bytes::from(session_id.to_string()),
        }])
    }

    fn handle_frame_received(
        &mut self,
        session_id: SessionId,
        payload: &Bytes,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if !self.registry.has_session(session_id) {
            return Err(DriverError::SessionNotFound(session_id));
        }

        // The status query replies privately to the session the frame
        // arrived on; the frame is never broadcast.
        if content_after_separator(payload) == Some(CONNECTED_QUERY) {
            let count = self.registry.session_count();
            tracing::debug!(session_id, count, "status query");
            return Ok(vec![ServerAction::SendToSession {
                session_id,
                payload: Bytes::from(count.to_string()),
            }]);
        }

        Ok(vec![
            ServerAction::DisplayMessage { payload: payload.clone() },
            ServerAction::Broadcast { payload: payload.clone() },
        ])
    }

    /// Unregister on close. Idempotent: an id that is already gone (or was
    /// refused admission) is not an error.
    fn handle_connection_closed(
        &mut self,
        session_id: SessionId,
        reason: &str,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if self.registry.unregister_session(session_id).is_some() {
            tracing::info!(session_id, reason, "client disconnected");
        }
        Ok(Vec::new())
    }
}

/// Frame content after the first `:`, or `None` when there is no separator.
fn content_after_separator(payload: &[u8]) -> Option<&[u8]> {
    let at = payload.iter().position(|b| *b == b':')?;
    Some(&payload[at + 1..])
}
