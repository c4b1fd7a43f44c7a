//! Connection registry for live chat sessions.
//!
//! The registry is the single source of truth for who is in the room.
//! Iteration order is connection order, which fixes the broadcast order.
//! Removal is by session id - no pointer surgery - so a broadcast that
//! drops a destination mid-pass simply skips ids that are no longer
//! members.
//!
//! Invariant: a session id is registered here iff the runtime holds its
//! write half and reader task; the three are always added and removed
//! together.

use std::{collections::HashMap, net::SocketAddr};

/// Identifier for one accepted connection.
///
/// Minted monotonically starting at 1 and never reused, including across
/// disconnects.
pub type SessionId = u64;

/// Metadata kept per registered session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Remote address the connection was accepted from.
    pub peer: SocketAddr,
}

/// Registry of currently connected sessions, in connection order.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Session id → metadata
    sessions: HashMap<SessionId, SessionInfo>,
    /// Session ids in connection order; drives broadcast order
    order: Vec<SessionId>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session at the tail of the room.
    ///
    /// Returns `false` if the id is already registered.
    pub fn register_session(&mut self, session_id: SessionId, info: SessionInfo) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }
        self.sessions.insert(session_id, info);
        self.order.push(session_id);
        true
    }

    /// Remove a session, wherever it sits in the order.
    ///
    /// Head, middle, tail, and not-found are all handled; returns the
    /// session's metadata if it was registered.
    pub fn unregister_session(&mut self, session_id: SessionId) -> Option<SessionInfo> {
        let info = self.sessions.remove(&session_id)?;
        self.order.retain(|id| *id != session_id);
        Some(info)
    }

    /// Check whether a session is registered.
    #[must_use]
    pub fn has_session(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Session metadata. `None` if the session is not registered.
    #[must_use]
    pub fn session_info(&self, session_id: SessionId) -> Option<&SessionInfo> {
        self.sessions.get(&session_id)
    }

    /// Number of registered sessions - the live count reported by the
    /// status query.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Session ids in connection order.
    pub fn sessions_in_order(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.order.iter().copied()
    }

    /// Owned snapshot of the current order.
    ///
    /// Broadcast captures this before sending anything, so removals during
    /// the pass never invalidate the iteration.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SessionId> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn register_and_lookup_session() {
        let mut registry = ConnectionRegistry::new();

        assert!(registry.register_session(1, SessionInfo { peer: peer() }));
        assert!(registry.has_session(1));
        assert!(!registry.has_session(2));
        assert_eq!(registry.session_info(1).unwrap().peer, peer());
    }

    #[test]
    fn register_duplicate_session_fails() {
        let mut registry = ConnectionRegistry::new();

        assert!(registry.register_session(1, SessionInfo { peer: peer() }));
        assert!(!registry.register_session(1, SessionInfo { peer: peer() }));
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn unregister_returns_info_once() {
        let mut registry = ConnectionRegistry::new();

        registry.register_session(7, SessionInfo { peer: peer() });

        assert!(registry.unregister_session(7).is_some());
        assert!(registry.unregister_session(7).is_none());
        assert!(!registry.has_session(7));
    }

    #[test]
    fn order_is_connection_order() {
        let mut registry = ConnectionRegistry::new();

        for id in [3, 1, 9] {
            registry.register_session(id, SessionInfo { peer: peer() });
        }

        let order: Vec<SessionId> = registry.sessions_in_order().collect();
        assert_eq!(order, vec![3, 1, 9]);
    }

    #[test]
    fn removal_preserves_relative_order() {
        let mut registry = ConnectionRegistry::new();

        for id in 1..=4 {
            registry.register_session(id, SessionInfo { peer: peer() });
        }

        // Head, middle, and tail removals.
        registry.unregister_session(1);
        assert_eq!(registry.snapshot(), vec![2, 3, 4]);

        registry.unregister_session(3);
        assert_eq!(registry.snapshot(), vec![2, 4]);

        registry.unregister_session(4);
        assert_eq!(registry.snapshot(), vec![2]);
    }

    #[test]
    fn count_tracks_membership() {
        let mut registry = ConnectionRegistry::new();

        assert_eq!(registry.session_count(), 0);
        registry.register_session(1, SessionInfo { peer: peer() });
        registry.register_session(2, SessionInfo { peer: peer() });
        assert_eq!(registry.session_count(), 2);

        registry.unregister_session(1);
        assert_eq!(registry.session_count(), 1);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut registry = ConnectionRegistry::new();

        registry.register_session(1, SessionInfo { peer: peer() });
        registry.register_session(2, SessionInfo { peer: peer() });

        let snapshot = registry.snapshot();
        registry.unregister_session(2);

        // The captured order is untouched; membership checks see the truth.
        assert_eq!(snapshot, vec![1, 2]);
        assert!(!registry.has_session(2));
    }
}
