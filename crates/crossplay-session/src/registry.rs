//! The session registry: every client currently eligible for broadcasts.
//!
//! # Concurrency
//!
//! The registry is mutated from three directions at once: connection tasks
//! (add on connect, remove on disconnect or error), the broadcaster (prune
//! after a failed send) and shutdown (clear). It is therefore internally
//! synchronized with a `parking_lot::Mutex` and shared by reference.
//!
//! [`SessionRegistry::for_each`] holds the lock for the whole traversal.
//! That makes one traversal linearizable against membership changes: an
//! entry removed before the traversal starts is never visited, and an
//! entry present for the whole traversal is visited exactly once. Visitors
//! only push already-encoded frames onto non-blocking queues, so the lock
//! is never held across network or world-store I/O.

use std::collections::HashMap;

use crossplay_transport::ConnectionId;
use parking_lot::Mutex;

use crate::Session;

/// What a [`SessionRegistry::for_each`] visitor wants done with the session
/// it was just shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Leave the session registered.
    Keep,
    /// Drop the session from the registry.
    Remove,
}

/// Thread-safe set of live sessions, keyed by connection.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session.
    ///
    /// Returns `false` (and leaves the registry unchanged) if a session for
    /// the same connection is already registered.
    pub fn add(&self, session: Session) -> bool {
        let id = session.id();
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&id) {
            tracing::warn!(conn_id = %id, "session already registered");
            return false;
        }
        sessions.insert(id, session);
        tracing::debug!(conn_id = %id, sessions = sessions.len(), "session registered");
        true
    }

    /// Unregisters a session. Returns it if it was registered.
    pub fn remove(&self, id: ConnectionId) -> Option<Session> {
        let removed = self.sessions.lock().remove(&id);
        if removed.is_some() {
            tracing::debug!(conn_id = %id, "session unregistered");
        }
        removed
    }

    /// Visits every registered session once, removing those for which the
    /// visitor returns [`Visit::Remove`].
    ///
    /// Returns the number of sessions visited. The visitor runs under the
    /// registry lock and must not call back into the registry.
    pub fn for_each<F>(&self, mut visitor: F) -> usize
    where
        F: FnMut(&Session) -> Visit,
    {
        let mut sessions = self.sessions.lock();
        let mut visited = 0;
        sessions.retain(|_, session| {
            visited += 1;
            visitor(session) == Visit::Keep
        });
        visited
    }

    /// `true` when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// `true` if the connection has a registered session.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    /// Returns a handle to the registered session for `id`, if any.
    pub fn get(&self, id: ConnectionId) -> Option<Session> {
        self.sessions.lock().get(&id).cloned()
    }

    /// Unregisters every session without closing them.
    ///
    /// Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let count = sessions.len();
        sessions.clear();
        count
    }
}

// =========================================================================
// Tests
// =========================================================================
