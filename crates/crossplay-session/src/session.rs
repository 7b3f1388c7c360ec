//! Session handles: the server's view of one connected live-update client.
//!
//! A session tracks:
//! - WHICH connection it is (`ConnectionId`)
//! - WHERE the client connected from (diagnostic only)
//! - WHETHER it is still open
//! - HOW to reach it (an outbound queue drained by the connection's writer)

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossplay_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::SessionError;

/// Receiving end of a session's outbound queue.
///
/// The connection handler's writer task owns this and forwards every frame
/// to the socket. Dropping it makes all further sends on the session fail.
pub type SessionOutbound = mpsc::UnboundedReceiver<String>;

/// A cheap, cloneable handle to one connected client.
///
/// Sending never blocks: frames are pushed onto an unbounded queue and the
/// writer task does the actual network I/O. This lets broadcasts run from
/// timer tasks and game-event threads without waiting on slow sockets.
/// There is no backpressure; a client is only dropped once a send fails.
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    remote_addr: Option<SocketAddr>,
    outbound: mpsc::UnboundedSender<String>,
    /// Shared by every clone so one `mark_closed` is seen by all holders.
    open: Arc<AtomicBool>,
}

impl Session {
    /// Creates a session and the queue its writer task will drain.
    pub fn new(id: ConnectionId, remote_addr: Option<SocketAddr>) -> (Self, SessionOutbound) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            id,
            remote_addr,
            outbound: tx,
            open: Arc::new(AtomicBool::new(true)),
        };
        (session, rx)
    }

    /// The connection this session belongs to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The client's address, if the transport reported one.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// `true` until the session is marked closed or its writer goes away.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.outbound.is_closed()
    }

    /// Marks the session closed. Every later send fails with
    /// [`SessionError::Closed`].
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Queues one text frame for the client.
    ///
    /// # Errors
    /// - [`SessionError::Closed`] — the session was marked closed
    /// - [`SessionError::SendFailed`] — the writer dropped its queue
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SessionError::Closed(self.id));
        }
        self.outbound.send(text.into()).map_err(|_| {
            self.mark_closed();
            SessionError::SendFailed(self.id)
        })
    }
}

/// Two handles are the same session when they refer to the same connection.
impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: u64) -> (Session, SessionOutbound) {
        Session::new(ConnectionId::new(id), None)
    }

    #[test]
    fn test_send_text_reaches_outbound_queue() {
        let (s, mut rx) = session(1);
        s.send_text("hello").expect("open session accepts frames");
        assert_eq!(rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_new_session_is_open() {
        let (s, _rx) = session(1);
        assert!(s.is_open());
        assert_eq!(s.id(), ConnectionId::new(1));
        assert_eq!(s.remote_addr(), None);
    }

    #[test]
    fn test_dropped_outbound_fails_send_and_closes() {
        let (s, rx) = session(2);
        drop(rx);

        assert!(!s.is_open());
        let err = s.send_text("lost").unwrap_err();
        assert!(matches!(err, SessionError::SendFailed(id) if id == ConnectionId::new(2)));
        // The failure sticks: later sends report Closed.
        assert!(matches!(s.send_text("again"), Err(SessionError::Closed(_))));
    }

    #[test]
    fn test_mark_closed_is_shared_between_clones() {
        let (s, mut rx) = session(3);
        let clone = s.clone();

        clone.mark_closed();

        assert!(!s.is_open());
        assert!(matches!(s.send_text("x"), Err(SessionError::Closed(_))));
        assert!(rx.try_recv().is_err(), "nothing should be queued");
    }

    #[test]
    fn test_equality_is_by_connection_id() {
        let (a, _ra) = session(4);
        let (b, _rb) = session(4);
        let (c, _rc) = session(5);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
