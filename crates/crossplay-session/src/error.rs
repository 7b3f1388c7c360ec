//! Error types for the session layer.

use crossplay_transport::ConnectionId;

/// Errors that can occur when writing to a session.
///
/// Both variants mean the same thing to the broadcaster: the session is no
/// longer broadcast-eligible and should be dropped from the registry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session was already marked closed (disconnect or earlier failure).
    #[error("session {0} is closed")]
    Closed(ConnectionId),

    /// The connection's writer is gone, so the frame could not be queued.
    #[error("send to session {0} failed")]
    SendFailed(ConnectionId),
}
