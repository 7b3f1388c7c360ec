//! Unified error type for the Crossplay server.

use crossplay_protocol::ProtocolError;
use crossplay_session::SessionError;
use crossplay_transport::TransportError;

use crate::WorldError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `crossplay` crate you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CrossplayError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, missing type tag).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (closed session, dropped writer).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The world store failed to answer a query.
    #[error(transparent)]
    World(#[from] WorldError),
}
