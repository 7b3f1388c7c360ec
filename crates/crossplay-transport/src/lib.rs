//! Transport abstraction layer for Crossplay.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol carrying live-update text frames.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, IncomingWebSocket, WebSocketConnection, WebSocketTransport,
};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// A peer that has connected but not finished its handshake yet.
    type Incoming: Handshake<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer.
    ///
    /// Returns as soon as the peer is accepted at the socket level; no
    /// protocol bytes are exchanged here, so a slow or silent peer cannot
    /// hold up the accept loop. Finish the connection with
    /// [`Handshake::complete`], typically in the peer's own task.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// The protocol handshake of a freshly accepted peer.
pub trait Handshake: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake and returns the ready connection.
    async fn complete(self) -> Result<Self::Connection, Self::Error>;

    /// Returns the identifier the finished connection will carry.
    fn id(&self) -> ConnectionId;
}

/// A single connection that exchanges text frames.
///
/// Implementations must allow `send_text` and `recv` to run concurrently
/// from different tasks: a writer task drains the session's outbound
/// queue while the reader loop waits for the next client frame.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the remote peer.
    async fn send_text(&self, text: &str) -> Result<(), Self::Error>;

    /// Receives the next text frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The peer address, if the transport knows it. Diagnostic only.
    fn remote_addr(&self) -> Option<SocketAddr>;
}
