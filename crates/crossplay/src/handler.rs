//! Per-connection handler: welcome, reader loop and writer task.
//!
//! Each accepted peer gets its own Tokio task running this handler.
//! The flow is:
//!   0. Complete the WebSocket handshake (bounded by a timeout)
//!   1. Create the session and spawn the writer that drains its queue
//!   2. `on_connect` → welcome message, then registered for broadcasts
//!   3. Loop: receive text frames → `on_text`
//!   4. On close or error → `on_disconnect`, writer stopped

use std::sync::Arc;

use crossplay_protocol::Codec;
use crossplay_session::{Session, SessionOutbound};
use crossplay_transport::{
    Connection, ConnectionId, Handshake, IncomingWebSocket, TransportError, WebSocketConnection,
};
use tokio::task::JoinHandle;

use crate::{CrossplayError, LiveHub};

/// Drop guard that unregisters the session and stops the writer when the
/// handler exits, even if it panics.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    hub: LiveHub<C>,
    writer: JoinHandle<()>,
    reason: &'static str,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.hub.on_disconnect(self.conn_id, self.reason);
        self.writer.abort();
    }
}

/// Handles a single peer from handshake to close.
pub(crate) async fn handle_connection<C: Codec>(
    incoming: IncomingWebSocket,
    hub: LiveHub<C>,
) -> Result<(), CrossplayError> {
    let conn = Arc::new(incoming.complete().await?);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, remote = ?conn.remote_addr(), "handling new connection");

    let (session, outbound) = Session::new(conn_id, conn.remote_addr());
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), session.clone(), outbound));
    let mut guard = ConnectionGuard {
        conn_id,
        hub: hub.clone(),
        writer,
        reason: "handler exited",
    };

    hub.on_connect(session.clone());

    loop {
        match conn.recv().await {
            Ok(Some(text)) => {
                hub.on_text(&session, &text);
            }
            Ok(None) => {
                guard.reason = "closed by client";
                break;
            }
            Err(TransportError::InvalidText) => {
                tracing::warn!(%conn_id, "dropping frame that is not UTF-8 text");
            }
            Err(e) => {
                hub.on_error(conn_id, &e);
                guard.reason = "receive error";
                break;
            }
        }
    }

    session.mark_closed();
    drop(guard);
    conn.close().await?;
    Ok(())
}

/// Forwards queued frames to the socket until the queue closes or a write
/// fails. A failed write closes the session, so the next broadcast prunes
/// it.
async fn write_loop(
    conn: Arc<WebSocketConnection>,
    session: Session,
    mut outbound: SessionOutbound,
) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = conn.send_text(&text).await {
            tracing::debug!(conn_id = %session.id(), error = %e, "write failed");
            session.mark_closed();
            break;
        }
    }
}
