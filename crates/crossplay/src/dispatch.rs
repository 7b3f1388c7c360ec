//! Inbound request handling.
//!
//! Every client frame goes through [`Dispatcher::dispatch`]:
//!
//! | Request            | Handling                                            |
//! |--------------------|-----------------------------------------------------|
//! | `heartbeat`        | answered inline with the server clock               |
//! | `subscribe_chunks` | `WorldStore::chunk_blocks` on the blocking pool     |
//! | `request_area`     | `WorldStore::area_blocks` on the blocking pool      |
//! | anything else      | logged and dropped                                  |
//!
//! Query replies go only to the session that asked, and only if it is
//! still open once the store has answered. Malformed frames and failed
//! queries produce no reply at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crossplay_protocol::{Codec, InboundMessage, OutboundMessage};
use crossplay_session::Session;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::broadcast::Broadcaster;
use crate::world::{WorldError, WorldStore, run_blocking};

/// Millisecond wall clock that never goes backwards.
///
/// If the system clock is stepped back, readings stay at the highest value
/// handed out so far until real time catches up.
#[derive(Debug, Default)]
pub struct HeartbeatClock {
    last: AtomicU64,
}

impl HeartbeatClock {
    /// Creates a clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds since the Unix epoch, non-decreasing across calls.
    pub fn now_millis(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let previous = self.last.fetch_max(wall, Ordering::AcqRel);
        previous.max(wall)
    }
}

/// Routes decoded client requests to their handlers.
pub struct Dispatcher<C: Codec> {
    broadcaster: Broadcaster<C>,
    store: Arc<dyn WorldStore>,
    runtime: Handle,
    clock: Arc<HeartbeatClock>,
}

impl<C: Codec> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: self.broadcaster.clone(),
            store: Arc::clone(&self.store),
            runtime: self.runtime.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Codec> Dispatcher<C> {
    /// Creates a dispatcher. Queries are spawned on `runtime`.
    pub fn new(broadcaster: Broadcaster<C>, store: Arc<dyn WorldStore>, runtime: Handle) -> Self {
        Self {
            broadcaster,
            store,
            runtime,
            clock: Arc::new(HeartbeatClock::new()),
        }
    }

    /// Handles one raw text frame from `session`.
    ///
    /// Never blocks on the world store. Returns the handle of the spawned
    /// query task when the frame started one.
    pub fn dispatch(&self, session: &Session, raw: &str) -> Option<JoinHandle<()>> {
        let conn_id = session.id();
        let message = match self.broadcaster.codec().decode_inbound(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "dropping malformed client message");
                return None;
            }
        };
        tracing::trace!(%conn_id, kind = message.tag(), "client request");

        match message {
            InboundMessage::Heartbeat => {
                let timestamp = self.clock.now_millis();
                self.reply(session, &OutboundMessage::Heartbeat { timestamp });
                None
            }
            InboundMessage::SubscribeChunks {
                center_x,
                center_z,
                radius,
            } => Some(self.query(session, "subscribe_chunks", move |store| {
                let blocks = store.chunk_blocks(center_x, center_z, radius)?;
                Ok(OutboundMessage::ChunkData { blocks })
            })),
            InboundMessage::RequestArea {
                x1,
                y1,
                z1,
                x2,
                y2,
                z2,
            } => Some(self.query(session, "request_area", move |store| {
                let blocks = store.area_blocks(x1, y1, z1, x2, y2, z2)?;
                Ok(OutboundMessage::AreaData { blocks })
            })),
            InboundMessage::Unrecognized { tag } => {
                tracing::debug!(%conn_id, %tag, "ignoring unknown message type");
                None
            }
        }
    }

    /// Runs `build` against the store off the runtime workers, then replies
    /// with its message.
    fn query<F>(&self, session: &Session, kind: &'static str, build: F) -> JoinHandle<()>
    where
        F: FnOnce(&dyn WorldStore) -> Result<OutboundMessage, WorldError> + Send + 'static,
    {
        let this = self.clone();
        let session = session.clone();
        self.runtime.spawn(async move {
            match run_blocking(&this.store, build).await {
                Ok(message) => this.reply(&session, &message),
                Err(WorldError::Task(e)) if e.is_panic() => {
                    tracing::error!(conn_id = %session.id(), kind, "world query panicked");
                }
                Err(e) => {
                    tracing::warn!(conn_id = %session.id(), kind, error = %e, "world query failed");
                }
            }
        })
    }

    /// Sends `message` to `session` if it is still open.
    ///
    /// A session that turns out to be dead is dropped from the registry.
    fn reply(&self, session: &Session, message: &OutboundMessage) {
        if !session.is_open() {
            tracing::debug!(conn_id = %session.id(), kind = message.tag(), "session closed before reply");
            return;
        }
        if let Err(e) = self.broadcaster.send_to(session, message) {
            tracing::debug!(conn_id = %session.id(), kind = message.tag(), error = %e, "reply failed");
            self.broadcaster.registry().remove(session.id());
        }
    }
}
