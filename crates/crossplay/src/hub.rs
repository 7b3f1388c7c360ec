//! `LiveHub`: the shared state behind every connection, timer and event hook.
//!
//! The transport glue drives the hub through four callbacks:
//!
//! ```text
//! on_connect(session)       → initial message, then registered for broadcasts
//! on_text(session, raw)     → Dispatcher (heartbeat / queries)
//! on_error(id, cause)       → logged, session dropped
//! on_disconnect(id, reason) → session dropped
//! ```
//!
//! Independently, the two periodic update tasks and the [`EventBridge`]
//! broadcast through the same [`Broadcaster`].

use std::fmt;
use std::sync::Arc;

use crossplay_protocol::{Codec, JsonCodec, OutboundMessage};
use crossplay_session::{Session, SessionRegistry};
use crossplay_tick::PeriodicTask;
use crossplay_transport::ConnectionId;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::broadcast::Broadcaster;
use crate::dispatch::Dispatcher;
use crate::events::EventBridge;
use crate::updates::{spawn_player_updates, spawn_world_updates};
use crate::{LiveConfig, WorldStore};

/// Cheap, cloneable handle to the live-update core.
pub struct LiveHub<C: Codec = JsonCodec> {
    inner: Arc<HubInner<C>>,
}

struct HubInner<C: Codec> {
    config: LiveConfig,
    store: Arc<dyn WorldStore>,
    runtime: Handle,
    broadcaster: Broadcaster<C>,
    dispatcher: Dispatcher<C>,
    events: EventBridge<C>,
    /// Running update tasks. Empty before `start_updates` and after
    /// `shutdown`.
    tasks: Mutex<Vec<PeriodicTask>>,
}

impl<C: Codec> Clone for LiveHub<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LiveHub<JsonCodec> {
    /// Creates a hub speaking JSON.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn new(store: Arc<dyn WorldStore>, config: LiveConfig) -> Self {
        Self::with_codec(store, config, JsonCodec)
    }
}

impl<C: Codec> LiveHub<C> {
    /// Creates a hub with a custom codec.
    ///
    /// Query and update tasks are spawned on the runtime current at this
    /// call, so later callbacks may come from any thread.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn with_codec(store: Arc<dyn WorldStore>, config: LiveConfig, codec: C) -> Self {
        let runtime = Handle::current();
        let registry = Arc::new(SessionRegistry::new());
        let broadcaster = Broadcaster::new(registry, Arc::new(codec));
        let dispatcher = Dispatcher::new(broadcaster.clone(), Arc::clone(&store), runtime.clone());
        let events = EventBridge::new(
            broadcaster.clone(),
            config.biome_sensitive_blocks.iter().cloned(),
        );

        Self {
            inner: Arc::new(HubInner {
                config,
                store,
                runtime,
                broadcaster,
                dispatcher,
                events,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The configuration the hub was built with.
    pub fn config(&self) -> &LiveConfig {
        &self.inner.config
    }

    /// The live session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.inner.broadcaster.registry()
    }

    /// The broadcaster shared by updates and events.
    pub fn broadcaster(&self) -> &Broadcaster<C> {
        &self.inner.broadcaster
    }

    /// A handle for feeding game events in.
    pub fn events(&self) -> EventBridge<C> {
        self.inner.events.clone()
    }

    /// Number of connected sessions.
    pub fn session_count(&self) -> usize {
        self.registry().len()
    }

    // -----------------------------------------------------------------
    // Transport callbacks
    // -----------------------------------------------------------------

    /// A client connected.
    ///
    /// The welcome message is queued before the session is registered, so
    /// it is the first frame the client sees. A session that is already
    /// closed gets no welcome. Returns `false`, without welcoming, if a
    /// session for the same connection is already registered.
    pub fn on_connect(&self, session: Session) -> bool {
        let conn_id = session.id();
        if self.registry().contains(conn_id) {
            tracing::warn!(%conn_id, "connection already registered");
            return false;
        }

        if session.is_open() {
            let welcome = OutboundMessage::Initial {
                message: self.inner.config.welcome_message.clone(),
            };
            if let Err(e) = self.inner.broadcaster.send_to(&session, &welcome) {
                tracing::debug!(%conn_id, error = %e, "welcome not sent");
            }
        } else {
            tracing::debug!(%conn_id, "session closed before welcome");
        }

        let added = self.registry().add(session);
        if added {
            tracing::info!(%conn_id, sessions = self.session_count(), "client connected");
        }
        added
    }

    /// A text frame arrived from `session`.
    ///
    /// Returns the handle of the query task the frame started, if any.
    pub fn on_text(&self, session: &Session, raw: &str) -> Option<JoinHandle<()>> {
        self.inner.dispatcher.dispatch(session, raw)
    }

    /// A client disconnected.
    pub fn on_disconnect(&self, conn_id: ConnectionId, reason: &str) {
        if let Some(session) = self.registry().remove(conn_id) {
            session.mark_closed();
            tracing::info!(%conn_id, %reason, sessions = self.session_count(), "client disconnected");
        }
    }

    /// The connection reported an error. The session is dropped.
    pub fn on_error(&self, conn_id: ConnectionId, cause: &dyn fmt::Display) {
        tracing::warn!(%conn_id, error = %cause, "connection error");
        if let Some(session) = self.registry().remove(conn_id) {
            session.mark_closed();
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Starts the player and world update tasks. Calling it again while
    /// they run does nothing.
    pub fn start_updates(&self) {
        let mut tasks = self.inner.tasks.lock();
        if !tasks.is_empty() {
            return;
        }
        let _runtime = self.inner.runtime.enter();
        let config = &self.inner.config;
        tasks.push(spawn_player_updates(
            self.inner.broadcaster.clone(),
            Arc::clone(&self.inner.store),
            config.player_update_interval(),
        ));
        tasks.push(spawn_world_updates(
            self.inner.broadcaster.clone(),
            Arc::clone(&self.inner.store),
            config.world_update_interval(),
        ));
        tracing::info!(
            player_ms = config.player_update_interval_ms,
            world_ms = config.world_update_interval_ms,
            "periodic updates started"
        );
    }

    /// `true` while the periodic update tasks are running.
    pub fn updates_running(&self) -> bool {
        self.inner.tasks.lock().iter().any(PeriodicTask::is_running)
    }

    /// Stops both update tasks, then unregisters every session.
    ///
    /// Once this returns no further periodic update is sent. Sessions are
    /// not closed; their connections stay up until the transport drops
    /// them. Query replies still in flight are delivered only to sessions
    /// that are still open.
    pub async fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        for mut task in tasks {
            task.stop().await;
        }
        let dropped = self.registry().clear();
        tracing::info!(sessions = dropped, "live hub shut down");
    }
}
