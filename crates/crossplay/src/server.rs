//! `CrossplayServer` builder and server loop.
//!
//! This is the entry point for running a live-map server. It ties together
//! all the layers: transport → session → protocol → hub.

use std::future::Future;
use std::sync::Arc;

use crossplay_protocol::{Codec, JsonCodec};
use crossplay_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{CrossplayError, LiveConfig, LiveHub, WorldStore};

/// Builder for configuring and starting a Crossplay server.
///
/// # Example
///
/// ```rust,ignore
/// use crossplay::prelude::*;
///
/// let server = CrossplayServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(Arc::new(my_world))
///     .await?;
/// server.run().await
/// ```
pub struct CrossplayServerBuilder {
    config: LiveConfig,
}

impl CrossplayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: LiveConfig::default(),
        }
    }

    /// Replaces the whole configuration, including the bind address.
    pub fn config(mut self, config: LiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and builds the hub over `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`. Nothing is accepted and
    /// no update is sent until [`CrossplayServer::run`] is called.
    pub async fn build(
        self,
        store: Arc<dyn WorldStore>,
    ) -> Result<CrossplayServer<JsonCodec>, CrossplayError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let hub = LiveHub::new(store, self.config);
        Ok(CrossplayServer { transport, hub })
    }
}

impl Default for CrossplayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Crossplay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CrossplayServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    hub: LiveHub<C>,
}

impl CrossplayServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CrossplayServerBuilder {
        CrossplayServerBuilder::new()
    }
}

impl<C: Codec> CrossplayServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The hub behind this server. Clone it to feed game events in through
    /// [`LiveHub::events`].
    pub fn hub(&self) -> &LiveHub<C> {
        &self.hub
    }

    /// Starts the periodic updates and runs the accept loop forever.
    ///
    /// Each accepted peer gets its own handler task, which also runs the
    /// WebSocket handshake, so a peer that never finishes it only ties up
    /// its own task.
    pub async fn run(self) -> Result<(), CrossplayError> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but returns once `shutdown` resolves.
    ///
    /// On shutdown the listener stops accepting, the periodic updates are
    /// stopped and the registry is cleared. Open connections are left to
    /// end on their own.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), CrossplayError>
    where
        F: Future<Output = ()>,
    {
        self.hub.start_updates();
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Crossplay server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let hub = self.hub.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(incoming, hub).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("Crossplay server shutting down");
        self.hub.shutdown().await;
        self.transport.shutdown().await?;
        Ok(())
    }
}
