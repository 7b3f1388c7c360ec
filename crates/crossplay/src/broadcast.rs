//! Fan-out of outbound messages to every registered session.

use std::sync::Arc;

use crossplay_protocol::{Codec, OutboundMessage};
use crossplay_session::{Session, SessionRegistry, Visit};

use crate::CrossplayError;

/// Encodes messages and pushes them to sessions.
///
/// A broadcast encodes the message once and queues the same text on every
/// registered session. A session whose send fails is removed from the
/// registry on the spot; delivery to the others carries on. Nothing is
/// retried.
pub struct Broadcaster<C: Codec> {
    registry: Arc<SessionRegistry>,
    codec: Arc<C>,
}

impl<C: Codec> Clone for Broadcaster<C> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<C: Codec> Broadcaster<C> {
    /// Creates a broadcaster over `registry`.
    pub fn new(registry: Arc<SessionRegistry>, codec: Arc<C>) -> Self {
        Self { registry, codec }
    }

    /// The registry this broadcaster delivers to.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The codec used to encode messages.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Sends `message` to every registered session.
    ///
    /// Returns how many sessions the message was queued for. With no
    /// sessions registered this returns 0 without encoding anything. An
    /// encode failure is logged and nothing is sent.
    pub fn broadcast(&self, message: &OutboundMessage) -> usize {
        if self.registry.is_empty() {
            return 0;
        }
        let text = match self.codec.encode(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(kind = message.tag(), error = %e, "failed to encode broadcast");
                return 0;
            }
        };
        self.deliver(message.tag(), &text)
    }

    /// Like [`broadcast`](Self::broadcast), but only builds the message
    /// when at least one session is registered.
    pub fn broadcast_with<F>(&self, build: F) -> usize
    where
        F: FnOnce() -> OutboundMessage,
    {
        if self.registry.is_empty() {
            return 0;
        }
        self.broadcast(&build())
    }

    /// Encodes `message` and queues it for a single session.
    ///
    /// The registry is not touched; callers decide what a failure means.
    pub fn send_to(
        &self,
        session: &Session,
        message: &OutboundMessage,
    ) -> Result<(), CrossplayError> {
        let text = self.codec.encode(message)?;
        session.send_text(text)?;
        Ok(())
    }

    fn deliver(&self, kind: &'static str, text: &str) -> usize {
        let mut delivered = 0;
        let mut pruned = 0;
        self.registry.for_each(|session| match session.send_text(text) {
            Ok(()) => {
                delivered += 1;
                Visit::Keep
            }
            Err(e) => {
                tracing::debug!(conn_id = %session.id(), error = %e, "dropping session after failed send");
                pruned += 1;
                Visit::Remove
            }
        });
        if pruned > 0 {
            tracing::info!(kind, delivered, pruned, "broadcast pruned dead sessions");
        } else {
            tracing::trace!(kind, delivered, "broadcast delivered");
        }
        delivered
    }
}
