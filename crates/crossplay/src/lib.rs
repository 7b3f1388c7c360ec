//! # Crossplay
//!
//! Real-time live-map server for a Minecraft world.
//!
//! Crossplay keeps a set of connected map clients up to date: it pushes
//! periodic snapshots of players and world metadata, broadcasts block and
//! join/leave events as they happen, and answers chunk and area queries
//! against the world without blocking the threads that produce events.
//!
//! You implement [`WorldStore`] over your game state; the server handles
//! transport, sessions, encoding and scheduling.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crossplay::prelude::*;
//!
//! // Implement WorldStore for your world, then:
//! // let server = CrossplayServer::builder()
//! //     .bind("0.0.0.0:8080")
//! //     .build(Arc::new(MyWorld))
//! //     .await?;
//! // let events = server.hub().events();   // feed game events in here
//! // server.run().await
//! ```

mod broadcast;
mod config;
mod dispatch;
mod error;
mod events;
mod handler;
mod hub;
mod server;
mod updates;
mod world;

pub use broadcast::Broadcaster;
pub use config::{DEFAULT_BIOME_SENSITIVE_BLOCKS, LiveConfig};
pub use dispatch::{Dispatcher, HeartbeatClock};
pub use error::CrossplayError;
pub use events::{EventBridge, WorldBlock};
pub use hub::LiveHub;
pub use server::{CrossplayServer, CrossplayServerBuilder};
pub use world::{WorldError, WorldStore};

pub mod prelude {
    //! Everything needed to run a server and feed it events.

    pub use std::sync::Arc;

    pub use crossplay_protocol::{
        BlockAction, BlockDescriptor, Codec, InboundMessage, JsonCodec, OutboundMessage,
        PlayerSnapshot, ProtocolError, WorldSnapshot, formatted_state,
    };
    pub use crossplay_session::{Session, SessionError, SessionRegistry};
    pub use crossplay_transport::{ConnectionId, TransportError};

    pub use crate::{
        CrossplayError, CrossplayServer, CrossplayServerBuilder, EventBridge, LiveConfig,
        LiveHub, WorldBlock, WorldError, WorldStore,
    };
}
