//! Wire protocol for Crossplay.
//!
//! This crate defines the "language" that live-map clients and the server
//! speak:
//!
//! - **Messages** ([`InboundMessage`], [`OutboundMessage`]) — the tagged
//!   JSON objects that travel in each direction.
//! - **Payloads** ([`BlockDescriptor`], [`PlayerSnapshot`],
//!   [`WorldSnapshot`]) — the structured data nested inside them.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages are turned
//!   into text frames and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! The protocol layer knows nothing about connections or the world store;
//! encoding and decoding are pure and stateless.
//!
//! ```text
//! Transport (text) → Protocol (InboundMessage) → Dispatcher
//! ```

mod block;
mod codec;
mod error;
mod types;

pub use block::{BlockAction, BlockDescriptor, PlayerSnapshot, WorldSnapshot, formatted_state};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{InboundMessage, OutboundMessage};
