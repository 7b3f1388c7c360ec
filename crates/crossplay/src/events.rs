//! Game events → client broadcasts.
//!
//! The game server calls these hooks from its own threads as things happen.
//! Each hook builds the message and broadcasts it on the calling thread;
//! with no client connected it returns straight away without building
//! anything.

use std::collections::HashSet;
use std::sync::Arc;

use crossplay_protocol::{BlockAction, BlockDescriptor, Codec, OutboundMessage, formatted_state};

use crate::broadcast::Broadcaster;

/// A block as the game server reports it in a place or break event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldBlock {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Block type identifier, e.g. `OAK_STAIRS`.
    pub block_type: String,
    /// Full block data string, e.g. `minecraft:oak_stairs[facing=north]`.
    pub block_data: String,
    /// Biome at the block's position, e.g. `PLAINS`.
    pub biome: String,
}

/// Entry point for game events.
///
/// Cheap to clone; hand one to every event listener.
pub struct EventBridge<C: Codec> {
    broadcaster: Broadcaster<C>,
    biome_sensitive: Arc<HashSet<String>>,
}

impl<C: Codec> Clone for EventBridge<C> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: self.broadcaster.clone(),
            biome_sensitive: Arc::clone(&self.biome_sensitive),
        }
    }
}

impl<C: Codec> EventBridge<C> {
    /// Creates a bridge. `biome_sensitive` lists the block types whose
    /// placements carry a biome.
    pub fn new<I, S>(broadcaster: Broadcaster<C>, biome_sensitive: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            broadcaster,
            biome_sensitive: Arc::new(biome_sensitive.into_iter().map(Into::into).collect()),
        }
    }

    /// `true` if placements of `block_type` carry a biome.
    pub fn is_biome_sensitive(&self, block_type: &str) -> bool {
        self.biome_sensitive.contains(block_type)
    }

    /// A block was placed. Returns how many clients were notified.
    pub fn on_block_placed(&self, block: &WorldBlock) -> usize {
        self.broadcaster
            .broadcast_with(|| self.block_update(BlockAction::Place, block))
    }

    /// A block was broken. Returns how many clients were notified.
    pub fn on_block_broken(&self, block: &WorldBlock) -> usize {
        self.broadcaster
            .broadcast_with(|| self.block_update(BlockAction::Break, block))
    }

    /// A player joined the server. Returns how many clients were notified.
    pub fn on_player_joined(&self, uuid: &str, name: &str) -> usize {
        self.broadcaster.broadcast_with(|| OutboundMessage::PlayerJoin {
            name: name.to_string(),
            uuid: uuid.to_string(),
        })
    }

    /// A player left the server. Returns how many clients were notified.
    pub fn on_player_left(&self, uuid: &str, name: &str) -> usize {
        self.broadcaster.broadcast_with(|| OutboundMessage::PlayerLeave {
            name: name.to_string(),
            uuid: uuid.to_string(),
        })
    }

    /// Builds the `block_update` message for an event.
    ///
    /// Only placements carry state and biome; a break reports position and
    /// type alone.
    pub fn block_update(&self, action: BlockAction, block: &WorldBlock) -> OutboundMessage {
        let mut descriptor =
            BlockDescriptor::new(block.x, block.y, block.z, block.block_type.as_str());
        if action == BlockAction::Place {
            descriptor = descriptor
                .with_state(formatted_state(&block.block_data).map(str::to_string))
                .with_biome(
                    self.is_biome_sensitive(&block.block_type)
                        .then(|| block.biome.clone()),
                );
        }
        OutboundMessage::BlockUpdate {
            action,
            block: descriptor,
        }
    }
}
