//! Structured payloads carried inside outbound messages: blocks, players
//! and world metadata.

use serde::{Deserialize, Serialize};

/// Whether a block update reports a placement or a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockAction {
    Place,
    Break,
}

/// One block as the map client sees it.
///
/// Keys are single letters on the wire because chunk dumps carry thousands
/// of these: `{"x":1,"y":64,"z":2,"t":"STONE","s":"axis=y","b":"PLAINS"}`.
/// `s` and `b` are omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub x: i32,
    pub y: i32,
    pub z: i32,

    /// Block type identifier, e.g. `OAK_STAIRS`.
    #[serde(rename = "t")]
    pub block_type: String,

    /// Block data with the enclosing brackets stripped, e.g.
    /// `facing=north,half=bottom`. See [`formatted_state`].
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Biome identifier, only for biome-sensitive blocks on placement.
    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub biome: Option<String>,
}

impl BlockDescriptor {
    /// A block with no state and no biome.
    pub fn new(x: i32, y: i32, z: i32, block_type: impl Into<String>) -> Self {
        Self {
            x,
            y,
            z,
            block_type: block_type.into(),
            state: None,
            biome: None,
        }
    }

    /// Sets the formatted state string.
    pub fn with_state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }

    /// Sets the biome identifier.
    pub fn with_biome(mut self, biome: Option<String>) -> Self {
        self.biome = biome;
        self
    }
}

/// Extracts the state portion of a full block-data string.
///
/// Returns the text between the first `[` and the closing `]` at the end:
/// `minecraft:oak_stairs[facing=north,half=bottom]` gives
/// `facing=north,half=bottom`. Data with no `[` has no state and yields
/// `None`. If the trailing `]` is missing, everything after the `[` is
/// returned.
pub fn formatted_state(block_data: &str) -> Option<&str> {
    let start = block_data.find('[')?;
    let inner = &block_data[start + 1..];
    Some(inner.strip_suffix(']').unwrap_or(inner))
}

/// One online player, as pushed in `player_update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub uuid: String,
    /// Name of the world the player is in.
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

/// World metadata, as pushed in `world_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub name: String,
    /// Time of day in game ticks (0–24000).
    pub time: u64,
    pub storm: bool,
    pub thundering: bool,
    pub online_players: usize,
}
