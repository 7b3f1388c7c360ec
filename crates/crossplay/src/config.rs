//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Block types whose rendering depends on the biome they sit in (grass and
/// foliage tint, water colour). Placements of these carry the biome.
pub const DEFAULT_BIOME_SENSITIVE_BLOCKS: &[&str] = &[
    "GRASS_BLOCK",
    "SHORT_GRASS",
    "TALL_GRASS",
    "FERN",
    "LARGE_FERN",
    "VINE",
    "SUGAR_CANE",
    "WATER",
    "OAK_LEAVES",
    "SPRUCE_LEAVES",
    "BIRCH_LEAVES",
    "JUNGLE_LEAVES",
    "ACACIA_LEAVES",
    "DARK_OAK_LEAVES",
    "MANGROVE_LEAVES",
];

/// Configuration for a live-update server.
///
/// `Default` gives the stock server: bind to `127.0.0.1:8080`, player
/// updates every 100 ms, world updates every 2 s. Start from
/// `LiveConfig::default()` and override what you need, or load it from a
/// JSON file; missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Text of the `initial` message every new client receives.
    pub welcome_message: String,

    /// Milliseconds between `player_update` broadcasts.
    pub player_update_interval_ms: u64,

    /// Milliseconds between `world_update` broadcasts.
    pub world_update_interval_ms: u64,

    /// Block types that get a biome attached when placed.
    pub biome_sensitive_blocks: Vec<String>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            welcome_message: "Connected to Minecraft server".to_string(),
            player_update_interval_ms: 100,
            world_update_interval_ms: 2_000,
            biome_sensitive_blocks: DEFAULT_BIOME_SENSITIVE_BLOCKS
                .iter()
                .map(|b| b.to_string())
                .collect(),
        }
    }
}

impl LiveConfig {
    /// Sets the listener address.
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Sets the `initial` message text.
    pub fn with_welcome_message(mut self, message: impl Into<String>) -> Self {
        self.welcome_message = message.into();
        self
    }

    /// Sets the player update period.
    pub fn with_player_update_interval(mut self, period: Duration) -> Self {
        self.player_update_interval_ms = saturating_millis(period);
        self
    }

    /// Sets the world update period.
    pub fn with_world_update_interval(mut self, period: Duration) -> Self {
        self.world_update_interval_ms = saturating_millis(period);
        self
    }

    /// Replaces the biome-sensitive block list.
    pub fn with_biome_sensitive_blocks<I, S>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.biome_sensitive_blocks = blocks.into_iter().map(Into::into).collect();
        self
    }

    /// Player update period as a `Duration`.
    pub fn player_update_interval(&self) -> Duration {
        Duration::from_millis(self.player_update_interval_ms)
    }

    /// World update period as a `Duration`.
    pub fn world_update_interval(&self) -> Duration {
        Duration::from_millis(self.world_update_interval_ms)
    }
}

/// Whole milliseconds in `period`, capped at `u64::MAX`.
fn saturating_millis(period: Duration) -> u64 {
    u64::try_from(period.as_millis()).unwrap_or(u64::MAX)
}
