//! Live-update wire messages.
//!
//! Every frame in either direction is a flat JSON object whose `type`
//! field names the variant, e.g. `{"type":"heartbeat","timestamp":17}`.
//! Serde's internally tagged representation (`#[serde(tag = "type")]`)
//! produces exactly that shape.

use serde::{Deserialize, Serialize};

use crate::{BlockAction, BlockDescriptor, PlayerSnapshot, WorldSnapshot};

// ---------------------------------------------------------------------------
// InboundMessage — client → server
// ---------------------------------------------------------------------------

/// A request sent by a live-update client.
///
/// Field names are camelCase on the wire (`centerX`), snake_case in Rust.
/// Coordinates are forwarded to the world store exactly as received; the
/// protocol layer performs no range checks and no corner normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    /// Ask for the blocks of the chunks around a center column.
    SubscribeChunks {
        center_x: i32,
        center_z: i32,
        radius: i32,
    },

    /// Keep-alive. Answered immediately with an outbound heartbeat.
    Heartbeat,

    /// Ask for every block inside the box spanned by two opposite corners.
    RequestArea {
        x1: i32,
        y1: i32,
        z1: i32,
        x2: i32,
        y2: i32,
        z2: i32,
    },

    /// A well-formed object whose `type` names no known request.
    ///
    /// Produced only by [`Codec::decode_inbound`](crate::Codec::decode_inbound);
    /// it never appears on the wire.
    #[serde(skip)]
    Unrecognized { tag: String },
}

impl InboundMessage {
    /// Wire tags of every request the server understands.
    pub const KNOWN_TAGS: [&'static str; 3] = ["subscribe_chunks", "heartbeat", "request_area"];

    /// Returns `true` if `tag` names a request the server understands.
    pub fn is_known_tag(tag: &str) -> bool {
        Self::KNOWN_TAGS.contains(&tag)
    }

    /// The wire tag of this message, for logging.
    pub fn tag(&self) -> &str {
        match self {
            Self::SubscribeChunks { .. } => "subscribe_chunks",
            Self::Heartbeat => "heartbeat",
            Self::RequestArea { .. } => "request_area",
            Self::Unrecognized { tag } => tag,
        }
    }
}

// ---------------------------------------------------------------------------
// OutboundMessage — server → client
// ---------------------------------------------------------------------------

/// A message pushed by the server, either as a broadcast or as the reply
/// to one client's request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// First frame every new client receives.
    Initial { message: String },

    /// Reply to an inbound heartbeat. Milliseconds since the Unix epoch.
    Heartbeat { timestamp: u64 },

    /// Reply to `subscribe_chunks`.
    ChunkData { blocks: Vec<BlockDescriptor> },

    /// Reply to `request_area`.
    AreaData { blocks: Vec<BlockDescriptor> },

    /// Periodic snapshot of every online player.
    PlayerUpdate { players: Vec<PlayerSnapshot> },

    /// Periodic snapshot of world metadata.
    WorldUpdate { world: WorldSnapshot },

    /// A block was placed or broken.
    BlockUpdate {
        action: BlockAction,
        block: BlockDescriptor,
    },

    /// A player joined the server. `player` carries the display name.
    PlayerJoin {
        #[serde(rename = "player")]
        name: String,
        uuid: String,
    },

    /// A player left the server.
    PlayerLeave {
        #[serde(rename = "player")]
        name: String,
        uuid: String,
    },
}

impl OutboundMessage {
    /// The wire tag of this message, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::Heartbeat { .. } => "heartbeat",
            Self::ChunkData { .. } => "chunk_data",
            Self::AreaData { .. } => "area_data",
            Self::PlayerUpdate { .. } => "player_update",
            Self::WorldUpdate { .. } => "world_update",
            Self::BlockUpdate { .. } => "block_update",
            Self::PlayerJoin { .. } => "player_join",
            Self::PlayerLeave { .. } => "player_leave",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The web map client parses these exact JSON shapes, so each test pins
    //! down the tag and field names of one variant.

    use super::*;

    fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    // =====================================================================
    // InboundMessage
    // =====================================================================

    #[test]
    fn test_subscribe_chunks_uses_camel_case_fields() {
        let json = to_json(&InboundMessage::SubscribeChunks {
            center_x: 3,
            center_z: -7,
            radius: 2,
        });
        assert_eq!(json["type"], "subscribe_chunks");
        assert_eq!(json["centerX"], 3);
        assert_eq!(json["centerZ"], -7);
        assert_eq!(json["radius"], 2);
    }

    #[test]
    fn test_heartbeat_request_is_tag_only() {
        let json = to_json(&InboundMessage::Heartbeat);
        assert_eq!(json, serde_json::json!({ "type": "heartbeat" }));
    }

    #[test]
    fn test_known_tags_match_variants() {
        assert!(InboundMessage::is_known_tag("subscribe_chunks"));
        assert!(InboundMessage::is_known_tag("heartbeat"));
        assert!(InboundMessage::is_known_tag("request_area"));
        assert!(!InboundMessage::is_known_tag("Heartbeat"));
        assert!(!InboundMessage::is_known_tag(""));
    }

    #[test]
    fn test_inbound_tag_reports_unrecognized_name() {
        let msg = InboundMessage::Unrecognized { tag: "fly".into() };
        assert_eq!(msg.tag(), "fly");
        assert_eq!(InboundMessage::Heartbeat.tag(), "heartbeat");
    }

    // =====================================================================
    // OutboundMessage
    // =====================================================================

    #[test]
    fn test_initial_json_format() {
        let json = to_json(&OutboundMessage::Initial {
            message: "Connected to Minecraft server".into(),
        });
        assert_eq!(json["type"], "initial");
        assert_eq!(json["message"], "Connected to Minecraft server");
    }

    #[test]
    fn test_heartbeat_reply_json_format() {
        let json = to_json(&OutboundMessage::Heartbeat {
            timestamp: 1_700_000_000_000,
        });
        assert_eq!(
            json,
            serde_json::json!({ "type": "heartbeat", "timestamp": 1_700_000_000_000u64 })
        );
    }

    #[test]
    fn test_chunk_data_carries_block_list() {
        let json = to_json(&OutboundMessage::ChunkData {
            blocks: vec![BlockDescriptor::new(1, 64, 2, "STONE")],
        });
        assert_eq!(json["type"], "chunk_data");
        assert_eq!(json["blocks"][0]["t"], "STONE");
        assert_eq!(json["blocks"][0]["y"], 64);
    }

    #[test]
    fn test_area_data_empty_blocks_is_empty_array() {
        let json = to_json(&OutboundMessage::AreaData { blocks: vec![] });
        assert_eq!(json["type"], "area_data");
        assert_eq!(json["blocks"], serde_json::json!([]));
    }

    #[test]
    fn test_block_update_nests_block_object() {
        let json = to_json(&OutboundMessage::BlockUpdate {
            action: BlockAction::Place,
            block: BlockDescriptor::new(10, 70, -5, "OAK_STAIRS")
                .with_state(Some("facing=north".into())),
        });
        assert_eq!(json["type"], "block_update");
        assert_eq!(json["action"], "place");
        assert_eq!(json["block"]["x"], 10);
        assert_eq!(json["block"]["t"], "OAK_STAIRS");
        assert_eq!(json["block"]["s"], "facing=north");
        assert!(json["block"].get("b").is_none());
    }

    #[test]
    fn test_player_join_uses_player_key_for_name() {
        let json = to_json(&OutboundMessage::PlayerJoin {
            name: "Alice".into(),
            uuid: "u1".into(),
        });
        assert_eq!(
            json,
            serde_json::json!({ "type": "player_join", "player": "Alice", "uuid": "u1" })
        );
    }

    #[test]
    fn test_player_leave_json_format() {
        let json = to_json(&OutboundMessage::PlayerLeave {
            name: "Bob".into(),
            uuid: "u2".into(),
        });
        assert_eq!(json["type"], "player_leave");
        assert_eq!(json["player"], "Bob");
    }

    #[test]
    fn test_world_update_nests_world_object() {
        let json = to_json(&OutboundMessage::WorldUpdate {
            world: WorldSnapshot {
                name: "world".into(),
                time: 6000,
                storm: true,
                thundering: false,
                online_players: 3,
            },
        });
        assert_eq!(json["type"], "world_update");
        assert_eq!(json["world"]["time"], 6000);
        assert_eq!(json["world"]["onlinePlayers"], 3);
    }

    #[test]
    fn test_outbound_tag_matches_serialized_type() {
        let msgs = [
            OutboundMessage::Initial { message: String::new() },
            OutboundMessage::Heartbeat { timestamp: 0 },
            OutboundMessage::PlayerUpdate { players: vec![] },
            OutboundMessage::PlayerLeave {
                name: String::new(),
                uuid: String::new(),
            },
        ];
        for msg in msgs {
            assert_eq!(to_json(&msg)["type"], msg.tag());
        }
    }

    #[test]
    fn test_unknown_outbound_type_fails_to_decode() {
        let result: Result<OutboundMessage, _> =
            serde_json::from_str(r#"{"type": "fly_to_moon", "speed": 9000}"#);
        assert!(result.is_err());
    }
}
