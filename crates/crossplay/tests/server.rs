//! Integration tests for the Crossplay server, handler, and full connection flow.

use std::time::Duration;

use crossplay::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Mock world
// =========================================================================

/// A tiny flat world: every query returns one block per corner/center it
/// was asked about, and one player is always online.
struct FlatWorld;

impl WorldStore for FlatWorld {
    fn chunk_blocks(
        &self,
        center_x: i32,
        center_z: i32,
        radius: i32,
    ) -> Result<Vec<BlockDescriptor>, WorldError> {
        Ok(vec![
            BlockDescriptor::new(center_x * 16, 63, center_z * 16, "GRASS_BLOCK")
                .with_state(Some("snowy=false".into())),
            BlockDescriptor::new(center_x * 16, 62 - radius, center_z * 16, "DIRT"),
        ])
    }

    fn area_blocks(
        &self,
        x1: i32,
        y1: i32,
        z1: i32,
        x2: i32,
        y2: i32,
        z2: i32,
    ) -> Result<Vec<BlockDescriptor>, WorldError> {
        Ok(vec![
            BlockDescriptor::new(x1, y1, z1, "STONE"),
            BlockDescriptor::new(x2, y2, z2, "STONE"),
        ])
    }

    fn players(&self) -> Result<Vec<PlayerSnapshot>, WorldError> {
        Ok(vec![PlayerSnapshot {
            name: "Alice".into(),
            uuid: "u1".into(),
            world: "world".into(),
            x: 12.5,
            y: 64.0,
            z: -3.5,
            yaw: 180.0,
            pitch: 10.0,
        }])
    }

    fn world_snapshot(&self) -> Result<WorldSnapshot, WorldError> {
        Ok(WorldSnapshot {
            name: "world".into(),
            time: 6000,
            storm: false,
            thundering: false,
            online_players: 1,
        })
    }
}

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(5);

/// Periodic updates far enough apart that only the immediate (and skipped,
/// since nobody is connected yet) first tick ever fires during a test.
fn quiet_config() -> LiveConfig {
    LiveConfig::default()
        .with_player_update_interval(Duration::from_secs(3600))
        .with_world_update_interval(Duration::from_secs(3600))
}

/// Starts a server on a random port and returns its address and hub.
async fn start_server(config: LiveConfig) -> (String, LiveHub) {
    let server = CrossplayServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .build(Arc::new(FlatWorld))
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let hub = server.hub().clone();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, hub)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

/// Connects and consumes the welcome message.
async fn connect_welcomed(addr: &str) -> ClientWs {
    let mut ws = connect(addr).await;
    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "initial");
    ws
}

async fn send_json(ws: &mut ClientWs, text: &str) {
    ws.send(Message::Text(text.into())).await.expect("send");
}

async fn next_json(ws: &mut ClientWs) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("recv");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("server sends JSON");
        }
    }
}

/// Reads frames until one of type `kind` arrives.
async fn next_of_type(ws: &mut ClientWs, kind: &str) -> serde_json::Value {
    loop {
        let json = next_json(ws).await;
        if json["type"] == kind {
            return json;
        }
    }
}

/// Asserts that nothing arrives on `ws` for a short while.
async fn assert_no_frame(ws: &mut ClientWs) {
    let quiet = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(quiet.is_err(), "unexpected frame: {quiet:?}");
}

async fn wait_for_sessions(hub: &LiveHub, count: usize) {
    tokio::time::timeout(WAIT, async {
        while hub.session_count() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session count never reached");
}

// =========================================================================
// Connect
// =========================================================================

#[tokio::test]
async fn test_initial_message_is_first_frame() {
    let (addr, hub) = start_server(quiet_config()).await;
    let mut ws = connect(&addr).await;

    let first = next_json(&mut ws).await;
    assert_eq!(
        first,
        serde_json::json!({ "type": "initial", "message": "Connected to Minecraft server" })
    );
    wait_for_sessions(&hub, 1).await;
}

#[tokio::test]
async fn test_custom_welcome_message() {
    let (addr, _hub) = start_server(quiet_config().with_welcome_message("hello map")).await;
    let mut ws = connect(&addr).await;

    let first = next_json(&mut ws).await;
    assert_eq!(first["message"], "hello map");
}

#[tokio::test]
async fn test_silent_peer_does_not_block_other_clients() {
    let (addr, hub) = start_server(quiet_config()).await;

    // Opens a TCP connection and never sends the upgrade request.
    let _silent = tokio::net::TcpStream::connect(&addr).await.expect("tcp connect");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut ws = tokio::time::timeout(Duration::from_secs(3), connect(&addr))
        .await
        .expect("handshake must not wait behind the silent peer");
    assert_eq!(next_json(&mut ws).await["type"], "initial");
    wait_for_sessions(&hub, 1).await;
}

// =========================================================================
// Requests
// =========================================================================

#[tokio::test]
async fn test_heartbeat_roundtrip() {
    let (addr, _hub) = start_server(quiet_config()).await;
    let mut ws = connect_welcomed(&addr).await;

    send_json(&mut ws, r#"{"type":"heartbeat"}"#).await;
    let reply = next_json(&mut ws).await;

    assert_eq!(reply["type"], "heartbeat");
    assert!(reply["timestamp"].as_u64().expect("numeric timestamp") > 0);
}

#[tokio::test]
async fn test_subscribe_chunks_returns_chunk_data() {
    let (addr, _hub) = start_server(quiet_config()).await;
    let mut ws = connect_welcomed(&addr).await;

    send_json(
        &mut ws,
        r#"{"type":"subscribe_chunks","centerX":0,"centerZ":0,"radius":2}"#,
    )
    .await;
    let reply = next_json(&mut ws).await;

    assert_eq!(reply["type"], "chunk_data");
    let blocks = reply["blocks"].as_array().expect("blocks array");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["t"], "GRASS_BLOCK");
    assert_eq!(blocks[0]["s"], "snowy=false");
    assert_eq!(blocks[1]["y"], 60);
}

#[tokio::test]
async fn test_request_area_returns_area_data() {
    let (addr, _hub) = start_server(quiet_config()).await;
    let mut ws = connect_welcomed(&addr).await;

    send_json(
        &mut ws,
        r#"{"type":"request_area","x1":5,"y1":70,"z1":5,"x2":-5,"y2":60,"z2":-5}"#,
    )
    .await;
    let reply = next_json(&mut ws).await;

    assert_eq!(reply["type"], "area_data");
    assert_eq!(reply["blocks"][0]["x"], 5);
    assert_eq!(reply["blocks"][1]["x"], -5);
}

#[tokio::test]
async fn test_replies_reach_only_the_requesting_client() {
    let (addr, hub) = start_server(quiet_config()).await;
    let mut asker = connect_welcomed(&addr).await;
    let mut bystander = connect_welcomed(&addr).await;
    wait_for_sessions(&hub, 2).await;

    send_json(&mut asker, r#"{"type":"heartbeat"}"#).await;
    assert_eq!(next_json(&mut asker).await["type"], "heartbeat");
    send_json(
        &mut asker,
        r#"{"type":"subscribe_chunks","centerX":0,"centerZ":0,"radius":1}"#,
    )
    .await;
    assert_eq!(next_json(&mut asker).await["type"], "chunk_data");
    send_json(
        &mut asker,
        r#"{"type":"request_area","x1":0,"y1":60,"z1":0,"x2":1,"y2":61,"z2":1}"#,
    )
    .await;
    assert_eq!(next_json(&mut asker).await["type"], "area_data");

    assert_no_frame(&mut bystander).await;
    assert_no_frame(&mut asker).await;
}

#[tokio::test]
async fn test_malformed_messages_keep_connection_open() {
    let (addr, hub) = start_server(quiet_config()).await;
    let mut ws = connect_welcomed(&addr).await;

    send_json(&mut ws, "definitely not json").await;
    send_json(&mut ws, r#"{"radius":2}"#).await;
    send_json(&mut ws, r#"{"type":"fly","speed":9000}"#).await;
    send_json(&mut ws, r#"{"type":"heartbeat"}"#).await;

    // The only reply is to the heartbeat.
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "heartbeat");
    assert_eq!(hub.session_count(), 1);
}

#[tokio::test]
async fn test_binary_frame_is_read_as_text() {
    let (addr, _hub) = start_server(quiet_config()).await;
    let mut ws = connect_welcomed(&addr).await;

    ws.send(Message::Binary(br#"{"type":"heartbeat"}"#.to_vec().into()))
        .await
        .expect("send");
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "heartbeat");
}

// =========================================================================
// Broadcasts
// =========================================================================

#[tokio::test]
async fn test_player_join_reaches_both_clients() {
    let (addr, hub) = start_server(quiet_config()).await;
    let mut a = connect_welcomed(&addr).await;
    let mut b = connect_welcomed(&addr).await;
    wait_for_sessions(&hub, 2).await;

    let delivered = hub.events().on_player_joined("u1", "Alice");
    assert_eq!(delivered, 2);

    for ws in [&mut a, &mut b] {
        let msg = next_json(ws).await;
        assert_eq!(
            msg,
            serde_json::json!({ "type": "player_join", "player": "Alice", "uuid": "u1" })
        );
    }
}

#[tokio::test]
async fn test_block_placed_carries_biome_for_grass() {
    let (addr, hub) = start_server(quiet_config()).await;
    let mut ws = connect_welcomed(&addr).await;
    wait_for_sessions(&hub, 1).await;

    hub.events().on_block_placed(&WorldBlock {
        x: 1,
        y: 64,
        z: 2,
        block_type: "GRASS_BLOCK".into(),
        block_data: "minecraft:grass_block[snowy=false]".into(),
        biome: "PLAINS".into(),
    });

    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "block_update");
    assert_eq!(msg["action"], "place");
    assert_eq!(msg["block"]["s"], "snowy=false");
    assert_eq!(msg["block"]["b"], "PLAINS");
}

#[tokio::test]
async fn test_periodic_updates_reach_client() {
    let config = LiveConfig::default()
        .with_player_update_interval(Duration::from_millis(20))
        .with_world_update_interval(Duration::from_millis(40));
    let (addr, _hub) = start_server(config).await;
    let mut ws = connect_welcomed(&addr).await;

    let players = next_of_type(&mut ws, "player_update").await;
    assert_eq!(players["players"][0]["name"], "Alice");
    assert_eq!(players["players"][0]["world"], "world");

    let world = next_of_type(&mut ws, "world_update").await;
    assert_eq!(world["world"]["time"], 6000);
    assert_eq!(world["world"]["onlinePlayers"], 1);
}

// =========================================================================
// Disconnect and shutdown
// =========================================================================

#[tokio::test]
async fn test_client_close_unregisters_session() {
    let (addr, hub) = start_server(quiet_config()).await;
    let mut ws = connect_welcomed(&addr).await;
    wait_for_sessions(&hub, 1).await;

    ws.close(None).await.expect("close");
    wait_for_sessions(&hub, 0).await;

    // Nobody is left to notify.
    assert_eq!(hub.events().on_player_left("u1", "Alice"), 0);
}

#[tokio::test]
async fn test_run_until_stops_updates_and_clears_registry() {
    let server = CrossplayServer::builder()
        .config(
            LiveConfig::default()
                .with_player_update_interval(Duration::from_millis(20))
                .with_world_update_interval(Duration::from_millis(20)),
        )
        .bind("127.0.0.1:0")
        .build(Arc::new(FlatWorld))
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    let hub = server.hub().clone();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let mut ws = connect_welcomed(&addr).await;
    next_of_type(&mut ws, "player_update").await;
    assert!(hub.updates_running());

    stop_tx.send(()).expect("server still running");
    tokio::time::timeout(WAIT, running)
        .await
        .expect("server stops")
        .expect("no panic")
        .expect("clean shutdown");

    assert!(!hub.updates_running());
    assert_eq!(hub.session_count(), 0);
}
