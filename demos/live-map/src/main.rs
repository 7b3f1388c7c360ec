//! Live-map demo: serves a simulated world to map clients.
//!
//! ```text
//! cargo run -p live-map -- [config.json]
//! ```
//!
//! `CROSSPLAY_BIND` overrides the bind address from the config file.
//! `RUST_LOG` controls log output (default `info`).

mod world;

use std::time::Duration;

use crossplay::prelude::*;

use crate::world::{SimWorld, WorldEvent};

const SEED: u64 = 0x6d61_70;
const START_PLAYERS: usize = 3;
const STEP_INTERVAL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn load_config(path: Option<&str>) -> Result<LiveConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => LiveConfig::default(),
    };
    if let Ok(addr) = std::env::var("CROSSPLAY_BIND") {
        config.bind_addr = addr;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Hands one simulated event to the server. Returns how many clients got it.
fn forward(events: &EventBridge<JsonCodec>, event: &WorldEvent) -> usize {
    match event {
        WorldEvent::Placed(block) => events.on_block_placed(block),
        WorldEvent::Broken(block) => events.on_block_broken(block),
        WorldEvent::Joined { uuid, name } => {
            tracing::info!(%name, "player joined");
            events.on_player_joined(uuid, name)
        }
        WorldEvent::Left { uuid, name } => {
            tracing::info!(%name, "player left");
            events.on_player_left(uuid, name)
        }
    }
}

async fn simulate(world: Arc<SimWorld>, events: EventBridge<JsonCodec>) {
    let mut interval = tokio::time::interval(STEP_INTERVAL);
    loop {
        interval.tick().await;
        for event in world.step() {
            forward(&events, &event);
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = std::env::args().nth(1);
    let config = load_config(path.as_deref())?;
    tracing::info!(
        addr = %config.bind_addr,
        player_ms = config.player_update_interval_ms,
        world_ms = config.world_update_interval_ms,
        "starting live map"
    );

    let world = Arc::new(SimWorld::new(SEED, START_PLAYERS));
    let server = CrossplayServer::builder()
        .config(config)
        .build(world.clone())
        .await?;
    tracing::info!(addr = ?server.local_addr()?, "listening");

    let simulation = tokio::spawn(simulate(world, server.hub().events()));

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
            }
        })
        .await?;

    simulation.abort();
    Ok(())
}
