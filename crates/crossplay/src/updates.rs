//! Periodic `player_update` and `world_update` broadcasts.

use std::sync::Arc;
use std::time::Duration;

use crossplay_protocol::{Codec, OutboundMessage};
use crossplay_tick::{PeriodicTask, TickConfig};

use crate::broadcast::Broadcaster;
use crate::world::{WorldError, WorldStore, run_blocking};

/// Spawns the task that pushes every online player each `period`.
pub(crate) fn spawn_player_updates<C: Codec>(
    broadcaster: Broadcaster<C>,
    store: Arc<dyn WorldStore>,
    period: Duration,
) -> PeriodicTask {
    spawn_update("player-updates", broadcaster, store, period, |store| {
        let players = store.players()?;
        Ok(OutboundMessage::PlayerUpdate { players })
    })
}

/// Spawns the task that pushes world metadata each `period`.
pub(crate) fn spawn_world_updates<C: Codec>(
    broadcaster: Broadcaster<C>,
    store: Arc<dyn WorldStore>,
    period: Duration,
) -> PeriodicTask {
    spawn_update("world-updates", broadcaster, store, period, |store| {
        let world = store.world_snapshot()?;
        Ok(OutboundMessage::WorldUpdate { world })
    })
}

/// One update loop: first tick right away, then every `period`.
///
/// A tick with no registered session is skipped without touching the
/// store. A failed or panicking store call is logged and only costs that
/// tick.
fn spawn_update<C, F>(
    name: &'static str,
    broadcaster: Broadcaster<C>,
    store: Arc<dyn WorldStore>,
    period: Duration,
    fetch: F,
) -> PeriodicTask
where
    C: Codec,
    F: Fn(&dyn WorldStore) -> Result<OutboundMessage, WorldError> + Copy + Send + Sync + 'static,
{
    PeriodicTask::spawn(name, TickConfig::every(period), move |info| {
        let broadcaster = broadcaster.clone();
        let store = Arc::clone(&store);
        async move {
            if broadcaster.registry().is_empty() {
                tracing::trace!(task = name, tick = info.tick, "no sessions, skipping update");
                return;
            }
            match run_blocking(&store, fetch).await {
                Ok(message) => {
                    broadcaster.broadcast(&message);
                }
                Err(e) => {
                    tracing::warn!(task = name, tick = info.tick, error = %e, "update skipped");
                }
            }
        }
    })
}
