//! A small simulated world to serve the live map from.
//!
//! Terrain is a deterministic rolling surface; players wander about,
//! place and break blocks, and come and go. Edits are kept in memory and
//! overlay the generated terrain in every query.

use std::collections::HashMap;

use crossplay::prelude::*;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Widest chunk radius answered; larger requests are clamped.
pub const MAX_CHUNK_RADIUS: i32 = 4;

/// Largest box `area_blocks` scans.
pub const MAX_AREA_VOLUME: i64 = 32 * 32 * 32;

/// Chunk coordinates beyond this lie outside the world border.
pub const MAX_CHUNK_COORD: i32 = 1_875_000;

const WORLD_NAME: &str = "world";
const DAY_TICKS: u64 = 24_000;
const NAMES: &[&str] = &["Alex", "Steve", "Noor", "Kai", "Mina", "Ravi"];
const PLACEABLE: &[(&str, &str)] = &[
    ("OAK_PLANKS", "minecraft:oak_planks"),
    (
        "OAK_STAIRS",
        "minecraft:oak_stairs[facing=north,half=bottom,shape=straight,waterlogged=false]",
    ),
    ("GRASS_BLOCK", "minecraft:grass_block[snowy=false]"),
    ("OAK_LEAVES", "minecraft:oak_leaves[distance=1,persistent=true,waterlogged=false]"),
    ("TORCH", "minecraft:torch"),
];

/// Something that happened in the world during a simulation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    Placed(WorldBlock),
    Broken(WorldBlock),
    Joined { uuid: String, name: String },
    Left { uuid: String, name: String },
}

struct SimState {
    rng: StdRng,
    time: u64,
    storm: bool,
    thundering: bool,
    players: Vec<PlayerSnapshot>,
    /// Block edits over the generated terrain: `Some(type)` placed, `None`
    /// broken (air).
    edits: HashMap<(i32, i32, i32), Option<(String, String)>>,
    next_player: u64,
}

/// The simulated world.
pub struct SimWorld {
    state: Mutex<SimState>,
}

impl SimWorld {
    /// A world with `players` players already online.
    pub fn new(seed: u64, players: usize) -> Self {
        let mut state = SimState {
            rng: StdRng::seed_from_u64(seed),
            time: 1_000,
            storm: false,
            thundering: false,
            players: Vec::new(),
            edits: HashMap::new(),
            next_player: 0,
        };
        for _ in 0..players {
            state.spawn_player();
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Advances the world by one step and reports what happened.
    pub fn step(&self) -> Vec<WorldEvent> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut events = Vec::new();

        state.time = (state.time + 100) % DAY_TICKS;
        if state.rng.random_bool(0.02) {
            state.storm = !state.storm;
            state.thundering = state.storm && state.rng.random_bool(0.3);
        }

        let SimState { rng, players, .. } = &mut *state;
        for player in players.iter_mut() {
            player.x += rng.random_range(-1.5..1.5);
            player.z += rng.random_range(-1.5..1.5);
            player.y = f64::from(surface_height(player.x as i32, player.z as i32) + 1);
            player.yaw = (player.yaw + rng.random_range(-30.0..30.0)).rem_euclid(360.0);
            player.pitch = rng.random_range(-20.0..20.0);
        }

        if !state.players.is_empty() && state.rng.random_bool(0.3) {
            events.push(state.edit_near_player());
        }

        if state.players.len() < NAMES.len() && state.rng.random_bool(0.03) {
            let (uuid, name) = state.spawn_player();
            events.push(WorldEvent::Joined { uuid, name });
        } else if state.players.len() > 1 && state.rng.random_bool(0.02) {
            let index = state.rng.random_range(0..state.players.len());
            let gone = state.players.remove(index);
            events.push(WorldEvent::Left {
                uuid: gone.uuid,
                name: gone.name,
            });
        }

        events
    }
}

impl SimState {
    fn block_at(&self, x: i32, y: i32, z: i32) -> Option<BlockDescriptor> {
        if let Some(edit) = self.edits.get(&(x, y, z)) {
            return edit.as_ref().map(|(block_type, data)| {
                BlockDescriptor::new(x, y, z, block_type.as_str())
                    .with_state(formatted_state(data).map(str::to_string))
            });
        }
        let surface = surface_height(x, z);
        let block_type = match y {
            y if y > surface => return None,
            y if y == surface && surface < 63 => "SAND",
            y if y == surface => "GRASS_BLOCK",
            y if y > surface - 4 => "DIRT",
            _ => "STONE",
        };
        let block = BlockDescriptor::new(x, y, z, block_type);
        Some(if block_type == "GRASS_BLOCK" {
            block.with_state(Some("snowy=false".into()))
        } else {
            block
        })
    }

    fn surface_block(&self, x: i32, z: i32) -> Option<BlockDescriptor> {
        let top = self
            .edits
            .keys()
            .filter(|(ex, _, ez)| *ex == x && *ez == z)
            .map(|(_, ey, _)| *ey)
            .max()
            .unwrap_or(i32::MIN)
            .max(surface_height(x, z));
        (0..=top - surface_height(x, z) + 4)
            .map(|down| top - down)
            .find_map(|y| self.block_at(x, y, z))
    }

    fn spawn_player(&mut self) -> (String, String) {
        let n = self.next_player;
        self.next_player += 1;
        let name = format!("{}{}", NAMES[n as usize % NAMES.len()], n / NAMES.len() as u64);
        let uuid = format!("00000000-0000-4000-8000-{n:012x}");
        let x = self.rng.random_range(-32.0..32.0);
        let z = self.rng.random_range(-32.0..32.0);
        self.players.push(PlayerSnapshot {
            name: name.clone(),
            uuid: uuid.clone(),
            world: WORLD_NAME.to_string(),
            x,
            y: f64::from(surface_height(x as i32, z as i32) + 1),
            z,
            yaw: 0.0,
            pitch: 0.0,
        });
        (uuid, name)
    }

    fn edit_near_player(&mut self) -> WorldEvent {
        let index = self.rng.random_range(0..self.players.len());
        let (px, pz) = (self.players[index].x as i32, self.players[index].z as i32);
        let x = px + self.rng.random_range(-3..=3);
        let z = pz + self.rng.random_range(-3..=3);

        if self.rng.random_bool(0.6) {
            let (block_type, data) = PLACEABLE[self.rng.random_range(0..PLACEABLE.len())];
            let y = surface_height(x, z) + 1;
            let edit = Some((block_type.to_string(), data.to_string()));
            self.edits.insert((x, y, z), edit);
            WorldEvent::Placed(world_block(x, y, z, block_type, data))
        } else {
            let y = surface_height(x, z);
            let previous = self.edits.insert((x, y, z), None);
            let block_type = match previous {
                Some(Some((t, _))) => t,
                _ => "GRASS_BLOCK".to_string(),
            };
            WorldEvent::Broken(world_block(x, y, z, &block_type, "minecraft:air"))
        }
    }
}

fn world_block(x: i32, y: i32, z: i32, block_type: &str, data: &str) -> WorldBlock {
    WorldBlock {
        x,
        y,
        z,
        block_type: block_type.to_string(),
        block_data: data.to_string(),
        biome: biome(x, z).to_string(),
    }
}

/// Number of blocks spanned by two corner coordinates, inclusive.
fn extent(a: i32, b: i32) -> i64 {
    (i64::from(a) - i64::from(b)).abs() + 1
}

/// Gently rolling terrain between y=61 and y=67.
fn surface_height(x: i32, z: i32) -> i32 {
    64 + ((x / 4 + z / 6).rem_euclid(7) - 3)
}

fn biome(x: i32, z: i32) -> &'static str {
    if (x.div_euclid(64) + z.div_euclid(64)).rem_euclid(2) == 0 {
        "PLAINS"
    } else {
        "FOREST"
    }
}

impl WorldStore for SimWorld {
    fn chunk_blocks(
        &self,
        center_x: i32,
        center_z: i32,
        radius: i32,
    ) -> Result<Vec<BlockDescriptor>, WorldError> {
        if radius < 0 {
            return Err(WorldError::Query(format!("negative radius {radius}")));
        }
        let border = -MAX_CHUNK_COORD..=MAX_CHUNK_COORD;
        if !border.contains(&center_x) || !border.contains(&center_z) {
            return Err(WorldError::Query(format!(
                "chunk ({center_x}, {center_z}) is outside the world border"
            )));
        }
        let radius = radius.min(MAX_CHUNK_RADIUS);
        let state = self.state.lock();
        let mut blocks = Vec::new();
        for cx in center_x - radius..=center_x + radius {
            for cz in center_z - radius..=center_z + radius {
                for x in cx * 16..cx * 16 + 16 {
                    for z in cz * 16..cz * 16 + 16 {
                        blocks.extend(state.surface_block(x, z));
                    }
                }
            }
        }
        Ok(blocks)
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
        let volume = extent(x1, x2)
            .checked_mul(extent(y1, y2))
            .and_then(|v| v.checked_mul(extent(z1, z2)))
            .filter(|v| *v <= MAX_AREA_VOLUME)
            .ok_or_else(|| {
                WorldError::Query(format!("area exceeds {MAX_AREA_VOLUME} blocks"))
            })?;
        tracing::trace!(volume, "area query");

        let (xs, ys, zs) = (
            x1.min(x2)..=x1.max(x2),
            y1.min(y2)..=y1.max(y2),
            z1.min(z2)..=z1.max(z2),
        );
        let state = self.state.lock();
        let mut blocks = Vec::new();
        for x in xs {
            for y in ys.clone() {
                for z in zs.clone() {
                    blocks.extend(state.block_at(x, y, z));
                }
            }
        }
        Ok(blocks)
    }

    fn players(&self) -> Result<Vec<PlayerSnapshot>, WorldError> {
        Ok(self.state.lock().players.clone())
    }

    fn world_snapshot(&self) -> Result<WorldSnapshot, WorldError> {
        let state = self.state.lock();
        Ok(WorldSnapshot {
            name: WORLD_NAME.to_string(),
            time: state.time,
            storm: state.storm,
            thundering: state.thundering,
            online_players: state.players.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_blocks_one_surface_block_per_column() {
        let world = SimWorld::new(1, 0);
        let blocks = world.chunk_blocks(0, 0, 1).unwrap();
        assert_eq!(blocks.len(), 9 * 16 * 16);
        assert!(blocks.iter().all(|b| b.y == surface_height(b.x, b.z)));
    }

    #[test]
    fn test_chunk_radius_is_clamped() {
        let world = SimWorld::new(1, 0);
        let side = (2 * MAX_CHUNK_RADIUS + 1) as usize * 16;
        assert_eq!(world.chunk_blocks(0, 0, 50).unwrap().len(), side * side);
    }

    #[test]
    fn test_negative_radius_is_an_error() {
        let world = SimWorld::new(1, 0);
        assert!(matches!(world.chunk_blocks(0, 0, -1), Err(WorldError::Query(_))));
    }

    #[test]
    fn test_area_blocks_accepts_inverted_corners() {
        let world = SimWorld::new(1, 0);
        let a = world.area_blocks(0, 50, 0, 3, 70, 3).unwrap();
        let b = world.area_blocks(3, 70, 3, 0, 50, 0).unwrap();
        assert_eq!(a.len(), b.len());
        assert!(!a.is_empty());
        assert!(a.iter().all(|blk| blk.y <= surface_height(blk.x, blk.z)));
    }

    #[test]
    fn test_oversized_area_is_refused() {
        let world = SimWorld::new(1, 0);
        assert!(world.area_blocks(0, 0, 0, 100, 100, 100).is_err());
    }

    #[test]
    fn test_extreme_area_corners_are_refused() {
        let world = SimWorld::new(1, 0);
        let result = world.area_blocks(i32::MIN, i32::MIN, i32::MIN, i32::MAX, i32::MAX, i32::MAX);
        assert!(matches!(result, Err(WorldError::Query(_))));
        assert_eq!(extent(i32::MIN, i32::MAX), 1 << 32);
    }

    #[test]
    fn test_chunk_outside_border_is_an_error() {
        let world = SimWorld::new(1, 0);
        let result = world.chunk_blocks(i32::MIN, 0, 1);
        assert!(matches!(result, Err(WorldError::Query(_))));
        assert!(world.chunk_blocks(MAX_CHUNK_COORD, -MAX_CHUNK_COORD, 1).is_ok());
    }

    #[test]
    fn test_snapshot_counts_players() {
        let world = SimWorld::new(7, 3);
        assert_eq!(world.players().unwrap().len(), 3);
        let snapshot = world.world_snapshot().unwrap();
        assert_eq!(snapshot.online_players, 3);
        assert_eq!(snapshot.name, "world");
    }

    #[test]
    fn test_placed_blocks_show_up_in_queries() {
        let world = SimWorld::new(42, 2);
        let placed = (0..500)
            .flat_map(|_| world.step())
            .find_map(|event| match event {
                WorldEvent::Placed(block) => Some(block),
                _ => None,
            })
            .expect("some block gets placed within 500 steps");

        let found = world
            .area_blocks(placed.x, placed.y, placed.z, placed.x, placed.y, placed.z)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].block_type, placed.block_type);
    }

    #[test]
    fn test_time_wraps_around_a_day() {
        let world = SimWorld::new(3, 1);
        for _ in 0..300 {
            world.step();
        }
        assert!(world.world_snapshot().unwrap().time < DAY_TICKS);
    }
}
