//! Game State
//!
//! The simulation context threaded through every component call: grid,
//! registry, visibility, turn order, RNG, and run statistics. Created at
//! new-game, mutated only by the action resolver, torn down at game over.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::point::Point;
use crate::core::rng::DeterministicRng;
use crate::game::combat::CombatConfig;
use crate::game::entity::{
    EntityId, EntityKind, EntityRegistry, ItemData, ItemKind, Species, Stats,
};
use crate::game::error::CoreError;
use crate::game::events::GameEvent;
use crate::game::grid::{Grid, Terrain};
use crate::game::mapgen::{self, GeneratorConfig};
use crate::game::turn::TurnOrder;
use crate::game::visibility::{VisibilityState, VisionConfig};

// =============================================================================
// GAME ID
// =============================================================================

/// Unique game identifier (UUID as bytes).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct GameId(pub [u8; 16]);

impl GameId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create a fresh random id. Identity only; never feeds simulation
    /// randomness.
    pub fn generate() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Create from UUID string.
    pub fn from_uuid_str(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(|u| Self(*u.as_bytes()))
    }

    /// Convert to UUID string.
    pub fn to_uuid_string(&self) -> String {
        uuid::Uuid::from_bytes(self.0).to_string()
    }
}

// =============================================================================
// PHASE, STATS, CONFIG
// =============================================================================

/// Where the run stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Simulation is accepting intents
    #[default]
    Playing,
    /// The player died
    Dead,
    /// The player descended past the deepest level
    Won,
}

/// Running tally of what the player has done this game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    /// Tiles stepped on
    pub steps: u32,
    /// Monsters slain
    pub kills: u32,
    /// Potions drunk
    pub potions_drunk: u32,
    /// Food eaten
    pub food_eaten: u32,
    /// Scrolls read
    pub scrolls_read: u32,
    /// Gold collected
    pub gold: u32,
    /// Deepest level reached
    pub deepest_depth: u32,
}

impl GameStats {
    /// Fold another tally into this one. Counters add; the depth
    /// high-water mark keeps the maximum.
    pub fn merge(&mut self, other: &GameStats) {
        self.steps += other.steps;
        self.kills += other.kills;
        self.potions_drunk += other.potions_drunk;
        self.food_eaten += other.food_eaten;
        self.scrolls_read += other.scrolls_read;
        self.gold += other.gold;
        self.deepest_depth = self.deepest_depth.max(other.deepest_depth);
    }
}

/// How many monsters and items a level gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Monster count at depth 1
    pub base_monsters: u32,
    /// Extra monsters per level of depth
    pub monsters_per_depth: u32,
    /// Monster count ceiling
    pub max_monsters: u32,
    /// Item count at depth 1
    pub base_items: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            base_monsters: 3,
            monsters_per_depth: 1,
            max_monsters: 10,
            base_items: 3,
        }
    }
}

/// All simulation tunables in one place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Level construction
    pub generator: GeneratorConfig,
    /// Sight rules
    pub vision: VisionConfig,
    /// Combat rules
    pub combat: CombatConfig,
    /// Level population
    pub spawn: SpawnConfig,
}

/// Player starting attributes.
pub const PLAYER_STATS: Stats = Stats::new(20, 5, 2, 5);

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete simulation state for one run.
#[derive(Clone, Debug)]
pub struct GameState {
    /// Game identifier
    pub game_id: GameId,
    /// World seed; levels derive from it
    pub seed: u64,
    /// Current level, 1-based
    pub depth: u32,
    /// Current round, 1-based
    pub round: u32,
    /// Run phase
    pub phase: GamePhase,
    /// Current level grid
    pub grid: Grid,
    /// All entities on the current level
    pub registry: EntityRegistry,
    /// The player's entity id
    pub player: EntityId,
    /// Per-level visibility map
    pub visibility: VisibilityState,
    /// Whose action is due, this round
    pub turn_order: TurnOrder,
    /// The single simulation RNG stream
    pub rng: DeterministicRng,
    /// Run statistics
    pub stats: GameStats,
    /// Tunables
    pub config: GameConfig,

    pending_events: Vec<GameEvent>,
}

impl GameState {
    /// Start a new game: generate level 1, spawn the player at the entry
    /// tile, populate monsters and items, compute the initial field of
    /// view.
    pub fn new_game(game_id: GameId, seed: u64, config: GameConfig) -> Result<Self, CoreError> {
        let mut grid = mapgen::generate(seed, 1, &config.generator)?;
        let mut registry = EntityRegistry::new();
        let mut rng = DeterministicRng::new(seed);

        let entry = grid.entry;
        let player = registry.spawn_creature(&mut grid, EntityKind::Player, entry, PLAYER_STATS)?;
        populate_level(&mut grid, &mut registry, &mut rng, 1, &config.spawn, player);

        let mut visibility = VisibilityState::for_grid(&grid);
        visibility.refresh(&grid, grid.entry, &config.vision);

        let turn_order = TurnOrder::recompute(&registry);

        debug!(seed, entities = registry.len(), "new game started");

        Ok(Self {
            game_id,
            seed,
            depth: 1,
            round: 1,
            phase: GamePhase::Playing,
            grid,
            registry,
            player,
            visibility,
            turn_order,
            rng,
            stats: GameStats {
                deepest_depth: 1,
                ..GameStats::default()
            },
            config,
            pending_events: Vec::new(),
        })
    }

    /// Rebuild a state from snapshot parts. Spatial indexes are derived
    /// data and get reindexed here.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        game_id: GameId,
        seed: u64,
        depth: u32,
        round: u32,
        phase: GamePhase,
        mut grid: Grid,
        mut registry: EntityRegistry,
        player: EntityId,
        visibility: VisibilityState,
        turn_order: TurnOrder,
        rng: DeterministicRng,
        stats: GameStats,
        config: GameConfig,
    ) -> Self {
        registry.reindex(&mut grid);
        Self {
            game_id,
            seed,
            depth,
            round,
            phase,
            grid,
            registry,
            player,
            visibility,
            turn_order,
            rng,
            stats,
            config,
            pending_events: Vec::new(),
        }
    }

    /// Move the run to another level.
    ///
    /// The new grid is generated before anything is touched, so a
    /// `GenerationFailed` leaves the current level fully intact. The
    /// player and their carried items survive; everything else is
    /// repopulated for the new depth.
    pub fn change_level(&mut self, new_depth: u32, ascended: bool) -> Result<(), CoreError> {
        let new_grid = mapgen::generate(self.seed, new_depth, &self.config.generator)?;

        // Arrive on the staircase matching the direction of travel
        let arrival = if ascended {
            new_grid.stairs_down
        } else {
            new_grid.entry
        };

        self.registry.retain_only(self.player);
        if let Some(player) = self.registry.get_mut(self.player) {
            player.position = arrival;
        }
        self.grid = new_grid;
        self.registry.reindex(&mut self.grid);

        populate_level(
            &mut self.grid,
            &mut self.registry,
            &mut self.rng,
            new_depth,
            &self.config.spawn,
            self.player,
        );

        self.depth = new_depth;
        self.stats.deepest_depth = self.stats.deepest_depth.max(new_depth);
        self.visibility = VisibilityState::for_grid(&self.grid);
        self.visibility.refresh(&self.grid, arrival, &self.config.vision);
        self.turn_order = TurnOrder::recompute(&self.registry);

        debug!(depth = new_depth, ascended, "level changed");
        Ok(())
    }

    /// The player's current tile.
    pub fn player_position(&self) -> Option<Point> {
        self.registry.get(self.player).map(|e| e.position)
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.round, self.seed, |hasher| {
            hasher.update_u32(self.depth);
            hasher.update_u8(match self.phase {
                GamePhase::Playing => 0,
                GamePhase::Dead => 1,
                GamePhase::Won => 2,
            });

            // Grid terrain, row-major
            for p in self.grid.points() {
                hasher.update_u8(terrain_code(self.grid.terrain(p)));
            }

            // Entities in id order (BTreeMap guarantees this)
            for entity in self.registry.entities() {
                hasher.update_u32(entity.id.raw());
                hasher.update_point(entity.position);
                let (tag, sub) = kind_code(entity.kind);
                hasher.update_u8(tag);
                hasher.update_u8(sub);
                hasher.update_u32(entity.stats.health);
                hasher.update_u32(entity.stats.max_health);
                hasher.update_u32(entity.stats.attack);
                hasher.update_u32(entity.stats.defense);
                hasher.update_u32(entity.stats.speed);
                for item in &entity.inventory {
                    hasher.update_u32(item.raw());
                }
                for status in &entity.statuses {
                    hasher.update_u8(status.kind as u8);
                    hasher.update_u32(status.remaining);
                }
                hasher.update_u32(entity.equipped.map(|e| e.raw()).unwrap_or(u32::MAX));
            }

            // Turn order and RNG stream position
            for id in self.turn_order.ids() {
                hasher.update_u32(id.raw());
            }
            hasher.update_u32(self.turn_order.cursor() as u32);
            let rng_state = self.rng.state();
            hasher.update_u64(rng_state[0]);
            hasher.update_u64(rng_state[1]);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

fn terrain_code(terrain: Terrain) -> u8 {
    match terrain {
        Terrain::Floor => 0,
        Terrain::Wall => 1,
        Terrain::Door { open: false } => 2,
        Terrain::Door { open: true } => 3,
        Terrain::StairsUp => 4,
        Terrain::StairsDown => 5,
    }
}

fn kind_code(kind: EntityKind) -> (u8, u8) {
    match kind {
        EntityKind::Player => (0, 0),
        EntityKind::Monster(species) => (1, species as u8),
        EntityKind::Item(item) => (2, item as u8),
    }
}

// =============================================================================
// LEVEL POPULATION
// =============================================================================

/// Stock a freshly generated level with monsters and items, scaled to
/// depth. Placement draws from the shared RNG stream so population is
/// part of the deterministic replay.
fn populate_level(
    grid: &mut Grid,
    registry: &mut EntityRegistry,
    rng: &mut DeterministicRng,
    depth: u32,
    config: &SpawnConfig,
    player: EntityId,
) {
    let player_tile = registry.get(player).map(|e| e.position).unwrap_or(Point::ZERO);

    let monster_count = (config.base_monsters + depth * config.monsters_per_depth)
        .min(config.max_monsters);
    for _ in 0..monster_count {
        let species = random_species(rng, depth);
        if let Some(tile) = random_free_tile(grid, registry, rng, player_tile) {
            let _ = registry.spawn_creature(
                grid,
                EntityKind::Monster(species),
                tile,
                species.base_stats(depth),
            );
        }
    }

    let item_count = config.base_items + depth / 2;
    for _ in 0..item_count {
        let (kind, data) = random_item(rng, depth);
        if let Some(tile) = random_free_tile(grid, registry, rng, player_tile) {
            let _ = registry.spawn_item(grid, kind, tile, data);
        }
    }
}

/// Species weights shift with depth: shallow levels stay gentle, deep
/// ones mix in the heavies.
fn random_species(rng: &mut DeterministicRng, depth: u32) -> Species {
    let roll = rng.next_int(100);
    if depth <= 2 {
        match roll {
            0..=49 => Species::Zombie,
            50..=79 => Species::Ghost,
            _ => Species::SnakeMage,
        }
    } else if depth <= 5 {
        match roll {
            0..=29 => Species::Zombie,
            30..=49 => Species::Ghost,
            50..=69 => Species::SnakeMage,
            70..=89 => Species::Vampire,
            _ => Species::Mimic,
        }
    } else {
        match roll {
            0..=19 => Species::Zombie,
            20..=34 => Species::Ghost,
            35..=54 => Species::SnakeMage,
            55..=74 => Species::Vampire,
            75..=89 => Species::Ogre,
            _ => Species::Mimic,
        }
    }
}

fn random_item(rng: &mut DeterministicRng, depth: u32) -> (ItemKind, ItemData) {
    let roll = rng.next_int(100);
    match roll {
        0..=19 => {
            let bonus = 1 + (depth / 3) as i32 + rng.next_range(0, 2);
            (ItemKind::Weapon, ItemData::single(bonus))
        }
        20..=49 => (ItemKind::Potion, ItemData::single(rng.next_range(4, 8))),
        50..=69 => (ItemKind::Food, ItemData::single(2)),
        70..=84 => (ItemKind::Scroll, ItemData::single(0)),
        _ => {
            let gold = 10 * depth as i32 + rng.next_range(0, 20);
            (ItemKind::Treasure, ItemData::single(gold))
        }
    }
}

/// A passable, unoccupied tile that is not the player's. Bounded
/// sampling; a crowded level just spawns fewer things.
fn random_free_tile(
    grid: &Grid,
    registry: &EntityRegistry,
    rng: &mut DeterministicRng,
    exclude: Point,
) -> Option<Point> {
    for _ in 0..200 {
        let p = Point::new(
            rng.next_range(0, grid.width() - 1),
            rng.next_range(0, grid.height() - 1),
        );
        if p != exclude
            && grid.terrain(p) == Terrain::Floor
            && registry.blocker_at(p).is_none()
            && registry.items_at(p).is_empty()
        {
            return Some(p);
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================
