//! Renderable View Model
//!
//! An owned snapshot of everything a renderer may show: remembered
//! terrain, the current field of view, entities on visible tiles, and
//! the player panel. Plain data with no references back into the
//! simulation, so it can cross a thread boundary freely.

use serde::{Serialize, Deserialize};

use crate::core::point::Point;
use crate::game::entity::{EntityId, EntityKind, ItemData, ItemKind, Stats, StatusEffect};
use crate::game::grid::Terrain;
use crate::game::state::{GamePhase, GameState, GameStats};

/// One tile as the renderer sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    /// Terrain kind
    pub terrain: Terrain,
    /// In the current field of view
    pub visible: bool,
    /// Remembered from earlier looks
    pub seen: bool,
}

/// A creature or floor item on a currently visible tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    /// Entity id
    pub id: EntityId,
    /// What it is
    pub kind: EntityKind,
    /// Where it stands
    pub position: Point,
    /// Current hit points (zero for items)
    pub health: u32,
    /// Hit point ceiling (zero for items)
    pub max_health: u32,
}

/// A carried item, resolved for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    /// Entity id of the item
    pub id: EntityId,
    /// Item category
    pub kind: ItemKind,
    /// Stack and magnitude
    pub data: ItemData,
}

/// The player panel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// The player's entity id
    pub id: EntityId,
    /// Current tile
    pub position: Point,
    /// Combat attributes
    pub stats: Stats,
    /// Active status effects
    pub statuses: Vec<StatusEffect>,
    /// Carried items in pickup order
    pub inventory: Vec<ItemView>,
    /// Wielded weapon, if any
    pub equipped: Option<EntityId>,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    /// Grid width in tiles
    pub width: i32,
    /// Grid height in tiles
    pub height: i32,
    /// Current level, 1-based
    pub depth: u32,
    /// Current round
    pub round: u32,
    /// Run phase
    pub phase: GamePhase,
    /// Tiles in row-major order
    pub tiles: Vec<TileView>,
    /// Entities whose tile is currently visible
    pub entities: Vec<EntityView>,
    /// Player panel; absent after the player's death
    pub player: Option<PlayerView>,
    /// Run statistics
    pub stats: GameStats,
}

impl ViewModel {
    /// Derive a frame from the current simulation state.
    ///
    /// Monsters and floor items are reported only when their tile is in
    /// the current field of view; the ever-seen memory controls which
    /// terrain is drawn at all.
    pub fn from_state(state: &GameState) -> Self {
        let grid = &state.grid;

        let tiles = grid
            .points()
            .map(|p| TileView {
                terrain: grid.terrain(p),
                visible: state.visibility.visible(p),
                seen: state.visibility.seen(p),
            })
            .collect();

        let carried: std::collections::BTreeSet<EntityId> = state
            .registry
            .entities()
            .flat_map(|e| e.inventory.iter().copied())
            .collect();

        let entities = state
            .registry
            .entities()
            .filter(|e| !carried.contains(&e.id))
            .filter(|e| state.visibility.visible(e.position))
            .map(|e| EntityView {
                id: e.id,
                kind: e.kind,
                position: e.position,
                health: e.stats.health,
                max_health: e.stats.max_health,
            })
            .collect();

        let player = state.registry.get(state.player).map(|p| PlayerView {
            id: p.id,
            position: p.position,
            stats: p.stats,
            statuses: p.statuses.clone(),
            inventory: p
                .inventory
                .iter()
                .filter_map(|id| {
                    let item = state.registry.get(*id)?;
                    let EntityKind::Item(kind) = item.kind else {
                        return None;
                    };
                    Some(ItemView {
                        id: *id,
                        kind,
                        data: item.item?,
                    })
                })
                .collect(),
            equipped: p.equipped,
        });

        Self {
            width: grid.width(),
            height: grid.height(),
            depth: state.depth,
            round: state.round,
            phase: state.phase,
            tiles,
            entities,
            player,
            stats: state.stats,
        }
    }

    /// Tile view at a coordinate, if in bounds.
    pub fn tile(&self, p: Point) -> Option<&TileView> {
        if p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height {
            self.tiles.get((p.y * self.width + p.x) as usize)
        } else {
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
