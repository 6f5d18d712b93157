//! Entities and the Entity Registry
//!
//! The registry owns every entity in the current level (player, monsters,
//! items) keyed by a monotonic id, plus the spatial indexes the resolver
//! queries. Uses BTreeMap throughout for deterministic iteration order.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::point::Point;
use crate::game::error::CoreError;
use crate::game::grid::Grid;

// =============================================================================
// ENTITY ID
// =============================================================================

/// Unique entity identifier.
///
/// Ids are assigned from a monotonic counter, so ordering by id equals
/// insertion order. `EntityRegistry::entities()` relies on this for
/// deterministic turn processing.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Create from a raw id value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw id value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// KINDS
// =============================================================================

/// Monster species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Species {
    /// Slow, sturdy chaser
    Zombie = 0,
    /// Fast chaser that leeches health on hit
    Vampire = 1,
    /// Erratic wanderer
    Ghost = 2,
    /// Heavy hitter, short aggression range
    Ogre = 3,
    /// Quick caster that can put targets to sleep
    SnakeMage = 4,
    /// Lies in wait until the player comes close
    Mimic = 5,
}

impl Species {
    /// Base stats for this species at the given depth. Deeper levels
    /// spawn tougher instances of the same species.
    pub fn base_stats(self, depth: u32) -> Stats {
        let d = depth;
        match self {
            Species::Zombie => Stats::new(6 + d, 3 + d / 2, 1, 4),
            Species::Vampire => Stats::new(8 + d, 4 + d / 2, 2, 6),
            Species::Ghost => Stats::new(4 + d / 2, 2 + d / 2, 0, 7),
            Species::Ogre => Stats::new(12 + 2 * d, 6 + d, 3, 3),
            Species::SnakeMage => Stats::new(6 + d, 3 + d / 2, 1, 8),
            Species::Mimic => Stats::new(8 + d, 4 + d / 2, 2, 2),
        }
    }
}

/// Item categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemKind {
    /// Equippable; modifier adds to attack
    Weapon = 0,
    /// Consumable; modifier is hit points restored
    Potion = 1,
    /// Consumable; small fixed heal
    Food = 2,
    /// Consumable; reveals the level layout
    Scroll = 3,
    /// Gold; converts to score on pickup
    Treasure = 4,
}

/// What an entity is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// The player character
    Player,
    /// A hostile creature
    Monster(Species),
    /// An item lying on the floor or carried in an inventory
    Item(ItemKind),
}

impl EntityKind {
    /// Creatures act in the turn order; items do not.
    #[inline]
    pub fn is_creature(self) -> bool {
        matches!(self, EntityKind::Player | EntityKind::Monster(_))
    }

    /// Creatures block their tile; items can share one.
    #[inline]
    pub fn blocks(self) -> bool {
        self.is_creature()
    }
}

// =============================================================================
// STATS AND STATUS EFFECTS
// =============================================================================

/// Creature combat attributes. Items carry zeroed stats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Current hit points; the creature dies at 0
    pub health: u32,
    /// Hit point ceiling for healing
    pub max_health: u32,
    /// Base attack strength
    pub attack: u32,
    /// Flat damage reduction
    pub defense: u32,
    /// Initiative; higher acts earlier in a round
    pub speed: u32,
}

impl Stats {
    /// Create stats with full health.
    pub const fn new(health: u32, attack: u32, defense: u32, speed: u32) -> Self {
        Self {
            health,
            max_health: health,
            attack,
            defense,
            speed,
        }
    }
}

/// Status effect categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StatusKind {
    /// Loses 1 health at the end of each round
    Poison = 0,
    /// Slot skipped; ticks down each round
    Sleep = 1,
    /// Slot skipped; ticks down each round
    Stun = 2,
    /// Regains 1 health at the end of each round
    Regen = 3,
}

/// An active status effect on a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    /// Effect category
    pub kind: StatusKind,
    /// Rounds left, decremented once per round
    pub remaining: u32,
}

// =============================================================================
// ITEM DATA
// =============================================================================

/// Payload carried by item entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    /// Stack count, at least 1
    pub stack: u32,
    /// Kind-dependent magnitude: attack bonus, heal amount, or gold value
    pub modifier: i32,
}

impl ItemData {
    /// Single item with the given magnitude.
    pub const fn single(modifier: i32) -> Self {
        Self { stack: 1, modifier }
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// One simulated thing: the player, a monster, or an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id
    pub id: EntityId,
    /// Current tile. For carried items this is the moment-of-pickup tile
    /// and is refreshed on drop.
    pub position: Point,
    /// What this entity is
    pub kind: EntityKind,
    /// Combat attributes (zeroed for items)
    pub stats: Stats,
    /// Carried item ids, in pickup order
    pub inventory: Vec<EntityId>,
    /// Active status effects
    pub statuses: Vec<StatusEffect>,
    /// Currently wielded weapon, if any (must also be in `inventory`)
    pub equipped: Option<EntityId>,
    /// Item payload; present iff `kind` is `Item`
    pub item: Option<ItemData>,
}

impl Entity {
    fn new(id: EntityId, kind: EntityKind, position: Point, stats: Stats) -> Self {
        Self {
            id,
            position,
            kind,
            stats,
            inventory: Vec::new(),
            statuses: Vec::new(),
            equipped: None,
            item: None,
        }
    }

    /// Whether a status of this kind is active.
    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.statuses.iter().any(|s| s.kind == kind && s.remaining > 0)
    }

    /// Sleep and stun both cost the creature its slot.
    pub fn incapacitated(&self) -> bool {
        self.has_status(StatusKind::Sleep) || self.has_status(StatusKind::Stun)
    }

    /// Apply a status effect, refreshing the duration if already active.
    pub fn apply_status(&mut self, kind: StatusKind, duration: u32) {
        for status in &mut self.statuses {
            if status.kind == kind {
                status.remaining = status.remaining.max(duration);
                return;
            }
        }
        self.statuses.push(StatusEffect { kind, remaining: duration });
    }
}

// =============================================================================
// ENTITY REGISTRY
// =============================================================================

/// Owner of all entities on the current level.
///
/// Spatial indexes are derived data and rebuilt after deserialization;
/// the entity map is the single source of truth.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u32,

    /// Blocking creature per tile. At most one, always.
    #[serde(skip)]
    blockers: BTreeMap<Point, EntityId>,

    /// Items lying on each tile, bottom of the pile first.
    #[serde(skip)]
    item_piles: BTreeMap<Point, Vec<EntityId>>,
}

impl EntityRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Spawn a creature at `pos`.
    ///
    /// Fails with `PositionOccupiedOrInvalid` when the tile is out of
    /// bounds, impassable, or already holds a blocker.
    pub fn spawn_creature(
        &mut self,
        grid: &mut Grid,
        kind: EntityKind,
        pos: Point,
        stats: Stats,
    ) -> Result<EntityId, CoreError> {
        debug_assert!(kind.is_creature());
        if !grid.in_bounds(pos) || !grid.is_passable(pos) || self.blockers.contains_key(&pos) {
            return Err(CoreError::PositionOccupiedOrInvalid { pos });
        }

        let id = self.allocate_id();
        self.entities.insert(id, Entity::new(id, kind, pos, stats));
        self.blockers.insert(pos, id);
        grid.set_occupant(pos, Some(id));
        Ok(id)
    }

    /// Spawn an item on the floor at `pos`. Items stack freely with other
    /// items and under creatures, but still need a passable tile.
    pub fn spawn_item(
        &mut self,
        grid: &Grid,
        kind: ItemKind,
        pos: Point,
        data: ItemData,
    ) -> Result<EntityId, CoreError> {
        if !grid.in_bounds(pos) || !grid.is_passable(pos) {
            return Err(CoreError::PositionOccupiedOrInvalid { pos });
        }

        let id = self.allocate_id();
        let mut entity = Entity::new(id, EntityKind::Item(kind), pos, Stats::default());
        entity.item = Some(data);
        self.entities.insert(id, entity);
        self.item_piles.entry(pos).or_default().push(id);
        Ok(id)
    }

    /// Remove an entity outright, clearing every index that mentions it.
    /// Carried items are removed together with their carrier; use
    /// [`EntityRegistry::kill`] to drop them instead.
    pub fn remove(&mut self, grid: &mut Grid, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;

        if entity.kind.blocks() {
            self.blockers.remove(&entity.position);
            grid.set_occupant(entity.position, None);
            for item_id in &entity.inventory {
                self.entities.remove(item_id);
            }
        } else if let Some(pile) = self.item_piles.get_mut(&entity.position) {
            pile.retain(|i| *i != id);
            if pile.is_empty() {
                self.item_piles.remove(&entity.position);
            }
        }

        Some(entity)
    }

    /// Kill a creature: its inventory drops onto its last tile, then the
    /// creature itself is removed. Returns the dropped item ids.
    pub fn kill(&mut self, grid: &mut Grid, id: EntityId) -> Vec<EntityId> {
        let Some(entity) = self.entities.get(&id) else {
            return Vec::new();
        };
        let corpse_tile = entity.position;
        let carried = entity.inventory.clone();

        for item_id in &carried {
            if let Some(item) = self.entities.get_mut(item_id) {
                item.position = corpse_tile;
                self.item_piles.entry(corpse_tile).or_default().push(*item_id);
            }
        }

        if let Some(entity) = self.entities.remove(&id) {
            self.blockers.remove(&entity.position);
            grid.set_occupant(entity.position, None);
        }

        carried
    }

    /// Blocking entity standing on a tile, if any.
    #[inline]
    pub fn blocker_at(&self, pos: Point) -> Option<EntityId> {
        self.blockers.get(&pos).copied()
    }

    /// Items lying on a tile, bottom first.
    pub fn items_at(&self, pos: Point) -> &[EntityId] {
        self.item_piles.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Relocate a blocking entity.
    ///
    /// Validation and the index update happen in one call, so there is no
    /// window in which two blockers share a cell.
    pub fn move_entity(
        &mut self,
        grid: &mut Grid,
        id: EntityId,
        new_pos: Point,
    ) -> Result<(), CoreError> {
        let old_pos = match self.entities.get(&id) {
            Some(e) if e.kind.blocks() => e.position,
            _ => return Err(CoreError::PositionOccupiedOrInvalid { pos: new_pos }),
        };

        if !grid.in_bounds(new_pos) || !grid.is_passable(new_pos) {
            return Err(CoreError::PositionOccupiedOrInvalid { pos: new_pos });
        }
        if let Some(other) = self.blockers.get(&new_pos) {
            if *other != id {
                return Err(CoreError::PositionOccupiedOrInvalid { pos: new_pos });
            }
        }

        self.blockers.remove(&old_pos);
        grid.set_occupant(old_pos, None);
        self.blockers.insert(new_pos, id);
        grid.set_occupant(new_pos, Some(id));
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.position = new_pos;
        }
        Ok(())
    }

    /// Transfer an item from the carrier's tile into its inventory.
    /// Ownership moves atomically; the pile entry and the inventory entry
    /// never coexist.
    pub fn take_item_from_tile(&mut self, carrier: EntityId, item_id: EntityId) -> bool {
        let Some(tile) = self.entities.get(&carrier).map(|e| e.position) else {
            return false;
        };
        let Some(pile) = self.item_piles.get_mut(&tile) else {
            return false;
        };
        let Some(idx) = pile.iter().position(|i| *i == item_id) else {
            return false;
        };

        pile.remove(idx);
        if pile.is_empty() {
            self.item_piles.remove(&tile);
        }
        if let Some(entity) = self.entities.get_mut(&carrier) {
            entity.inventory.push(item_id);
        }
        true
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entities remain.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether an entity is still registered.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Entity by id, mutable.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// All entities in insertion (id) order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Creatures only, in insertion (id) order.
    pub fn creatures(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.kind.is_creature())
    }

    /// Effective attack: base attack plus the equipped weapon's modifier.
    pub fn attack_of(&self, id: EntityId) -> u32 {
        let Some(entity) = self.entities.get(&id) else {
            return 0;
        };
        let bonus = entity
            .equipped
            .and_then(|w| self.entities.get(&w))
            .and_then(|w| w.item)
            .map(|d| d.modifier.max(0) as u32)
            .unwrap_or(0);
        entity.stats.attack + bonus
    }

    /// Drop everything except one creature and the items it carries.
    /// Used for level transitions; spatial indexes are left cleared and
    /// must be rebuilt with [`EntityRegistry::reindex`].
    pub fn retain_only(&mut self, keep: EntityId) {
        let kept_items: std::collections::BTreeSet<EntityId> = self
            .get(keep)
            .map(|e| e.inventory.iter().copied().collect())
            .unwrap_or_default();

        self.entities
            .retain(|id, _| *id == keep || kept_items.contains(id));
        self.blockers.clear();
        self.item_piles.clear();
    }

    /// Rebuild spatial indexes and grid occupant back-references from the
    /// entity map. Called after deserialization.
    pub fn reindex(&mut self, grid: &mut Grid) {
        self.blockers.clear();
        self.item_piles.clear();
        for p in grid.points().collect::<Vec<_>>() {
            grid.set_occupant(p, None);
        }

        let carried: std::collections::BTreeSet<EntityId> = self
            .entities
            .values()
            .flat_map(|e| e.inventory.iter().copied())
            .collect();

        for entity in self.entities.values() {
            if entity.kind.blocks() {
                self.blockers.insert(entity.position, entity.id);
                grid.set_occupant(entity.position, Some(entity.id));
            } else if !carried.contains(&entity.id) {
                self.item_piles.entry(entity.position).or_default().push(entity.id);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
