//! Game Events
//!
//! Immutable records of state changes produced by resolved intents, in
//! resolution order. The renderer and any replay tooling consume these;
//! the simulation itself never reads them back.

use serde::{Serialize, Deserialize};

use crate::core::point::Point;
use crate::game::entity::{EntityId, ItemKind, StatusKind};

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A creature stepped to a new tile
    Moved {
        /// Who moved
        entity: EntityId,
        /// Previous tile
        from: Point,
        /// New tile
        to: Point,
    },

    /// A closed door swung open
    DoorOpened {
        /// Who opened it
        entity: EntityId,
        /// The door tile
        pos: Point,
    },

    /// An attack landed
    Attacked {
        /// Attacker
        attacker: EntityId,
        /// Defender
        defender: EntityId,
        /// Hit points removed
        damage: u32,
    },

    /// A creature died and was removed from play
    Died {
        /// The deceased
        entity: EntityId,
        /// Credited killer, if any
        killer: Option<EntityId>,
        /// Items dropped on the corpse tile
        dropped: Vec<EntityId>,
    },

    /// An item moved from the floor into an inventory
    ItemPicked {
        /// New owner
        entity: EntityId,
        /// The item
        item: EntityId,
        /// Item category
        kind: ItemKind,
    },

    /// Treasure converted directly to gold
    GoldCollected {
        /// Who collected
        entity: EntityId,
        /// Gold gained
        amount: u32,
    },

    /// An inventory item was used (consumed or equipped)
    ItemUsed {
        /// User
        entity: EntityId,
        /// The item
        item: EntityId,
        /// Item category
        kind: ItemKind,
    },

    /// A status effect took hold
    StatusApplied {
        /// Affected creature
        entity: EntityId,
        /// Effect kind
        status: StatusKind,
    },

    /// A status effect ran out
    StatusExpired {
        /// Affected creature
        entity: EntityId,
        /// Effect kind
        status: StatusKind,
    },

    /// The player moved between levels
    LevelChanged {
        /// Depth now occupied
        depth: u32,
        /// True when the transition went up
        ascended: bool,
    },

    /// The game ended
    GameOver {
        /// True on a win, false on player death
        victory: bool,
    },
}

/// A game event with the round it occurred in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Round when the event occurred
    pub round: u32,
    /// Event payload
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(round: u32, data: GameEventData) -> Self {
        Self { round, data }
    }

    /// Create a move event.
    pub fn moved(round: u32, entity: EntityId, from: Point, to: Point) -> Self {
        Self::new(round, GameEventData::Moved { entity, from, to })
    }

    /// Create an attack event.
    pub fn attacked(round: u32, attacker: EntityId, defender: EntityId, damage: u32) -> Self {
        Self::new(round, GameEventData::Attacked { attacker, defender, damage })
    }

    /// Create a death event.
    pub fn died(round: u32, entity: EntityId, killer: Option<EntityId>, dropped: Vec<EntityId>) -> Self {
        Self::new(round, GameEventData::Died { entity, killer, dropped })
    }

    /// Create a level-change event.
    pub fn level_changed(round: u32, depth: u32, ascended: bool) -> Self {
        Self::new(round, GameEventData::LevelChanged { depth, ascended })
    }
}
