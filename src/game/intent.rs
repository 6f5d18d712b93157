//! Action Intents
//!
//! One discrete requested action per active entity per turn. The input
//! collaborator translates keystrokes into these; monster policies emit
//! them directly. Every intent is validated before it mutates anything.

use serde::{Serialize, Deserialize};

use crate::core::point::Direction;
use crate::game::entity::EntityId;

/// A requested action for the entity whose turn it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Step one tile in a direction
    Move(Direction),

    /// Melee-attack an adjacent hostile
    Attack(EntityId),

    /// Use a carried item: equip a weapon, drink a potion, eat food,
    /// read a scroll. `target` is reserved for aimed item kinds.
    UseItem {
        /// Item to use; must be in the actor's inventory
        item: EntityId,
        /// Optional target entity
        target: Option<EntityId>,
    },

    /// Pick up the topmost item on the current tile
    PickUp,

    /// Spend the turn doing nothing
    Wait,

    /// Take the stairs down (must be standing on them)
    Descend,

    /// Take the stairs up (must be standing on them)
    Ascend,
}
