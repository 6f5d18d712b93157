//! Error Taxonomy
//!
//! Two tiers: `CoreError` for operations that can genuinely fail, and
//! `RejectionReason` for intents that were refused without consuming the
//! actor's turn.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::point::Point;

/// Failures surfaced by the simulation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Geometry query outside the grid. A programming error in the
    /// caller, not a game situation.
    #[error("coordinate ({x}, {y}) is outside the grid")]
    OutOfBounds {
        /// Offending column
        x: i32,
        /// Offending row
        y: i32,
    },

    /// The generator exhausted its retry budget without producing a
    /// playable level. Fatal: the caller must abort the level transition.
    #[error("failed to generate level {depth} after {attempts} attempts")]
    GenerationFailed {
        /// Level that could not be built
        depth: u32,
        /// Attempts consumed, including retries
        attempts: u32,
    },

    /// Spawn or move target is impassable or already holds a blocking
    /// entity. Recoverable: the caller picks another position.
    #[error("position {pos} is impassable or occupied")]
    PositionOccupiedOrInvalid {
        /// The rejected target tile
        pos: Point,
    },
}

/// Why an intent was refused.
///
/// Rejections never consume the turn; the same actor is still due and
/// may resubmit a corrected intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The submitting entity is not the one currently due.
    #[error("not this entity's turn")]
    WrongTurn,

    /// Move target is a wall, closed to movement, or blocked.
    #[error("target tile is not passable")]
    NotPassable,

    /// Referenced entity or item does not exist or is not available.
    #[error("no such target")]
    NoTarget,

    /// Attack target is not within melee reach.
    #[error("target is not adjacent")]
    NotAdjacent,

    /// Descend/Ascend submitted away from the matching stairs.
    #[error("not standing on the right stairs")]
    NotOnStairs,
}
