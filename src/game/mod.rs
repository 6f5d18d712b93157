//! Game Simulation Module
//!
//! All simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `grid`: Tile grid, geometry queries, line tracing
//! - `mapgen`: Seeded dungeon generation
//! - `entity`: Entity registry and spatial indexes
//! - `state`: Game context, level population, state hashing
//! - `visibility`: Field of view and ever-seen memory
//! - `intent`: Per-turn action requests from actors
//! - `turn`: Turn order, intent validation, action resolution
//! - `combat`: Attack outcomes and status effects
//! - `ai`: Monster decision policies
//! - `events`: State-change records for external consumers
//! - `view`: Renderable snapshot of the visible world
//! - `snapshot`: Full state capture and restore

pub mod ai;
pub mod combat;
pub mod entity;
pub mod error;
pub mod events;
pub mod grid;
pub mod intent;
pub mod mapgen;
pub mod snapshot;
pub mod state;
pub mod turn;
pub mod view;
pub mod visibility;

// Re-export key types
pub use entity::{Entity, EntityId, EntityKind, EntityRegistry, ItemKind, Species, Stats};
pub use error::{CoreError, RejectionReason};
pub use events::{GameEvent, GameEventData};
pub use grid::{Cell, Grid, Terrain};
pub use intent::Intent;
pub use state::{GameConfig, GamePhase, GameState};
