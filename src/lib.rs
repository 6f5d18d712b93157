//! # Hollowdeep Simulation Core
//!
//! Deterministic turn-based dungeon simulation: level generation, entity
//! tracking, turn resolution, and per-entity perception. Rendering, raw
//! input, and persistence live outside this crate and talk to it through
//! intents, events, view models, and snapshots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HOLLOWDEEP CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── point.rs    - Integer grid points and directions        │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Simulation (deterministic)                │
//! │  ├── grid.rs     - Tile grid, line tracing, neighbors        │
//! │  ├── mapgen.rs   - Seeded dungeon generation                 │
//! │  ├── entity.rs   - Entity registry and spatial index         │
//! │  ├── state.rs    - Game context and level population         │
//! │  ├── visibility.rs - Field of view and ever-seen memory      │
//! │  ├── intent.rs   - Per-turn action requests                  │
//! │  ├── turn.rs     - Turn order, validation, resolution        │
//! │  ├── combat.rs   - Attack and status resolution              │
//! │  ├── ai.rs       - Monster decision policies                 │
//! │  ├── events.rs   - State-change records for renderers        │
//! │  ├── view.rs     - Renderable snapshot of visible state      │
//! │  └── snapshot.rs - Full state capture and restore            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The entire simulation is deterministic:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same world seed and the same intent sequence, the simulation
//! produces identical grids, events, and state hashes on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;

// Re-export commonly used types
pub use crate::core::hash::{StateHash, StateHasher};
pub use crate::core::point::{Direction, Point};
pub use crate::core::rng::DeterministicRng;
pub use crate::game::entity::{Entity, EntityId, EntityKind, EntityRegistry};
pub use crate::game::error::{CoreError, RejectionReason};
pub use crate::game::events::{GameEvent, GameEventData};
pub use crate::game::grid::Grid;
pub use crate::game::intent::Intent;
pub use crate::game::snapshot::Snapshot;
pub use crate::game::state::{GameConfig, GameId, GamePhase, GameState};
pub use crate::game::view::ViewModel;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Deepest dungeon level; descending its stairs wins the game.
pub const MAX_DEPTH: u32 = 21;
