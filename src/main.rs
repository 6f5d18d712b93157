//! Hollowdeep Demo
//!
//! Runs a scripted game against the simulation core: auto-plays the
//! player with a simple dive-for-the-stairs policy, logs events, and
//! verifies that a snapshot restore replays to the identical state hash.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hollowdeep::core::point::Direction;
use hollowdeep::game::entity::EntityKind;
use hollowdeep::game::events::GameEventData;
use hollowdeep::game::intent::Intent;
use hollowdeep::game::snapshot::Snapshot;
use hollowdeep::game::turn::{play_turn, TurnError};
use hollowdeep::{GameConfig, GameId, GamePhase, GameState, Point, VERSION};

const DEMO_SEED: u64 = 12345;
const DEMO_ROUNDS: u32 = 400;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Hollowdeep v{}", VERSION);
    info!("Seed: {}", DEMO_SEED);

    let game_id = GameId::generate();
    let mut state = GameState::new_game(game_id, DEMO_SEED, GameConfig::default())?;

    info!("Game ID: {}", game_id.to_uuid_string());
    info!(
        "Level 1: {} rooms, {} entities",
        state.grid.rooms.len(),
        state.registry.len()
    );

    // Snapshot at the start so the replay check below covers the run
    let start_snapshot = state.snapshot();

    let mut total_events = 0usize;
    while state.phase == GamePhase::Playing && state.round < DEMO_ROUNDS {
        let intent = choose_player_intent(&state);
        match play_turn(&mut state, intent) {
            Ok(events) => {
                total_events += events.len();
                for event in &events {
                    log_event(&event.data);
                }
            }
            Err(TurnError::Rejected(_)) => {
                // A blocked step; waiting is always legal
                if let Ok(events) = play_turn(&mut state, Intent::Wait) {
                    total_events += events.len();
                }
            }
            Err(TurnError::Fatal(e)) => return Err(e.into()),
        }
    }

    info!("=== Results ===");
    info!(
        "Phase: {:?}, depth {}, round {}, {} events",
        state.phase, state.depth, state.round, total_events
    );
    info!(
        "Stats: {} steps, {} kills, {} gold",
        state.stats.steps, state.stats.kills, state.stats.gold
    );

    let hash = state.compute_hash();
    info!("Final state hash: {}", hex::encode(hash));

    // Verify determinism: restore the starting snapshot, replay the same
    // policy, expect the identical hash
    info!("=== Verifying Determinism ===");
    let encoded = start_snapshot.encode()?;
    let mut replay = GameState::restore(Snapshot::decode(&encoded)?);
    while replay.phase == GamePhase::Playing && replay.round < DEMO_ROUNDS {
        let intent = choose_player_intent(&replay);
        if play_turn(&mut replay, intent).is_err() {
            let _ = play_turn(&mut replay, Intent::Wait);
        }
    }
    let replay_hash = replay.compute_hash();
    info!("Replay state hash: {}", hex::encode(replay_hash));

    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: hashes match");
    } else {
        info!("DETERMINISM FAILURE: hashes differ");
    }

    Ok(())
}

/// Dive policy: fight whatever is adjacent, otherwise head for the
/// stairs down and take them.
fn choose_player_intent(state: &GameState) -> Intent {
    let Some(pos) = state.player_position() else {
        return Intent::Wait;
    };

    // Attack an adjacent monster, lowest id first
    let adjacent_monster = state
        .registry
        .entities()
        .filter(|e| matches!(e.kind, EntityKind::Monster(_)))
        .find(|e| pos.adjacent(e.position));
    if let Some(monster) = adjacent_monster {
        return Intent::Attack(monster.id);
    }

    if pos == state.grid.stairs_down {
        return Intent::Descend;
    }

    step_toward(state, pos, state.grid.stairs_down)
        .map(Intent::Move)
        .unwrap_or(Intent::Wait)
}

fn step_toward(state: &GameState, from: Point, target: Point) -> Option<Direction> {
    let current = from.chebyshev(target);
    Direction::ALL.into_iter().find(|dir| {
        let q = from.step(*dir);
        state.grid.is_passable(q)
            && state.registry.blocker_at(q).is_none()
            && q.chebyshev(target) < current
    })
}

fn log_event(event: &GameEventData) {
    match event {
        GameEventData::Died { entity, killer, .. } => {
            info!("{} died (killer: {:?})", entity, killer);
        }
        GameEventData::GoldCollected { amount, .. } => {
            info!("Collected {} gold", amount);
        }
        GameEventData::LevelChanged { depth, .. } => {
            info!("Descended to level {}", depth);
        }
        GameEventData::GameOver { victory } => {
            info!("Game over, victory: {}", victory);
        }
        _ => {}
    }
}
