//! Monster Decision Policies
//!
//! Each species maps to a policy that turns the current state into an
//! intent for the scheduler. Policies are deterministic given the same
//! RNG stream; swapping the table entry swaps the behavior.

use crate::core::point::{Direction, Point};
use crate::game::entity::{EntityId, EntityKind, Species};
use crate::game::intent::Intent;
use crate::game::state::GameState;
use crate::game::visibility::line_clear;

/// How a species behaves on its turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    /// Close in on the player while in sight and range, attack when
    /// adjacent.
    Chase {
        /// Chebyshev distance at which the player is noticed
        aggression_range: u32,
    },
    /// Drift randomly, ignore the player unless attacked into reach.
    Wander,
    /// Hold still until the player comes close, then lunge.
    Ambush {
        /// Chebyshev distance that springs the ambush
        trigger_range: u32,
    },
}

/// The species-to-policy table.
pub fn policy_for(species: Species) -> PolicyKind {
    match species {
        Species::Zombie => PolicyKind::Chase { aggression_range: 6 },
        Species::Vampire => PolicyKind::Chase { aggression_range: 8 },
        Species::Ogre => PolicyKind::Chase { aggression_range: 5 },
        Species::SnakeMage => PolicyKind::Chase { aggression_range: 7 },
        Species::Ghost => PolicyKind::Wander,
        Species::Mimic => PolicyKind::Ambush { trigger_range: 2 },
    }
}

/// Produce the intent for a monster's turn.
///
/// Always returns something the scheduler can try; the scheduler falls
/// back to `Wait` if validation disagrees.
pub fn decide(state: &mut GameState, monster: EntityId) -> Intent {
    let Some(entity) = state.registry.get(monster) else {
        return Intent::Wait;
    };
    let EntityKind::Monster(species) = entity.kind else {
        return Intent::Wait;
    };
    let pos = entity.position;
    let Some(player_pos) = state.player_position() else {
        return Intent::Wait;
    };

    match policy_for(species) {
        PolicyKind::Chase { aggression_range } => {
            if pos.adjacent(player_pos) {
                return Intent::Attack(state.player);
            }
            let in_range = pos.chebyshev(player_pos) <= aggression_range;
            let sighted = in_range
                && line_clear(&state.grid, pos, player_pos, state.config.vision.closed_doors_block);
            if sighted {
                if let Some(dir) = step_toward(state, pos, player_pos) {
                    return Intent::Move(dir);
                }
            }
            Intent::Wait
        }

        PolicyKind::Wander => {
            if state.rng.chance(40) {
                let candidates: Vec<Direction> = Direction::ALL
                    .iter()
                    .copied()
                    .filter(|d| {
                        let q = pos.step(*d);
                        state.grid.is_passable(q) && state.registry.blocker_at(q).is_none()
                    })
                    .collect();
                if let Some(dir) = state.rng.choose(&candidates) {
                    return Intent::Move(*dir);
                }
            }
            Intent::Wait
        }

        PolicyKind::Ambush { trigger_range } => {
            if pos.adjacent(player_pos) {
                Intent::Attack(state.player)
            } else if pos.chebyshev(player_pos) <= trigger_range {
                match step_toward(state, pos, player_pos) {
                    Some(dir) => Intent::Move(dir),
                    None => Intent::Wait,
                }
            } else {
                Intent::Wait
            }
        }
    }
}

/// Greedy step: the passable, unoccupied neighbor that strictly lowers
/// the Chebyshev distance to the target. Ties resolve in canonical
/// direction order, so pathing is deterministic.
fn step_toward(state: &GameState, from: Point, target: Point) -> Option<Direction> {
    let current = from.chebyshev(target);
    let mut best: Option<(u32, Direction)> = None;

    for dir in Direction::ALL {
        let q = from.step(dir);
        if !state.grid.is_passable(q) || state.registry.blocker_at(q).is_some() {
            continue;
        }
        let d = q.chebyshev(target);
        if d < current && best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, dir));
        }
    }

    best.map(|(_, dir)| dir)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::DeterministicRng;
    use crate::game::entity::{EntityRegistry, Stats};
    use crate::game::grid::{Grid, Terrain};
    use crate::game::state::{GameConfig, GameId, GamePhase, GameStats};
    use crate::game::turn::TurnOrder;
    use crate::game::visibility::VisibilityState;

    fn fixture(species: Species, monster_pos: Point, player_pos: Point) -> (GameState, EntityId) {
        let mut grid = Grid::filled(16, 10);
        for p in grid.points().collect::<Vec<_>>() {
            grid.set_terrain(p, Terrain::Floor).unwrap();
        }
        grid.entry = player_pos;
        grid.stairs_down = Point::new(14, 8);
        grid.set_terrain(grid.stairs_down, Terrain::StairsDown).unwrap();

        let mut registry = EntityRegistry::new();
        let player = registry
            .spawn_creature(&mut grid, EntityKind::Player, player_pos, Stats::new(20, 5, 2, 5))
            .unwrap();
        let monster = registry
            .spawn_creature(
                &mut grid,
                EntityKind::Monster(species),
                monster_pos,
                species.base_stats(1),
            )
            .unwrap();

        let turn_order = TurnOrder::recompute(&registry);
        let visibility = VisibilityState::for_grid(&grid);
        let state = GameState::from_parts(
            GameId::new([2; 16]),
            11,
            1,
            1,
            GamePhase::Playing,
            grid,
            registry,
            player,
            visibility,
            turn_order,
            DeterministicRng::new(11),
            GameStats::default(),
            GameConfig::default(),
        );
        (state, monster)
    }

    #[test]
    fn test_chase_attacks_when_adjacent() {
        let (mut state, zombie) = fixture(Species::Zombie, Point::new(2, 2), Point::new(3, 2));
        let player = state.player;

        assert_eq!(decide(&mut state, zombie), Intent::Attack(player));
    }

    #[test]
    fn test_chase_steps_closer_in_range() {
        let (mut state, zombie) = fixture(Species::Zombie, Point::new(2, 2), Point::new(6, 2));

        let intent = decide(&mut state, zombie);
        let Intent::Move(dir) = intent else {
            panic!("expected a move, got {intent:?}");
        };

        let before = Point::new(2, 2).chebyshev(Point::new(6, 2));
        let after = Point::new(2, 2).step(dir).chebyshev(Point::new(6, 2));
        assert!(after < before);
    }

    #[test]
    fn test_chase_ignores_player_out_of_range() {
        // Zombie aggression range is 6; park the player at distance 12
        let (mut state, zombie) = fixture(Species::Zombie, Point::new(1, 1), Point::new(13, 8));

        assert_eq!(decide(&mut state, zombie), Intent::Wait);
    }

    #[test]
    fn test_chase_blocked_by_wall_sightline() {
        let (mut state, zombie) = fixture(Species::Zombie, Point::new(2, 2), Point::new(6, 2));
        // Wall off the corridor between them
        for y in 0..10 {
            state.grid.set_terrain(Point::new(4, y), Terrain::Wall).unwrap();
        }

        assert_eq!(decide(&mut state, zombie), Intent::Wait);
    }

    #[test]
    fn test_mimic_holds_until_triggered() {
        let (mut state, mimic) = fixture(Species::Mimic, Point::new(2, 2), Point::new(7, 2));
        assert_eq!(decide(&mut state, mimic), Intent::Wait);

        // Bring the player inside the trigger range
        state
            .registry
            .move_entity(&mut state.grid, state.player, Point::new(4, 2))
            .unwrap();
        assert!(matches!(decide(&mut state, mimic), Intent::Move(_)));
    }

    #[test]
    fn test_wander_is_deterministic() {
        let run = || {
            let (mut state, ghost) = fixture(Species::Ghost, Point::new(5, 5), Point::new(12, 8));
            (0..20).map(|_| decide(&mut state, ghost)).collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_dead_player_means_wait() {
        let (mut state, zombie) = fixture(Species::Zombie, Point::new(2, 2), Point::new(3, 2));
        let player = state.player;
        state.registry.kill(&mut state.grid, player);

        assert_eq!(decide(&mut state, zombie), Intent::Wait);
    }
}
