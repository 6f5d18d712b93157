//! Combat and Status Resolution
//!
//! Pure outcome computation invoked by the action resolver. Inputs are
//! pre-validated there, so nothing in this module can fail; it only
//! reports what happened.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::entity::{EntityId, EntityKind, EntityRegistry, Species, StatusKind};

/// Rounds a sleep cast lasts.
const SLEEP_DURATION: u32 = 2;

/// Combat tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Upper bound of the random bonus damage term (inclusive)
    pub variance: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self { variance: 2 }
    }
}

/// What a resolved attack did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombatOutcome {
    /// Hit points removed from the defender
    pub damage: u32,
    /// Defender health reached zero
    pub defender_died: bool,
    /// Hit points leeched back by the attacker
    pub attacker_heal: u32,
    /// Status inflicted on the defender, if any
    pub status_applied: Option<StatusKind>,
}

/// Resolve one melee attack.
///
/// `damage = max(0, attack_total - defense) + variance_roll`, where
/// `attack_total` includes the equipped weapon. Species riders: a
/// Vampire leeches half the damage dealt; a SnakeMage may put the
/// defender to sleep. The defender's health is updated here; death
/// cleanup (drops, removal) belongs to the scheduler.
pub fn resolve_attack(
    registry: &mut EntityRegistry,
    attacker: EntityId,
    defender: EntityId,
    rng: &mut DeterministicRng,
    config: &CombatConfig,
) -> CombatOutcome {
    let attack = registry.attack_of(attacker);
    let defense = registry.get(defender).map(|e| e.stats.defense).unwrap_or(0);

    let damage = attack.saturating_sub(defense) + rng.next_int(config.variance + 1);

    let attacker_species = match registry.get(attacker).map(|e| e.kind) {
        Some(EntityKind::Monster(species)) => Some(species),
        _ => None,
    };

    let mut attacker_heal = 0;
    let mut status_applied = None;
    match attacker_species {
        Some(Species::Vampire) if damage > 0 => attacker_heal = damage / 2,
        Some(Species::SnakeMage) if rng.chance(25) => {
            status_applied = Some(StatusKind::Sleep);
        }
        _ => {}
    }

    let mut defender_died = false;
    if let Some(target) = registry.get_mut(defender) {
        target.stats.health = target.stats.health.saturating_sub(damage);
        defender_died = target.stats.health == 0;
        if let Some(status) = status_applied {
            if !defender_died {
                target.apply_status(status, SLEEP_DURATION);
            } else {
                status_applied = None;
            }
        }
    }

    if attacker_heal > 0 {
        if let Some(source) = registry.get_mut(attacker) {
            source.stats.health = (source.stats.health + attacker_heal).min(source.stats.max_health);
        }
    }

    CombatOutcome {
        damage,
        defender_died,
        attacker_heal,
        status_applied,
    }
}

/// Result of one round of status ticking on a single creature.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusTick {
    /// Poison damage taken
    pub damage: u32,
    /// Regeneration healing received
    pub heal: u32,
    /// Creature died of poison this round
    pub died: bool,
    /// Effects that ran out this round
    pub expired: Vec<StatusKind>,
}

/// Tick every status on a creature once.
///
/// Runs exactly once per round per affected entity, whether or not the
/// entity acted. Durations decrement after their effect applies.
pub fn tick_statuses(registry: &mut EntityRegistry, id: EntityId) -> StatusTick {
    let mut tick = StatusTick::default();
    let Some(entity) = registry.get_mut(id) else {
        return tick;
    };

    for status in &entity.statuses {
        match status.kind {
            StatusKind::Poison => tick.damage += 1,
            StatusKind::Regen => tick.heal += 1,
            StatusKind::Sleep | StatusKind::Stun => {}
        }
    }

    entity.stats.health = entity
        .stats
        .health
        .saturating_sub(tick.damage)
        .saturating_add(tick.heal)
        .min(entity.stats.max_health);
    tick.died = entity.stats.health == 0;

    for status in &mut entity.statuses {
        status.remaining = status.remaining.saturating_sub(1);
        if status.remaining == 0 {
            tick.expired.push(status.kind);
        }
    }
    entity.statuses.retain(|s| s.remaining > 0);

    tick
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::point::Point;
    use crate::game::entity::Stats;
    use crate::game::grid::{Grid, Terrain};

    fn arena() -> (Grid, EntityRegistry) {
        let mut grid = Grid::filled(10, 10);
        for p in grid.points().collect::<Vec<_>>() {
            grid.set_terrain(p, Terrain::Floor).unwrap();
        }
        (grid, EntityRegistry::new())
    }

    #[test]
    fn test_damage_formula_zero_variance() {
        let (mut grid, mut registry) = arena();
        let config = CombatConfig { variance: 0 };
        let mut rng = DeterministicRng::new(1);

        let attacker = registry
            .spawn_creature(&mut grid, EntityKind::Player, Point::new(1, 1), Stats::new(30, 10, 0, 5))
            .unwrap();
        let defender = registry
            .spawn_creature(
                &mut grid,
                EntityKind::Monster(Species::Zombie),
                Point::new(2, 1),
                Stats::new(5, 3, 4, 4),
            )
            .unwrap();

        let outcome = resolve_attack(&mut registry, attacker, defender, &mut rng, &config);

        // 10 attack - 4 defense = 6 damage against 5 health
        assert_eq!(outcome.damage, 6);
        assert!(outcome.defender_died);
        assert_eq!(registry.get(defender).unwrap().stats.health, 0);
    }

    #[test]
    fn test_defense_floors_damage_at_variance() {
        let (mut grid, mut registry) = arena();
        let config = CombatConfig { variance: 0 };
        let mut rng = DeterministicRng::new(1);

        let attacker = registry
            .spawn_creature(&mut grid, EntityKind::Player, Point::new(1, 1), Stats::new(30, 2, 0, 5))
            .unwrap();
        let defender = registry
            .spawn_creature(
                &mut grid,
                EntityKind::Monster(Species::Ogre),
                Point::new(2, 1),
                Stats::new(20, 6, 9, 3),
            )
            .unwrap();

        let outcome = resolve_attack(&mut registry, attacker, defender, &mut rng, &config);

        // Base term clamps at zero, never negative
        assert_eq!(outcome.damage, 0);
        assert!(!outcome.defender_died);
        assert_eq!(registry.get(defender).unwrap().stats.health, 20);
    }

    #[test]
    fn test_variance_is_bounded_and_deterministic() {
        let (mut grid, mut registry) = arena();
        let config = CombatConfig { variance: 2 };

        let attacker = registry
            .spawn_creature(&mut grid, EntityKind::Player, Point::new(1, 1), Stats::new(30, 5, 0, 5))
            .unwrap();
        let defender = registry
            .spawn_creature(
                &mut grid,
                EntityKind::Monster(Species::Zombie),
                Point::new(2, 1),
                Stats::new(1000, 3, 3, 4),
            )
            .unwrap();

        let mut rng1 = DeterministicRng::new(99);
        let mut rng2 = DeterministicRng::new(99);
        for _ in 0..50 {
            let a = resolve_attack(&mut registry, attacker, defender, &mut rng1, &config);
            assert!((2..=4).contains(&a.damage));

            // Same stream position, same outcome
            let mut shadow = registry.clone();
            let b = resolve_attack(&mut shadow, attacker, defender, &mut rng2, &config);
            assert_eq!(a.damage, b.damage);
            registry = shadow;
        }
    }

    #[test]
    fn test_vampire_leech() {
        let (mut grid, mut registry) = arena();
        let config = CombatConfig { variance: 0 };
        let mut rng = DeterministicRng::new(7);

        let vampire = registry
            .spawn_creature(
                &mut grid,
                EntityKind::Monster(Species::Vampire),
                Point::new(1, 1),
                Stats::new(10, 8, 2, 6),
            )
            .unwrap();
        registry.get_mut(vampire).unwrap().stats.health = 4;

        let victim = registry
            .spawn_creature(&mut grid, EntityKind::Player, Point::new(2, 1), Stats::new(30, 5, 2, 5))
            .unwrap();

        let outcome = resolve_attack(&mut registry, vampire, victim, &mut rng, &config);

        assert_eq!(outcome.damage, 6);
        assert_eq!(outcome.attacker_heal, 3);
        assert_eq!(registry.get(vampire).unwrap().stats.health, 7);
    }

    #[test]
    fn test_poison_tick_and_expiry() {
        let (mut grid, mut registry) = arena();
        let id = registry
            .spawn_creature(&mut grid, EntityKind::Player, Point::new(1, 1), Stats::new(3, 5, 2, 5))
            .unwrap();
        registry.get_mut(id).unwrap().apply_status(StatusKind::Poison, 2);

        let tick1 = tick_statuses(&mut registry, id);
        assert_eq!(tick1.damage, 1);
        assert!(!tick1.died);
        assert!(tick1.expired.is_empty());
        assert_eq!(registry.get(id).unwrap().stats.health, 2);

        let tick2 = tick_statuses(&mut registry, id);
        assert_eq!(tick2.expired, vec![StatusKind::Poison]);
        assert!(!registry.get(id).unwrap().has_status(StatusKind::Poison));

        // Expired means no further damage
        let tick3 = tick_statuses(&mut registry, id);
        assert_eq!(tick3.damage, 0);
    }

    #[test]
    fn test_regen_caps_at_max_health() {
        let (mut grid, mut registry) = arena();
        let id = registry
            .spawn_creature(&mut grid, EntityKind::Player, Point::new(1, 1), Stats::new(10, 5, 2, 5))
            .unwrap();
        {
            let entity = registry.get_mut(id).unwrap();
            entity.stats.health = 9;
            entity.apply_status(StatusKind::Regen, 5);
        }

        tick_statuses(&mut registry, id);
        assert_eq!(registry.get(id).unwrap().stats.health, 10);
        tick_statuses(&mut registry, id);
        assert_eq!(registry.get(id).unwrap().stats.health, 10);
    }
}
