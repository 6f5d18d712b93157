//! Turn Scheduler and Action Resolver
//!
//! Orders whose action is due, validates one intent at a time, applies
//! it, and emits events. All state mutation funnels through here: one
//! validated intent per call, one round at a time. Monster turns are
//! produced internally by the policy module and resolved through the
//! same path as player intents.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::trace;

use crate::game::ai;
use crate::game::combat;
use crate::game::entity::{Entity, EntityId, EntityKind, EntityRegistry, ItemKind};
use crate::game::error::{CoreError, RejectionReason};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::grid::Terrain;
use crate::game::intent::Intent;
use crate::game::state::{GamePhase, GameState};
use crate::MAX_DEPTH;

// =============================================================================
// TURN ORDER
// =============================================================================

/// The per-round action sequence.
///
/// Recomputed at the start of every round from creature speed; higher
/// speed acts earlier, ties break on id. Entities that die mid-round are
/// removed before their slot comes up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    order: Vec<EntityId>,
    cursor: usize,
}

impl TurnOrder {
    /// Build the order for a fresh round.
    pub fn recompute(registry: &EntityRegistry) -> Self {
        let mut actors: Vec<&Entity> = registry.creatures().collect();
        actors.sort_by_key(|e| (std::cmp::Reverse(e.stats.speed), e.id));
        Self {
            order: actors.into_iter().map(|e| e.id).collect(),
            cursor: 0,
        }
    }

    /// Entity whose action is due, if the round is not exhausted.
    pub fn current(&self) -> Option<EntityId> {
        self.order.get(self.cursor).copied()
    }

    /// Consume the current slot.
    pub fn advance(&mut self) {
        if self.cursor < self.order.len() {
            self.cursor += 1;
        }
    }

    /// True once every slot this round has been consumed.
    pub fn exhausted(&self) -> bool {
        self.cursor >= self.order.len()
    }

    /// Remove an entity (death) without disturbing the slots around it.
    pub fn remove(&mut self, id: EntityId) {
        if let Some(idx) = self.order.iter().position(|e| *e == id) {
            self.order.remove(idx);
            if idx < self.cursor {
                self.cursor -= 1;
            }
        }
    }

    /// The remaining-and-consumed slot sequence, in order.
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Index of the slot currently due.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// Why a submission did not apply.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Recoverable: the turn was not consumed, resubmit a corrected
    /// intent for the same actor.
    #[error("intent rejected: {0}")]
    Rejected(#[from] RejectionReason),

    /// Fatal: a level transition could not be completed. State is
    /// unchanged but the transition must be surfaced to the caller.
    #[error(transparent)]
    Fatal(CoreError),
}

enum Applied {
    /// Normal action; the actor's slot is consumed
    Consumed,
    /// The level (and with it the turn order) was rebuilt
    LevelChanged,
}

/// Entity whose action is currently due, skipping incapacitated slots
/// and closing out exhausted rounds as needed. `None` once the game is
/// over.
pub fn current_actor(state: &mut GameState) -> Option<EntityId> {
    normalize(state);
    if state.phase == GamePhase::Playing {
        state.turn_order.current()
    } else {
        None
    }
}

/// Submit one intent for the entity whose turn it is.
///
/// Rejected intents consume nothing and change nothing; the same actor
/// stays due. Applied intents mutate state, consume the slot, and return
/// the events produced (including any round-end effects that followed).
pub fn submit_intent(
    state: &mut GameState,
    actor: EntityId,
    intent: Intent,
) -> Result<Vec<GameEvent>, TurnError> {
    if state.phase != GamePhase::Playing {
        return Err(RejectionReason::WrongTurn.into());
    }
    normalize(state);
    if state.turn_order.current() != Some(actor) {
        return Err(RejectionReason::WrongTurn.into());
    }

    trace!(actor = %actor, ?intent, round = state.round, "intent submitted");

    let applied = match intent {
        Intent::Move(dir) => apply_move(state, actor, dir)?,
        Intent::Attack(target) => apply_attack(state, actor, target)?,
        Intent::UseItem { item, .. } => apply_use_item(state, actor, item)?,
        Intent::PickUp => apply_pickup(state, actor)?,
        Intent::Wait => Applied::Consumed,
        Intent::Descend => apply_stairs(state, actor, false)?,
        Intent::Ascend => apply_stairs(state, actor, true)?,
    };

    if matches!(applied, Applied::Consumed) {
        state.turn_order.advance();
    }
    normalize(state);

    Ok(state.take_events())
}

/// Auto-play monster turns until the player is due again (or the game
/// ends). Policy intents that fail validation fall back to `Wait`, which
/// is always legal, so the loop always makes progress.
pub fn advance_monsters(state: &mut GameState) -> Vec<GameEvent> {
    let mut events = Vec::new();

    while let Some(actor) = current_actor(state) {
        if actor == state.player {
            break;
        }
        let intent = ai::decide(state, actor);
        match submit_intent(state, actor, intent) {
            Ok(mut produced) => events.append(&mut produced),
            Err(_) => match submit_intent(state, actor, Intent::Wait) {
                Ok(mut produced) => events.append(&mut produced),
                Err(_) => break,
            },
        }
    }

    events
}

/// Convenience for the common driving loop: resolve any monsters due
/// ahead of the player (faster actors act first in a round), apply the
/// player's intent, then resolve every monster turn up to the player's
/// next slot.
pub fn play_turn(state: &mut GameState, intent: Intent) -> Result<Vec<GameEvent>, TurnError> {
    let mut events = advance_monsters(state);
    let player = state.player;

    match submit_intent(state, player, intent) {
        Ok(produced) => {
            events.extend(produced);
            events.extend(advance_monsters(state));
            Ok(events)
        }
        Err(err) => {
            // Monsters ahead of the player already acted; park their
            // events so the corrected resubmission still delivers them
            for event in events {
                state.push_event(event);
            }
            Err(err)
        }
    }
}

// =============================================================================
// INTENT APPLICATION
// =============================================================================

fn apply_move(
    state: &mut GameState,
    actor: EntityId,
    dir: crate::core::point::Direction,
) -> Result<Applied, TurnError> {
    let from = actor_position(state, actor)?;
    let to = from.step(dir);

    if !state.grid.is_passable(to) {
        return Err(RejectionReason::NotPassable.into());
    }
    if state.registry.blocker_at(to).is_some_and(|b| b != actor) {
        return Err(RejectionReason::NotPassable.into());
    }

    if state.grid.open_door(to) {
        let event = GameEvent::new(state.round, GameEventData::DoorOpened { entity: actor, pos: to });
        state.push_event(event);
    }

    state
        .registry
        .move_entity(&mut state.grid, actor, to)
        .map_err(|_| RejectionReason::NotPassable)?;
    state.push_event(GameEvent::moved(state.round, actor, from, to));

    if actor == state.player {
        state.stats.steps += 1;
        state.visibility.refresh(&state.grid, to, &state.config.vision);
    }

    Ok(Applied::Consumed)
}

fn apply_attack(
    state: &mut GameState,
    actor: EntityId,
    target: EntityId,
) -> Result<Applied, TurnError> {
    let attacker_pos = actor_position(state, actor)?;

    let Some(defender) = state.registry.get(target) else {
        return Err(RejectionReason::NoTarget.into());
    };
    if !defender.kind.is_creature() || !hostile(state, actor, target) {
        return Err(RejectionReason::NoTarget.into());
    }
    if !attacker_pos.adjacent(defender.position) {
        return Err(RejectionReason::NotAdjacent.into());
    }

    let outcome = combat::resolve_attack(
        &mut state.registry,
        actor,
        target,
        &mut state.rng,
        &state.config.combat,
    );

    state.push_event(GameEvent::attacked(state.round, actor, target, outcome.damage));
    if let Some(status) = outcome.status_applied {
        let event = GameEvent::new(state.round, GameEventData::StatusApplied { entity: target, status });
        state.push_event(event);
    }
    if outcome.defender_died {
        handle_death(state, target, Some(actor));
    }

    Ok(Applied::Consumed)
}

fn apply_use_item(
    state: &mut GameState,
    actor: EntityId,
    item: EntityId,
) -> Result<Applied, TurnError> {
    let carried = state
        .registry
        .get(actor)
        .map(|e| e.inventory.contains(&item))
        .unwrap_or(false);
    if !carried {
        return Err(RejectionReason::NoTarget.into());
    }
    let Some(&Entity { kind: EntityKind::Item(kind), item: Some(data), .. }) =
        state.registry.get(item)
    else {
        return Err(RejectionReason::NoTarget.into());
    };

    match kind {
        ItemKind::Weapon => {
            if let Some(entity) = state.registry.get_mut(actor) {
                entity.equipped = Some(item);
            }
        }
        ItemKind::Potion | ItemKind::Food => {
            let heal = data.modifier.max(0) as u32;
            if let Some(entity) = state.registry.get_mut(actor) {
                entity.stats.health = (entity.stats.health + heal).min(entity.stats.max_health);
            }
            consume_item(state, actor, item);
            if actor == state.player {
                match kind {
                    ItemKind::Potion => state.stats.potions_drunk += 1,
                    _ => state.stats.food_eaten += 1,
                }
            }
        }
        ItemKind::Scroll => {
            // Magic mapping: the layout becomes remembered, not visible
            if actor == state.player {
                state.visibility.reveal_all();
                state.stats.scrolls_read += 1;
            }
            consume_item(state, actor, item);
        }
        // Treasure converts to gold at pickup and is never carried
        ItemKind::Treasure => return Err(RejectionReason::NoTarget.into()),
    }

    let event = GameEvent::new(state.round, GameEventData::ItemUsed { entity: actor, item, kind });
    state.push_event(event);
    Ok(Applied::Consumed)
}

fn consume_item(state: &mut GameState, actor: EntityId, item: EntityId) {
    if let Some(entity) = state.registry.get_mut(actor) {
        entity.inventory.retain(|i| *i != item);
        if entity.equipped == Some(item) {
            entity.equipped = None;
        }
    }
    state.registry.remove(&mut state.grid, item);
}

fn apply_pickup(state: &mut GameState, actor: EntityId) -> Result<Applied, TurnError> {
    let pos = actor_position(state, actor)?;

    let Some(&item_id) = state.registry.items_at(pos).last() else {
        return Err(RejectionReason::NoTarget.into());
    };
    let Some(&Entity { kind: EntityKind::Item(kind), item: Some(data), .. }) =
        state.registry.get(item_id)
    else {
        return Err(RejectionReason::NoTarget.into());
    };

    if kind == ItemKind::Treasure {
        let amount = data.modifier.max(0) as u32 * data.stack;
        state.registry.remove(&mut state.grid, item_id);
        if actor == state.player {
            state.stats.gold += amount;
        }
        let event = GameEvent::new(state.round, GameEventData::GoldCollected { entity: actor, amount });
        state.push_event(event);
    } else {
        state.registry.take_item_from_tile(actor, item_id);
        let event = GameEvent::new(
            state.round,
            GameEventData::ItemPicked { entity: actor, item: item_id, kind },
        );
        state.push_event(event);
    }

    Ok(Applied::Consumed)
}

fn apply_stairs(state: &mut GameState, actor: EntityId, ascending: bool) -> Result<Applied, TurnError> {
    // Only the player travels between levels
    if actor != state.player {
        return Err(RejectionReason::NotOnStairs.into());
    }
    let pos = actor_position(state, actor)?;
    let expected = if ascending {
        Terrain::StairsUp
    } else {
        Terrain::StairsDown
    };
    if state.grid.terrain(pos) != expected {
        return Err(RejectionReason::NotOnStairs.into());
    }

    if !ascending && state.depth >= MAX_DEPTH {
        state.phase = GamePhase::Won;
        let event = GameEvent::new(state.round, GameEventData::GameOver { victory: true });
        state.push_event(event);
        return Ok(Applied::LevelChanged);
    }

    let new_depth = if ascending {
        state.depth - 1
    } else {
        state.depth + 1
    };
    state.change_level(new_depth, ascending).map_err(TurnError::Fatal)?;
    state.push_event(GameEvent::level_changed(state.round, new_depth, ascending));
    Ok(Applied::LevelChanged)
}

// =============================================================================
// ROUND MECHANICS
// =============================================================================

fn actor_position(state: &GameState, actor: EntityId) -> Result<crate::core::point::Point, TurnError> {
    state
        .registry
        .get(actor)
        .map(|e| e.position)
        .ok_or_else(|| RejectionReason::NoTarget.into())
}

fn hostile(state: &GameState, a: EntityId, b: EntityId) -> bool {
    let kind_of = |id| state.registry.get(id).map(|e| e.kind);
    match (kind_of(a), kind_of(b)) {
        (Some(EntityKind::Player), Some(EntityKind::Monster(_))) => true,
        (Some(EntityKind::Monster(_)), Some(EntityKind::Player)) => true,
        _ => false,
    }
}

/// Settle the cursor on an actionable actor: skip slots whose entity is
/// gone or incapacitated, and close out exhausted rounds. Terminates
/// because status durations strictly decrease at every round end.
fn normalize(state: &mut GameState) {
    loop {
        if state.phase != GamePhase::Playing {
            return;
        }
        if state.turn_order.exhausted() {
            end_round(state);
            continue;
        }
        let Some(id) = state.turn_order.current() else {
            end_round(state);
            continue;
        };
        if !state.registry.contains(id) {
            state.turn_order.advance();
            continue;
        }
        if state.registry.get(id).map(|e| e.incapacitated()).unwrap_or(true) {
            state.turn_order.advance();
            continue;
        }
        return;
    }
}

/// Close out a round: tick status effects once per entity (whether or
/// not it acted), then recompute the turn order for the next round.
fn end_round(state: &mut GameState) {
    let ids: Vec<EntityId> = state.registry.creatures().map(|e| e.id).collect();
    for id in ids {
        if !state.registry.contains(id) {
            continue;
        }
        let tick = combat::tick_statuses(&mut state.registry, id);
        for status in tick.expired {
            let event = GameEvent::new(state.round, GameEventData::StatusExpired { entity: id, status });
            state.push_event(event);
        }
        if tick.died {
            handle_death(state, id, None);
        }
    }

    state.round += 1;
    state.turn_order = TurnOrder::recompute(&state.registry);

    // Doors opened mid-round can change what the player sees
    if let Some(pos) = state.player_position() {
        state.visibility.refresh(&state.grid, pos, &state.config.vision);
    }
}

fn handle_death(state: &mut GameState, victim: EntityId, killer: Option<EntityId>) {
    let dropped = state.registry.kill(&mut state.grid, victim);
    state.turn_order.remove(victim);
    state.push_event(GameEvent::died(state.round, victim, killer, dropped));

    if killer == Some(state.player) {
        state.stats.kills += 1;
    }
    if victim == state.player {
        state.phase = GamePhase::Dead;
        let event = GameEvent::new(state.round, GameEventData::GameOver { victory: false });
        state.push_event(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
