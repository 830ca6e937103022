//! Fixed timestep level state machine
//!
//! Exploring → (CombatGate) → AwaitingAnswer → next stage or Complete.
//! Player defeat or timer expiry resets the attempt back to stage 0.
//! `Complete` is only ever entered from a matching [`submit_answer`].

use serde::{Deserialize, Serialize};

use super::answer::{ValidationResult, validate};
use super::collision::{Contact, order_contacts};
use super::spawn::{Occupant, SpawnPlanner};
use super::state::{
    CarriedItem, EntityId, EntityKind, LevelEvent, LevelState, Phase, PickupMode, ResetReason,
};
use crate::levels::{COLLECTED, DEFEATED, GROUPED, SpawnGroup, SpawnTrigger};

/// Input flags for a single tick (keyboard and touch merged by the host)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Attack
    pub primary: bool,
    /// Interact (fish, deliver)
    pub secondary: bool,
}

impl ControlFlags {
    /// Parse a host-supplied flag object; absent fields are `false`
    pub fn from_json(json: &str) -> Result<ControlFlags, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Union of two input sources
    pub fn merge(self, other: ControlFlags) -> ControlFlags {
        ControlFlags {
            up: self.up || other.up,
            down: self.down || other.down,
            left: self.left || other.left,
            right: self.right || other.right,
            primary: self.primary || other.primary,
            secondary: self.secondary || other.secondary,
        }
    }
}

/// Advance the level by one fixed timestep
pub fn tick(state: &mut LevelState, controls: &ControlFlags, dt: f32) {
    // Answer overlay open (or level done): gameplay is frozen
    if !state.phase.is_gameplay() {
        state.pending_contacts.clear();
        return;
    }

    state.time_ticks += 1;
    state.attempt_ticks += 1;
    state.actors.cooldowns.tick(state.time_ticks);

    state.actors.advance(dt, controls);

    if controls.primary {
        player_attack(state);
    }
    if controls.secondary {
        player_interact(state);
    }

    let mut contacts = std::mem::take(&mut state.pending_contacts);
    order_contacts(&mut contacts);
    for contact in contacts {
        handle_contact(state, contact);
    }

    if state.actors.player_dead() {
        reset(state, ResetReason::PlayerDefeated);
        return;
    }
    if state
        .time_limit_ticks()
        .is_some_and(|limit| state.attempt_ticks >= limit)
    {
        reset(state, ResetReason::TimerExpired);
        return;
    }

    check_hostiles_cleared(state);
    check_gates(state);
}

/// Queue a host-detected overlap; resolved on the next gameplay tick
pub fn report_contact(state: &mut LevelState, a: EntityId, b: EntityId) {
    if !state.phase.is_gameplay() {
        return;
    }
    if let Some(contact) = Contact::new(a, b) {
        state.pending_contacts.push(contact);
    }
}

/// Check a typed answer. Outside `AwaitingAnswer` this is a no-op non-match.
pub fn submit_answer(state: &mut LevelState, text: &str) -> ValidationResult {
    if state.phase != Phase::AwaitingAnswer {
        return ValidationResult::rejected();
    }
    let Some(stage) = state.stage() else {
        return ValidationResult::rejected();
    };
    let result = validate(text, &stage.answer);
    state.last_result = Some(result.clone());

    if !result.matched {
        log::debug!(
            "Answer rejected on stage {} (missing: {:?})",
            state.stage_index,
            result.missing
        );
        return result;
    }

    if state.is_final_stage() {
        enter_phase(state, Phase::Complete);
        state.completion_pending = true;
        state.events.push(LevelEvent::Completed);
        log::info!(
            "Level '{}' complete after {} resets",
            state.config.id,
            state.resets
        );
    } else {
        let next = state.stage_index + 1;
        state.events.push(LevelEvent::StageAdvanced { stage: next });
        begin_stage(state, next);
    }
    result
}

/// Enter a stage's Exploring phase and place its `StageStart` groups
pub(crate) fn begin_stage(state: &mut LevelState, stage_index: usize) {
    state.stage_index = stage_index;
    state.stage_had_hostiles = state.actors.count(EntityKind::Hostile) > 0;
    state.hostiles_cleared_fired = false;
    if let Some(objectives) = state.stage().map(|s| s.all_objectives()) {
        state.counters.set_targets(&objectives);
    }
    enter_phase(state, Phase::Exploring);
    spawn_groups(state, SpawnTrigger::StageStart);
}

/// Failed → Reset: throw the attempt away and repopulate stage 0
fn reset(state: &mut LevelState, reason: ResetReason) {
    log::info!(
        "Level '{}' reset ({:?}) after {} ticks",
        state.config.id,
        reason,
        state.attempt_ticks
    );
    state.counters.reset();
    state.actors.reset_attempt();
    state.carrying = None;
    state.pending_contacts.clear();
    state.attempt_ticks = 0;
    state.resets += 1;
    state.last_result = None;
    state.events.push(LevelEvent::Reset { reason });
    begin_stage(state, 0);
}

fn enter_phase(state: &mut LevelState, to: Phase) {
    let from = state.phase;
    if from == to {
        return;
    }
    state.phase = to;
    log::info!(
        "Level '{}' stage {}: {} -> {}",
        state.config.id,
        state.stage_index,
        from.as_str(),
        to.as_str()
    );
    state.events.push(LevelEvent::PhaseChanged { from, to });
}

fn check_gates(state: &mut LevelState) {
    let Some(stage) = state.stage() else {
        return;
    };
    let objectives_met = state.counters.all_met(&stage.objectives);
    let combat_met = stage
        .combat
        .as_ref()
        .map(|c| state.counters.is_met(c))
        .unwrap_or(true);
    let has_combat = stage.combat.is_some();

    match state.phase {
        Phase::Exploring if objectives_met => {
            if has_combat {
                enter_phase(state, Phase::CombatGate);
                spawn_groups(state, SpawnTrigger::CombatGate);
            } else {
                enter_phase(state, Phase::AwaitingAnswer);
            }
        }
        Phase::CombatGate if combat_met => enter_phase(state, Phase::AwaitingAnswer),
        _ => {}
    }
}

fn check_hostiles_cleared(state: &mut LevelState) {
    if state.stage_had_hostiles
        && !state.hostiles_cleared_fired
        && state.actors.count(EntityKind::Hostile) == 0
    {
        state.hostiles_cleared_fired = true;
        log::debug!("All hostiles cleared on stage {}", state.stage_index);
        spawn_groups(state, SpawnTrigger::HostilesCleared);
    }
}

fn spawn_groups(state: &mut LevelState, trigger: SpawnTrigger) {
    let groups: Vec<SpawnGroup> = match state.stage() {
        Some(stage) => stage
            .spawns
            .iter()
            .filter(|g| g.trigger == trigger)
            .cloned()
            .collect(),
        None => return,
    };
    for group in &groups {
        spawn_group(state, group);
    }
}

fn spawn_group(state: &mut LevelState, group: &SpawnGroup) {
    let planner = SpawnPlanner::new(state.actors.bounds(), state.actors.player_pos());
    let existing: Vec<Occupant> = state
        .actors
        .iter()
        .filter(|e| e.kind != EntityKind::Player)
        .map(Occupant::from)
        .collect();
    let placements = planner.place_many(
        &group.constraint,
        group.kind,
        group.count,
        &existing,
        &group.preferred,
        &mut state.rng,
    );
    log::debug!(
        "Spawning {} {:?} ({:?})",
        placements.len(),
        group.kind,
        group.trigger
    );

    for (i, placement) in placements.into_iter().enumerate() {
        if !placement.satisfied {
            log::warn!(
                "Spawn spacing not met for {:?} after {} attempts, placing at {:?}",
                group.kind,
                placement.attempts,
                placement.pos
            );
        }
        let id = state.actors.spawn(
            group.kind,
            placement.pos,
            group.health(),
            group.meta_for(i, placement.pos),
        );
        if group.kind == EntityKind::Hostile {
            state.stage_had_hostiles = true;
        }
        state.events.push(LevelEvent::Spawned {
            id,
            kind: group.kind,
            constrained: placement.satisfied,
        });
    }
}

fn handle_contact(state: &mut LevelState, contact: Contact) {
    let Some(other_id) = contact.other(state.actors.player_id()) else {
        return;
    };
    let Some(other) = state.actors.get(other_id) else {
        return;
    };

    match (other.kind, other.meta.pickup) {
        (EntityKind::Hostile, _) => {
            if let Some((damage, outcome)) = state.actors.hostile_contact(other_id) {
                state.events.push(LevelEvent::PlayerHit {
                    by: other_id,
                    damage,
                    remaining: outcome.remaining,
                });
            }
        }
        (EntityKind::Collectible, PickupMode::Touch) => collect(state, other_id),
        (EntityKind::Collectible, PickupMode::Carry) => pick_up(state, other_id),
        _ => {}
    }
}

fn player_attack(state: &mut LevelState) {
    let Some(targets) = state.actors.player_attack() else {
        return;
    };
    let damage = state.actors.tuning.attack_damage;
    for id in targets {
        if state.actors.apply_damage(id, damage).died {
            defeat(state, id);
        }
    }
}

fn player_interact(state: &mut LevelState) {
    let Some(targets) = state.actors.player_interact() else {
        return;
    };
    for id in targets {
        let Some(entity) = state.actors.get(id) else {
            continue;
        };
        match (entity.kind, entity.meta.pickup) {
            (EntityKind::Collectible, PickupMode::Interact) => collect(state, id),
            (EntityKind::InteractionZone, _) => deliver(state, id),
            _ => {}
        }
    }
}

fn collect(state: &mut LevelState, id: EntityId) {
    let Some(entity) = state.actors.despawn(id) else {
        return;
    };
    let counter = entity.meta.counter.unwrap_or_else(|| COLLECTED.to_string());
    let count = state.counters.increment(&counter);
    log::debug!("Collected {:?} ({counter} = {count})", entity.meta.label);
    state.events.push(LevelEvent::Collected { id, counter });
}

fn defeat(state: &mut LevelState, id: EntityId) {
    let Some(entity) = state.actors.despawn(id) else {
        return;
    };
    let counter = entity.meta.counter.unwrap_or_else(|| DEFEATED.to_string());
    let count = state.counters.increment(&counter);
    log::debug!("Defeated hostile {id} ({counter} = {count})");
    state.events.push(LevelEvent::Defeated { id, counter });
}

fn pick_up(state: &mut LevelState, id: EntityId) {
    if state.carrying.is_some() {
        return;
    }
    let Some(entity) = state.actors.despawn(id) else {
        return;
    };
    state.carrying = Some(CarriedItem {
        label: entity.meta.label,
        group: entity.meta.group,
        counter: entity.meta.counter,
    });
    state.events.push(LevelEvent::PickedUp { id });
}

fn deliver(state: &mut LevelState, zone_id: EntityId) {
    let Some(item) = state.carrying.as_ref() else {
        return;
    };
    let Some(zone) = state.actors.get(zone_id) else {
        return;
    };
    // A zone without a group accepts anything
    let accepted = zone.meta.group.is_none() || zone.meta.group == item.group;
    if !accepted {
        state.events.push(LevelEvent::DeliveryRejected { zone: zone_id });
        return;
    }

    let counter = item.counter.clone().unwrap_or_else(|| GROUPED.to_string());
    state.carrying = None;
    state.counters.increment(&counter);
    state.events.push(LevelEvent::Delivered {
        zone: zone_id,
        counter,
    });
}
