//! Cooldown gating for reusable actions
//!
//! Each `(actor, action)` pair has its own ready-at tick, so one actor's
//! attack never blocks another actor's attack (or its own interact).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::state::EntityId;

/// Actions that can be gated by a cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Player melee attack (primary)
    Attack,
    /// Player interact: fishing spots, zone deliveries (secondary)
    Interact,
    /// Hostile touching the player
    ContactHit,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Attack => "attack",
            ActionKind::Interact => "interact",
            ActionKind::ContactHit => "contact_hit",
        }
    }
}

/// A live cooldown entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownToken {
    pub action: ActionKind,
    pub actor: EntityId,
    pub ready_at_tick: u64,
}

/// Per-actor, per-action cooldown table
#[derive(Debug, Clone, Default)]
pub struct CooldownScheduler {
    current_tick: u64,
    entries: BTreeMap<(EntityId, ActionKind), u64>,
}

impl CooldownScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// True iff no entry exists or its window has elapsed
    pub fn ready(&self, actor: EntityId, action: ActionKind) -> bool {
        match self.entries.get(&(actor, action)) {
            Some(&ready_at) => self.current_tick >= ready_at,
            None => true,
        }
    }

    /// Start (or restart) a cooldown window of `duration_ticks`
    pub fn trigger(&mut self, actor: EntityId, action: ActionKind, duration_ticks: u64) {
        let ready_at = self.current_tick.saturating_add(duration_ticks);
        self.entries.insert((actor, action), ready_at);
    }

    /// Gate + trigger in one step. Returns false (and changes nothing) when not ready.
    pub fn try_use(&mut self, actor: EntityId, action: ActionKind, duration_ticks: u64) -> bool {
        if !self.ready(actor, action) {
            return false;
        }
        self.trigger(actor, action, duration_ticks);
        true
    }

    /// Advance the clock and drop expired entries
    pub fn tick(&mut self, current_tick: u64) {
        self.current_tick = current_tick;
        self.entries.retain(|_, ready_at| *ready_at > current_tick);
    }

    /// Ticks left before `action` is ready again (0 if ready)
    pub fn remaining(&self, actor: EntityId, action: ActionKind) -> u64 {
        self.entries
            .get(&(actor, action))
            .map(|ready_at| ready_at.saturating_sub(self.current_tick))
            .unwrap_or(0)
    }

    /// Forget every cooldown owned by a destroyed actor
    pub fn remove_actor(&mut self, actor: EntityId) {
        self.entries.retain(|(owner, _), _| *owner != actor);
    }

    /// Discard every in-flight cooldown (level reset)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Live entries in stable (actor, action) order
    pub fn tokens(&self) -> impl Iterator<Item = CooldownToken> + '_ {
        self.entries
            .iter()
            .map(|(&(actor, action), &ready_at_tick)| CooldownToken {
                action,
                actor,
                ready_at_tick,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_without_entry() {
        let cds = CooldownScheduler::new();
        assert!(cds.ready(1, ActionKind::Attack));
        assert_eq!(cds.remaining(1, ActionKind::Attack), 0);
    }

    #[test]
    fn test_trigger_blocks_until_ready_tick() {
        let mut cds = CooldownScheduler::new();
        cds.tick(10);
        cds.trigger(1, ActionKind::Attack, 5);
        assert!(!cds.ready(1, ActionKind::Attack));
        assert_eq!(cds.remaining(1, ActionKind::Attack), 5);

        cds.tick(14);
        assert!(!cds.ready(1, ActionKind::Attack));

        cds.tick(15);
        assert!(cds.ready(1, ActionKind::Attack));
        // Expired entries are purged
        assert!(cds.is_empty());
    }

    #[test]
    fn test_actors_do_not_interfere() {
        let mut cds = CooldownScheduler::new();
        cds.trigger(1, ActionKind::Attack, 100);
        assert!(!cds.ready(1, ActionKind::Attack));
        assert!(cds.ready(2, ActionKind::Attack));
        assert!(cds.ready(1, ActionKind::Interact));
    }

    #[test]
    fn test_try_use_applies_once_per_window() {
        let mut cds = CooldownScheduler::new();
        let mut applied = 0;
        for tick in 0..3 {
            cds.tick(tick);
            if cds.try_use(7, ActionKind::Interact, 30) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        cds.tick(30);
        if cds.try_use(7, ActionKind::Interact, 30) {
            applied += 1;
        }
        assert_eq!(applied, 2);
    }

    #[test]
    fn test_trigger_overwrites_existing_window() {
        let mut cds = CooldownScheduler::new();
        cds.trigger(3, ActionKind::ContactHit, 100);
        cds.trigger(3, ActionKind::ContactHit, 2);
        cds.tick(2);
        assert!(cds.ready(3, ActionKind::ContactHit));
    }

    #[test]
    fn test_remove_actor_and_clear() {
        let mut cds = CooldownScheduler::new();
        cds.trigger(1, ActionKind::Attack, 10);
        cds.trigger(1, ActionKind::Interact, 10);
        cds.trigger(2, ActionKind::Attack, 10);
        cds.remove_actor(1);
        assert_eq!(cds.len(), 1);
        assert_eq!(cds.tokens().next().map(|t| t.actor), Some(2));

        cds.clear();
        assert!(cds.is_empty());
    }
}
