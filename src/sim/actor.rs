//! Player and AI actors: movement, damage, cooldown-gated area actions
//!
//! The controller owns the entity arena. It reports what happened
//! (`died`, affected ids) and leaves scoring and phase changes to the
//! level state machine.

use glam::Vec2;

use super::cooldown::{ActionKind, CooldownScheduler};
use super::spawn::Bounds;
use super::state::{Entity, EntityId, EntityKind, EntityMeta, Health};
use super::tick::ControlFlags;
use crate::levels::{HostileTuning, PlayerTuning};
use crate::ms_to_ticks;

/// Hostile AI mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiMode {
    /// Oscillate horizontally around `home`
    Patrol,
    /// Head straight for the player
    Chase,
}

/// Hostile AI state and tuning
#[derive(Debug, Clone, PartialEq)]
pub struct AiBrain {
    pub mode: AiMode,
    pub home: Vec2,
    /// +1.0 or -1.0 along x
    pub patrol_dir: f32,
    pub patrol_distance: f32,
    pub aggro_range: f32,
    pub speed: f32,
    pub contact_damage: i32,
    pub hit_cooldown_ticks: u64,
}

impl AiBrain {
    pub fn new(home: Vec2, tuning: &HostileTuning) -> Self {
        Self {
            mode: AiMode::Patrol,
            home,
            patrol_dir: 1.0,
            patrol_distance: tuning.patrol_distance,
            aggro_range: tuning.aggro_range,
            speed: tuning.speed,
            contact_damage: tuning.contact_damage,
            hit_cooldown_ticks: ms_to_ticks(tuning.hit_cooldown_ms),
        }
    }

    /// Pick a mode from the current distance and return the desired velocity.
    /// Re-evaluated every tick with no hysteresis.
    fn steer(&mut self, pos: Vec2, player_pos: Vec2) -> Vec2 {
        let to_player = player_pos - pos;
        self.mode = if to_player.length() < self.aggro_range {
            AiMode::Chase
        } else {
            AiMode::Patrol
        };

        match self.mode {
            AiMode::Chase => to_player.normalize_or_zero() * self.speed,
            AiMode::Patrol => {
                let offset = pos.x - self.home.x;
                if offset >= self.patrol_distance {
                    self.patrol_dir = -1.0;
                } else if offset <= -self.patrol_distance {
                    self.patrol_dir = 1.0;
                }
                Vec2::new(self.patrol_dir * self.speed, 0.0)
            }
        }
    }
}

/// Result of `apply_damage`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    pub died: bool,
    pub remaining: i32,
}

/// Owns every entity of a level attempt plus their cooldowns
#[derive(Debug, Clone)]
pub struct ActorController {
    /// Sorted by id (ids are allocated monotonically, removal keeps order)
    entities: Vec<Entity>,
    pub cooldowns: CooldownScheduler,
    pub tuning: PlayerTuning,
    bounds: Bounds,
    player_start: Vec2,
    player_id: EntityId,
    next_id: EntityId,
}

impl ActorController {
    /// Create the arena with the player at `player_start`
    pub fn new(tuning: PlayerTuning, bounds: Bounds, player_start: Vec2) -> Self {
        let mut controller = Self {
            entities: Vec::new(),
            cooldowns: CooldownScheduler::new(),
            bounds,
            player_start,
            player_id: 0,
            next_id: 1,
            tuning,
        };
        let health = Some(Health::full(controller.tuning.max_health));
        controller.player_id = controller.spawn(
            EntityKind::Player,
            bounds.clamp(player_start),
            health,
            EntityMeta::default(),
        );
        controller
    }

    /// Allocate a new entity id
    fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn spawn(
        &mut self,
        kind: EntityKind,
        pos: Vec2,
        health: Option<Health>,
        meta: EntityMeta,
    ) -> EntityId {
        let id = self.next_entity_id();
        self.entities.push(Entity {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            health,
            meta,
        });
        id
    }

    /// Remove an entity (and its cooldowns). The player cannot be despawned.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        if id == self.player_id {
            return None;
        }
        let idx = self.entities.iter().position(|e| e.id == id)?;
        self.cooldowns.remove_actor(id);
        Some(self.entities.remove(idx))
    }

    pub fn player_id(&self) -> EntityId {
        self.player_id
    }

    pub fn player(&self) -> Option<&Entity> {
        self.get(self.player_id)
    }

    pub fn player_pos(&self) -> Vec2 {
        self.player().map(|p| p.pos).unwrap_or(self.player_start)
    }

    pub fn player_health(&self) -> Health {
        self.player()
            .and_then(|p| p.health)
            .unwrap_or(Health::full(self.tuning.max_health))
    }

    pub fn player_dead(&self) -> bool {
        self.player_health().is_depleted()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// All entities in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Move the player from the control flags, then run hostile AI
    pub fn advance(&mut self, dt: f32, controls: &ControlFlags) {
        let speed = self.tuning.speed;
        let bounds = self.bounds;
        let player_id = self.player_id;

        // Each axis gets the full speed, so diagonals are faster
        let mut dir = Vec2::ZERO;
        if controls.left {
            dir.x -= 1.0;
        }
        if controls.right {
            dir.x += 1.0;
        }
        if controls.up {
            dir.y -= 1.0;
        }
        if controls.down {
            dir.y += 1.0;
        }

        let mut player_pos = self.player_start;
        if let Some(player) = self.get_mut(player_id) {
            player.vel = dir * speed;
            player.pos = bounds.clamp(player.pos + player.vel * dt);
            player_pos = player.pos;
        }

        for entity in &mut self.entities {
            let Some(brain) = entity.meta.brain.as_mut() else {
                continue;
            };
            entity.vel = brain.steer(entity.pos, player_pos);
            entity.pos = bounds.clamp(entity.pos + entity.vel * dt);
        }
    }

    /// Subtract health. Health is floored at zero; `died` once it gets there.
    pub fn apply_damage(&mut self, id: EntityId, amount: i32) -> DamageOutcome {
        let Some(health) = self.get_mut(id).and_then(|e| e.health.as_mut()) else {
            return DamageOutcome::default();
        };
        health.current = (health.current - amount.max(0)).max(0);
        DamageOutcome {
            died: health.is_depleted(),
            remaining: health.current,
        }
    }

    /// Cooldown-gated area action. `None` when the action is still cooling
    /// down (nothing happens); otherwise the ids within `radius` of `origin`
    /// (plus each target's own radius) whose kind is in `kinds`, in creation order.
    pub fn resolve_area_action(
        &mut self,
        actor: EntityId,
        action: ActionKind,
        cooldown_ticks: u64,
        origin: Vec2,
        radius: f32,
        kinds: &[EntityKind],
    ) -> Option<Vec<EntityId>> {
        if !self.cooldowns.try_use(actor, action, cooldown_ticks) {
            return None;
        }
        Some(
            self.entities
                .iter()
                .filter(|e| e.id != actor && kinds.contains(&e.kind))
                .filter(|e| e.pos.distance(origin) <= radius + e.meta.radius)
                .map(|e| e.id)
                .collect(),
        )
    }

    /// Player attack around the player position
    pub fn player_attack(&mut self) -> Option<Vec<EntityId>> {
        let origin = self.player_pos();
        self.resolve_area_action(
            self.player_id,
            ActionKind::Attack,
            ms_to_ticks(self.tuning.attack_cooldown_ms),
            origin,
            self.tuning.attack_radius,
            &[EntityKind::Hostile],
        )
    }

    /// Player interact around the player position
    pub fn player_interact(&mut self) -> Option<Vec<EntityId>> {
        let origin = self.player_pos();
        self.resolve_area_action(
            self.player_id,
            ActionKind::Interact,
            ms_to_ticks(self.tuning.interact_cooldown_ms),
            origin,
            self.tuning.interact_radius,
            &[EntityKind::Collectible, EntityKind::InteractionZone],
        )
    }

    /// A hostile touching the player. Gated by that hostile's own hit cooldown;
    /// `None` if the hit was ignored.
    pub fn hostile_contact(&mut self, hostile: EntityId) -> Option<(i32, DamageOutcome)> {
        let (damage, cooldown) = self
            .get(hostile)
            .filter(|e| e.kind == EntityKind::Hostile)
            .and_then(|e| e.meta.brain.as_ref())
            .map(|b| (b.contact_damage, b.hit_cooldown_ticks))?;

        if !self
            .cooldowns
            .try_use(hostile, ActionKind::ContactHit, cooldown)
        {
            return None;
        }
        Some((damage, self.apply_damage(self.player_id, damage)))
    }

    /// Drop everything but the player, who goes back to the start at full health
    pub fn reset_attempt(&mut self) {
        let player_id = self.player_id;
        self.entities.retain(|e| e.id == player_id);
        self.cooldowns.clear();
        let start = self.bounds.clamp(self.player_start);
        let max_health = self.tuning.max_health;
        if let Some(player) = self.get_mut(player_id) {
            player.pos = start;
            player.vel = Vec2::ZERO;
            player.health = Some(Health::full(max_health));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn controller() -> ActorController {
        ActorController::new(
            PlayerTuning::default(),
            Bounds::from_size(800.0, 600.0),
            Vec2::new(400.0, 300.0),
        )
    }

    fn spawn_hostile(actors: &mut ActorController, pos: Vec2) -> EntityId {
        let tuning = HostileTuning::default();
        actors.spawn(
            EntityKind::Hostile,
            pos,
            Some(Health::full(tuning.health)),
            EntityMeta {
                brain: Some(AiBrain::new(pos, &tuning)),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_player_moves_with_fixed_speed() {
        let mut actors = controller();
        let start = actors.player_pos();
        let controls = ControlFlags {
            right: true,
            ..Default::default()
        };
        actors.advance(1.0, &controls);
        let moved = actors.player_pos() - start;
        assert!((moved.x - actors.tuning.speed).abs() < 0.001);
        assert_eq!(moved.y, 0.0);
    }

    #[test]
    fn test_diagonal_is_not_normalized() {
        let mut actors = controller();
        let controls = ControlFlags {
            down: true,
            right: true,
            ..Default::default()
        };
        actors.advance(SIM_DT, &controls);
        let vel = actors.player().unwrap().vel;
        assert!(vel.length() > actors.tuning.speed * 1.4);
    }

    #[test]
    fn test_player_clamped_to_bounds() {
        let mut actors = controller();
        let controls = ControlFlags {
            left: true,
            up: true,
            ..Default::default()
        };
        for _ in 0..1000 {
            actors.advance(SIM_DT, &controls);
        }
        assert_eq!(actors.player_pos(), Vec2::ZERO);
    }

    #[test]
    fn test_ai_chases_inside_aggro_and_patrols_outside() {
        let mut actors = controller();
        let near = spawn_hostile(&mut actors, Vec2::new(450.0, 300.0));
        let far = spawn_hostile(&mut actors, Vec2::new(50.0, 50.0));

        actors.advance(SIM_DT, &ControlFlags::default());
        let near_e = actors.get(near).unwrap();
        assert_eq!(near_e.meta.brain.as_ref().unwrap().mode, AiMode::Chase);
        // Moving toward the player (who is to the left)
        assert!(near_e.vel.x < 0.0);

        let far_e = actors.get(far).unwrap();
        assert_eq!(far_e.meta.brain.as_ref().unwrap().mode, AiMode::Patrol);
        assert_eq!(far_e.vel.y, 0.0);
    }

    #[test]
    fn test_patrol_turns_around_at_patrol_distance() {
        let mut actors = controller();
        let id = spawn_hostile(&mut actors, Vec2::new(100.0, 550.0));
        let patrol_distance = HostileTuning::default().patrol_distance;

        let mut max_offset: f32 = 0.0;
        let mut min_offset: f32 = 0.0;
        for _ in 0..600 {
            actors.advance(SIM_DT, &ControlFlags::default());
            let offset = actors.get(id).unwrap().pos.x - 100.0;
            max_offset = max_offset.max(offset);
            min_offset = min_offset.min(offset);
        }
        assert!(max_offset >= patrol_distance);
        assert!(max_offset < patrol_distance + 5.0);
        assert!(min_offset <= -patrol_distance);
    }

    #[test]
    fn test_apply_damage_reports_death() {
        let mut actors = controller();
        let id = spawn_hostile(&mut actors, Vec2::new(10.0, 10.0));
        let first = actors.apply_damage(id, 30);
        assert!(!first.died);
        assert_eq!(first.remaining, 20);
        let second = actors.apply_damage(id, 30);
        assert!(second.died);
        assert_eq!(second.remaining, 0);
        // Controller never removes the entity itself
        assert!(actors.get(id).is_some());
        // Unknown ids are ignored
        assert_eq!(actors.apply_damage(999, 10), DamageOutcome::default());
    }

    #[test]
    fn test_area_action_gated_by_cooldown() {
        let mut actors = controller();
        let id = spawn_hostile(&mut actors, Vec2::new(420.0, 300.0));
        spawn_hostile(&mut actors, Vec2::new(700.0, 300.0));

        let hit = actors.player_attack();
        assert_eq!(hit, Some(vec![id]));
        // Second attack inside the window is a no-op
        assert_eq!(actors.player_attack(), None);

        let window = ms_to_ticks(actors.tuning.attack_cooldown_ms);
        actors.cooldowns.tick(window);
        assert_eq!(actors.player_attack(), Some(vec![id]));
    }

    #[test]
    fn test_hostile_contact_uses_hit_cooldown() {
        let mut actors = controller();
        let id = spawn_hostile(&mut actors, Vec2::new(400.0, 300.0));

        let (damage, outcome) = actors.hostile_contact(id).unwrap();
        assert_eq!(damage, 15);
        assert_eq!(outcome.remaining, 85);
        assert!(actors.hostile_contact(id).is_none());
        assert!(actors.hostile_contact(actors.player_id()).is_none());
    }

    #[test]
    fn test_reset_attempt_keeps_only_player() {
        let mut actors = controller();
        let pid = actors.player_id();
        spawn_hostile(&mut actors, Vec2::new(100.0, 100.0));
        actors.apply_damage(pid, 40);
        actors.advance(
            SIM_DT,
            &ControlFlags {
                up: true,
                ..Default::default()
            },
        );
        actors.player_attack();

        actors.reset_attempt();
        assert_eq!(actors.iter().count(), 1);
        assert_eq!(actors.player_id(), pid);
        assert_eq!(actors.player_health().current, actors.tuning.max_health);
        assert_eq!(actors.player_pos(), Vec2::new(400.0, 300.0));
        assert!(actors.cooldowns.is_empty());
        assert!(actors.despawn(pid).is_none());
    }
}
