//! Host-facing engine surface
//!
//! The host sets control flags, forwards contacts, submits answers and
//! reads snapshots. It never touches [`LevelState`] directly, and the
//! snapshot is the only state a HUD should display.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::levels::{self, ConfigError, LevelConfig};
use crate::sim::state::{CarriedItem, EntityId, EntityKind, LevelEvent, LevelState, Phase};
use crate::sim::{ValidationResult, tick};
use crate::ticks_to_ms;

pub use crate::sim::tick::ControlFlags;

/// Longest frame the accumulator will absorb (tab switches, debugger pauses)
const MAX_FRAME_DT: f32 = 0.1;

/// One entity as the renderer sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
}

/// Read-only projection of the engine for rendering and HUD
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub level: String,
    pub health: i32,
    pub max_health: i32,
    pub phase: Phase,
    pub stage: usize,
    pub stage_count: usize,
    pub prompt: String,
    pub counters: BTreeMap<String, u32>,
    pub targets: BTreeMap<String, u32>,
    pub entities: Vec<EntityView>,
    pub carrying: Option<CarriedItem>,
    pub last_result: Option<ValidationResult>,
    /// `None` for untimed levels
    pub time_remaining_ms: Option<u32>,
    pub resets: u32,
    pub tick: u64,
}

/// The single ingress/egress point between a host and one level attempt
pub struct EngineBridge {
    state: LevelState,
    controls: ControlFlags,
    accumulator: f32,
    on_complete: Option<Box<dyn FnOnce()>>,
    completed: bool,
    completion_fired: bool,
    completion_taken: bool,
}

impl EngineBridge {
    pub fn new(config: LevelConfig, seed: u64) -> Self {
        log::info!("Starting level '{}' with seed {}", config.id, seed);
        Self {
            state: LevelState::new(config, seed),
            controls: ControlFlags::default(),
            accumulator: 0.0,
            on_complete: None,
            completed: false,
            completion_fired: false,
            completion_taken: false,
        }
    }

    /// Start a built-in level by id
    pub fn from_level_id(id: &str, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self::new(levels::builtin(id)?, seed))
    }

    /// Start a level from JSON
    pub fn from_json(json: &str, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self::new(LevelConfig::from_json(json)?, seed))
    }

    /// Overwrite the current input; read by every following tick
    pub fn set_controls(&mut self, controls: ControlFlags) {
        self.controls = controls;
    }

    pub fn controls(&self) -> ControlFlags {
        self.controls
    }

    /// Report that two entities overlap (resolved on the next tick)
    pub fn report_collision(&mut self, a: EntityId, b: EntityId) {
        tick::report_contact(&mut self.state, a, b);
    }

    /// Run exactly one fixed step
    pub fn tick(&mut self) {
        tick::tick(&mut self.state, &self.controls, SIM_DT);
        self.poll_completion();
    }

    /// Feed one animation frame of wall time; returns the number of steps run
    pub fn advance_frame(&mut self, frame_dt: f32) -> u32 {
        // A bogus timestamp delta (NaN, inf) is skipped, not accumulated
        if !frame_dt.is_finite() {
            log::warn!("Ignoring non-finite frame delta {frame_dt}");
            return 0;
        }
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.tick();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        // Drop backlog the cap didn't get to
        if substeps == MAX_SUBSTEPS {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    pub fn submit_answer(&mut self, text: &str) -> ValidationResult {
        let result = tick::submit_answer(&mut self.state, text);
        self.poll_completion();
        result
    }

    /// Register the one-shot completion handler. Replaces any earlier one;
    /// fires immediately if the level is already complete and nothing fired yet.
    pub fn on_complete(&mut self, callback: impl FnOnce() + 'static) {
        if self.completion_fired {
            return;
        }
        self.on_complete = Some(Box::new(callback));
        self.fire_completion();
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_complete(&self) -> bool {
        self.state.phase == Phase::Complete
    }

    pub fn level_id(&self) -> &str {
        &self.state.config.id
    }

    /// Everything that happened since the last drain
    pub fn drain_events(&mut self) -> Vec<LevelEvent> {
        self.state.drain_events()
    }

    /// Read access for tooling and tests
    pub fn state(&self) -> &LevelState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = &self.state;
        let health = state.actors.player_health();
        let entities = state
            .actors
            .iter()
            .map(|e| EntityView {
                id: e.id,
                kind: e.kind,
                x: e.pos.x,
                y: e.pos.y,
                label: e.meta.label.clone(),
                group: e.meta.group.clone(),
                health: e.health.map(|h| h.current),
            })
            .collect();

        Snapshot {
            level: state.config.id.clone(),
            health: health.current,
            max_health: health.max,
            phase: state.phase,
            stage: state.stage_index,
            stage_count: state.config.stages.len(),
            prompt: state.stage().map(|s| s.prompt.clone()).unwrap_or_default(),
            counters: state.counters.counts().clone(),
            targets: state.counters.targets().clone(),
            entities,
            carrying: state.carrying.clone(),
            last_result: state.last_result.clone(),
            time_remaining_ms: state
                .time_remaining_ticks()
                .map(|t| ticks_to_ms(t).min(u32::MAX as u64) as u32),
            resets: state.resets,
            tick: state.time_ticks,
        }
    }

    /// True exactly once after the level completes, for hosts that poll
    /// instead of registering a handler
    pub fn take_completion(&mut self) -> bool {
        if self.completed && !self.completion_taken {
            self.completion_taken = true;
            return true;
        }
        false
    }

    fn poll_completion(&mut self) {
        if self.state.take_completion() {
            self.completed = true;
        }
        self.fire_completion();
    }

    fn fire_completion(&mut self) {
        if !self.completed || self.completion_fired {
            return;
        }
        if let Some(callback) = self.on_complete.take() {
            self.completion_fired = true;
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn bridge() -> EngineBridge {
        EngineBridge::from_level_id("select-star", 7).unwrap()
    }

    fn finish_select_star(bridge: &mut EngineBridge) {
        let player = bridge.state().actors.player_id();
        let items: Vec<EntityId> = bridge
            .snapshot()
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Collectible)
            .map(|e| e.id)
            .collect();
        for id in items {
            bridge.report_collision(player, id);
        }
        bridge.tick();
        assert_eq!(bridge.phase(), Phase::AwaitingAnswer);
        let answer = match &bridge.state().stage().unwrap().answer {
            crate::sim::CanonicalAnswerSet::Literal { accepted } => accepted[0].clone(),
            other => panic!("unexpected answer set {other:?}"),
        };
        assert!(bridge.submit_answer(&answer).matched);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let bridge = bridge();
        let snap = bridge.snapshot();
        assert_eq!(snap.level, "select-star");
        assert_eq!(snap.phase, Phase::Exploring);
        assert_eq!(snap.health, snap.max_health);
        assert_eq!(snap.entities[0].kind, EntityKind::Player);
        assert!(snap.counters.values().all(|&c| c == 0));
        assert!(!snap.prompt.is_empty());
    }

    #[test]
    fn test_advance_frame_uses_fixed_steps() {
        let mut bridge = bridge();
        assert_eq!(bridge.advance_frame(SIM_DT * 0.5), 0);
        assert_eq!(bridge.advance_frame(SIM_DT * 0.6), 1);
        assert_eq!(bridge.snapshot().tick, 1);
        // Huge frames are capped
        assert!(bridge.advance_frame(10.0) <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_non_finite_frame_does_not_stall_the_clock() {
        let mut bridge = bridge();
        assert_eq!(bridge.advance_frame(f32::NAN), 0);
        assert_eq!(bridge.advance_frame(f32::INFINITY), 0);
        assert_eq!(bridge.advance_frame(-1.0), 0);
        assert_eq!(bridge.advance_frame(0.06), 3);
        assert_eq!(bridge.snapshot().tick, 3);
    }

    #[test]
    fn test_take_completion_reports_once() {
        let mut bridge = bridge();
        assert!(!bridge.take_completion());
        finish_select_star(&mut bridge);
        assert!(bridge.take_completion());
        assert!(!bridge.take_completion());
    }

    #[test]
    fn test_completion_fires_once() {
        let mut bridge = bridge();
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        bridge.on_complete(move || counter.set(counter.get() + 1));

        finish_select_star(&mut bridge);
        assert!(bridge.is_complete());
        assert_eq!(fired.get(), 1);

        bridge.tick();
        bridge.submit_answer("SELECT * FROM anything;");
        let again = fired.clone();
        bridge.on_complete(move || again.set(again.get() + 1));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_late_completion_handler_fires_immediately() {
        let mut bridge = bridge();
        finish_select_star(&mut bridge);

        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        bridge.on_complete(move || flag.set(true));
        assert!(fired.get());
    }

    #[test]
    fn test_snapshot_serializes_for_host() {
        let json = serde_json::to_value(bridge().snapshot()).unwrap();
        assert_eq!(json["phase"], "exploring");
        assert_eq!(json["entities"][0]["kind"], "player");
        assert!(json["time_remaining_ms"].is_null());
    }
}
