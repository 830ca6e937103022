//! Level state and core simulation types
//!
//! Everything one level attempt owns lives in [`LevelState`]: entities,
//! cooldowns, counters, phase and RNG. Nothing is shared across levels.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::actor::{ActorController, AiBrain};
use super::answer::ValidationResult;
use super::collision::Contact;
use crate::levels::{LevelConfig, Objective, StageConfig};
use crate::ms_to_ticks;

/// Stable entity handle (allocation order = creation order)
pub type EntityId = u32;

/// What an entity is, for rendering and event routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Hostile,
    Collectible,
    InteractionZone,
}

/// How a collectible is picked up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupMode {
    /// Collected on contact
    #[default]
    Touch,
    /// Collected with the interact action while in range (fishing spots)
    Interact,
    /// Picked up on contact, delivered to a matching zone
    Carry,
}

/// Hit points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

/// Per-entity data beyond position: display text, scoring, AI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMeta {
    /// Text drawn with the entity (keyword, column name, ...)
    pub label: Option<String>,
    /// Grouping key for carry/deliver (collectibles) or accepted group (zones)
    pub group: Option<String>,
    /// Counter credited when this entity is collected/defeated/delivered into
    pub counter: Option<String>,
    pub pickup: PickupMode,
    /// Interaction radius added to range checks (zones are areas, not points)
    pub radius: f32,
    pub brain: Option<AiBrain>,
}

/// A simulated object
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub health: Option<Health>,
    pub meta: EntityMeta,
}

/// Level phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Collect/defeat toward the stage objectives
    Exploring,
    /// Stage guardians must be defeated before the answer gate opens
    CombatGate,
    /// Gameplay frozen, waiting for a typed answer
    AwaitingAnswer,
    /// Terminal
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Exploring => "exploring",
            Phase::CombatGate => "combat_gate",
            Phase::AwaitingAnswer => "awaiting_answer",
            Phase::Complete => "complete",
        }
    }

    /// Phases in which movement, AI and combat run
    pub fn is_gameplay(&self) -> bool {
        matches!(self, Phase::Exploring | Phase::CombatGate)
    }
}

/// Why an attempt was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    PlayerDefeated,
    TimerExpired,
}

/// Something that happened during a tick or answer submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LevelEvent {
    PhaseChanged { from: Phase, to: Phase },
    StageAdvanced { stage: usize },
    Collected { id: EntityId, counter: String },
    PickedUp { id: EntityId },
    Delivered { zone: EntityId, counter: String },
    DeliveryRejected { zone: EntityId },
    Defeated { id: EntityId, counter: String },
    PlayerHit { by: EntityId, damage: i32, remaining: i32 },
    Spawned { id: EntityId, kind: EntityKind, constrained: bool },
    Reset { reason: ResetReason },
    Completed,
}

/// Named progress counters and the targets of the current stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectiveCounters {
    counts: BTreeMap<String, u32>,
    targets: BTreeMap<String, u32>,
}

impl ObjectiveCounters {
    /// Counters start at zero for every name the level mentions
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counts: names.into_iter().map(|n| (n.into(), 0)).collect(),
            targets: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, name: &str) -> u32 {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn target(&self, name: &str) -> Option<u32> {
        self.targets.get(name).copied()
    }

    pub fn set_targets(&mut self, objectives: &[Objective]) {
        self.targets = objectives
            .iter()
            .map(|o| (o.counter.clone(), o.target))
            .collect();
    }

    pub fn is_met(&self, objective: &Objective) -> bool {
        self.get(&objective.counter) >= objective.target
    }

    pub fn all_met(&self, objectives: &[Objective]) -> bool {
        objectives.iter().all(|o| self.is_met(o))
    }

    /// Zero every count (targets stay with the stage)
    pub fn reset(&mut self) {
        for count in self.counts.values_mut() {
            *count = 0;
        }
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    pub fn targets(&self) -> &BTreeMap<String, u32> {
        &self.targets
    }
}

/// An item the player is holding (it left the entity list on pickup)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedItem {
    pub label: Option<String>,
    pub group: Option<String>,
    /// Credited on delivery (`grouped` when unset)
    pub counter: Option<String>,
}

/// Complete state of one level attempt
#[derive(Debug, Clone)]
pub struct LevelState {
    pub config: LevelConfig,
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub phase: Phase,
    pub stage_index: usize,
    pub counters: ObjectiveCounters,
    pub actors: ActorController,
    pub carrying: Option<CarriedItem>,
    /// Gameplay ticks simulated this level (drives cooldowns; frozen while answering)
    pub time_ticks: u64,
    /// Gameplay ticks in the current attempt (drives the level timer)
    pub attempt_ticks: u64,
    pub resets: u32,
    /// Diagnostic from the most recent answer submission
    pub last_result: Option<ValidationResult>,
    pub(crate) pending_contacts: Vec<Contact>,
    pub(crate) events: Vec<LevelEvent>,
    /// A hostile existed at some point during this stage
    pub(crate) stage_had_hostiles: bool,
    pub(crate) hostiles_cleared_fired: bool,
    pub(crate) completion_pending: bool,
}

impl LevelState {
    /// Create a fresh attempt and populate stage 0
    pub fn new(config: LevelConfig, seed: u64) -> Self {
        let counters = ObjectiveCounters::new(config.counter_names());
        let actors = ActorController::new(config.player.clone(), config.bounds, config.player_start);
        let mut state = Self {
            config,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: Phase::Exploring,
            stage_index: 0,
            counters,
            actors,
            carrying: None,
            time_ticks: 0,
            attempt_ticks: 0,
            resets: 0,
            last_result: None,
            pending_contacts: Vec::new(),
            events: Vec::new(),
            stage_had_hostiles: false,
            hostiles_cleared_fired: false,
            completion_pending: false,
        };
        super::tick::begin_stage(&mut state, 0);
        state
    }

    pub fn stage(&self) -> Option<&StageConfig> {
        self.config.stages.get(self.stage_index)
    }

    pub fn is_final_stage(&self) -> bool {
        self.stage_index + 1 >= self.config.stages.len()
    }

    pub fn time_limit_ticks(&self) -> Option<u64> {
        self.config.time_limit_ms.map(ms_to_ticks)
    }

    /// Ticks left on the level timer, if the level has one
    pub fn time_remaining_ticks(&self) -> Option<u64> {
        self.time_limit_ticks()
            .map(|limit| limit.saturating_sub(self.attempt_ticks))
    }

    /// Take everything that happened since the last drain
    pub fn drain_events(&mut self) -> Vec<LevelEvent> {
        std::mem::take(&mut self.events)
    }

    /// Consume the one-shot completion flag
    pub fn take_completion(&mut self) -> bool {
        std::mem::take(&mut self.completion_pending)
    }
}
