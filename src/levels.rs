//! Data-driven level configuration
//!
//! Every level is the same engine fed different data: arena, tuning, and a
//! list of stages (objectives, spawn groups, answer gate). Levels can be
//! loaded from JSON or taken from the built-in catalogue.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::actor::AiBrain;
use crate::sim::answer::{CanonicalAnswerSet, RequiredToken, TokenOrder};
use crate::sim::spawn::{Bounds, SpawnConstraint};
use crate::sim::state::{EntityKind, EntityMeta, Health, PickupMode};

/// Counter credited by touch/interact collectibles unless a group overrides it
pub const COLLECTED: &str = "collected";
/// Counter credited by defeated hostiles
pub const DEFEATED: &str = "defeated";
/// Counter credited by carried items delivered to a matching zone
pub const GROUPED: &str = "grouped";

/// Level loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid level JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown level id `{0}`")]
    UnknownLevel(String),
    #[error("level `{level}`: {reason}")]
    Invalid { level: String, reason: String },
}

/// Player movement and action tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub speed: f32,
    pub max_health: i32,
    pub attack_damage: i32,
    pub attack_radius: f32,
    pub attack_cooldown_ms: u32,
    pub interact_radius: f32,
    pub interact_cooldown_ms: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: PLAYER_SPEED,
            max_health: PLAYER_MAX_HEALTH,
            attack_damage: PLAYER_ATTACK_DAMAGE,
            attack_radius: PLAYER_ATTACK_RADIUS,
            attack_cooldown_ms: PLAYER_ATTACK_COOLDOWN_MS,
            interact_radius: PLAYER_INTERACT_RADIUS,
            interact_cooldown_ms: PLAYER_INTERACT_COOLDOWN_MS,
        }
    }
}

/// Hostile stats and AI tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileTuning {
    pub health: i32,
    pub contact_damage: i32,
    pub hit_cooldown_ms: u32,
    pub speed: f32,
    pub aggro_range: f32,
    pub patrol_distance: f32,
}

impl Default for HostileTuning {
    fn default() -> Self {
        Self {
            health: HOSTILE_HEALTH,
            contact_damage: HOSTILE_CONTACT_DAMAGE,
            hit_cooldown_ms: HOSTILE_HIT_COOLDOWN_MS,
            speed: HOSTILE_SPEED,
            aggro_range: HOSTILE_AGGRO_RANGE,
            patrol_distance: HOSTILE_PATROL_DISTANCE,
        }
    }
}

/// `counter >= target` (targets are attempt-wide totals, not per-stage deltas)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub counter: String,
    pub target: u32,
}

impl Objective {
    pub fn new(counter: &str, target: u32) -> Self {
        Self {
            counter: counter.to_string(),
            target,
        }
    }
}

/// When a spawn group is placed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnTrigger {
    /// On entering the stage's Exploring phase (and after every reset for stage 0)
    #[default]
    StageStart,
    /// On entering the stage's CombatGate
    CombatGate,
    /// When the last hostile of the stage is defeated
    HostilesCleared,
}

/// A batch of entities placed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnGroup {
    pub kind: EntityKind,
    pub count: usize,
    pub trigger: SpawnTrigger,
    pub constraint: SpawnConstraint,
    /// Curated positions, tried before random placement
    pub preferred: Vec<Vec2>,
    /// Display labels, cycled across the group
    pub labels: Vec<String>,
    /// Group keys, cycled across the group (carry items, zones)
    pub groups: Vec<String>,
    /// Counter override
    pub counter: Option<String>,
    pub pickup: PickupMode,
    pub radius: f32,
    pub hostile: HostileTuning,
}

impl Default for SpawnGroup {
    fn default() -> Self {
        Self {
            kind: EntityKind::Collectible,
            count: 1,
            trigger: SpawnTrigger::StageStart,
            constraint: SpawnConstraint::default(),
            preferred: Vec::new(),
            labels: Vec::new(),
            groups: Vec::new(),
            counter: None,
            pickup: PickupMode::Touch,
            radius: 0.0,
            hostile: HostileTuning::default(),
        }
    }
}

impl SpawnGroup {
    /// Counter this group's entities credit, if any
    pub fn credited_counter(&self) -> Option<String> {
        if let Some(counter) = &self.counter {
            return Some(counter.clone());
        }
        match (self.kind, self.pickup) {
            (EntityKind::Hostile, _) => Some(DEFEATED.to_string()),
            (EntityKind::Collectible, PickupMode::Carry) => Some(GROUPED.to_string()),
            (EntityKind::Collectible, _) => Some(COLLECTED.to_string()),
            _ => None,
        }
    }

    /// Metadata for the `index`-th entity placed at `pos`
    pub fn meta_for(&self, index: usize, pos: Vec2) -> EntityMeta {
        let cycle = |values: &[String]| {
            (!values.is_empty()).then(|| values[index % values.len()].clone())
        };
        EntityMeta {
            label: cycle(&self.labels),
            group: cycle(&self.groups),
            counter: self.counter.clone(),
            pickup: self.pickup,
            radius: self.radius,
            brain: (self.kind == EntityKind::Hostile).then(|| AiBrain::new(pos, &self.hostile)),
        }
    }

    pub fn health(&self) -> Option<Health> {
        (self.kind == EntityKind::Hostile).then(|| Health::full(self.hostile.health))
    }
}

/// One objective → (combat) → answer cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Question shown when the answer gate opens
    pub prompt: String,
    pub objectives: Vec<Objective>,
    /// Defeat requirement checked in CombatGate; `None` skips the gate
    pub combat: Option<Objective>,
    pub spawns: Vec<SpawnGroup>,
    pub answer: CanonicalAnswerSet,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            objectives: Vec::new(),
            combat: None,
            spawns: Vec::new(),
            answer: CanonicalAnswerSet::Literal {
                accepted: Vec::new(),
            },
        }
    }
}

impl StageConfig {
    /// Exploring objectives plus the combat requirement
    pub fn all_objectives(&self) -> Vec<Objective> {
        self.objectives.iter().cloned().chain(self.combat.clone()).collect()
    }
}

/// A complete level definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub id: String,
    pub title: String,
    /// SQL concept the level teaches
    pub concept: String,
    pub bounds: Bounds,
    pub player_start: Vec2,
    #[serde(default)]
    pub player: PlayerTuning,
    #[serde(default)]
    pub time_limit_ms: Option<u32>,
    pub stages: Vec<StageConfig>,
}

impl LevelConfig {
    /// Parse and validate a level from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: LevelConfig = serde_json::from_str(json)?;
        if let Err(err) = config.validate() {
            log::warn!("Rejected level config: {err}");
            return Err(err);
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Invalid {
            level: self.id.clone(),
            reason: reason.into(),
        }
    }

    /// Reject levels that could never be completed
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.bounds.size();
        if size.x <= 0.0 || size.y <= 0.0 {
            return Err(self.invalid("arena bounds have zero area"));
        }
        if !self.bounds.contains(self.player_start) {
            return Err(self.invalid("player start is outside the arena"));
        }
        if self.player.max_health <= 0 {
            return Err(self.invalid("player max health must be positive"));
        }
        if self.time_limit_ms == Some(0) {
            return Err(self.invalid("time limit must be positive when set"));
        }
        if self.stages.is_empty() {
            return Err(self.invalid("level has no stages"));
        }

        // Counters are attempt-wide, so supply accumulates across stages
        let mut supply: Vec<(String, usize)> = Vec::new();
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.answer.is_empty() {
                return Err(self.invalid(format!("stage {i} has no usable answer")));
            }
            for group in &stage.spawns {
                if group.kind == EntityKind::Player {
                    return Err(self.invalid(format!("stage {i} spawns a second player")));
                }
                if group.kind == EntityKind::Hostile && group.hostile.health <= 0 {
                    return Err(self.invalid(format!("stage {i} has hostiles without health")));
                }
                if let Some(counter) = group.credited_counter() {
                    match supply.iter_mut().find(|(name, _)| *name == counter) {
                        Some((_, n)) => *n += group.count,
                        None => supply.push((counter, group.count)),
                    }
                }
            }
            for objective in stage.all_objectives() {
                let available = supply
                    .iter()
                    .find(|(name, _)| *name == objective.counter)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                if (objective.target as usize) > available {
                    return Err(self.invalid(format!(
                        "stage {i} needs {} `{}` but only {available} can ever be earned",
                        objective.target, objective.counter
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every counter the level can show or credit
    pub fn counter_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for stage in &self.stages {
            for objective in stage.all_objectives() {
                names.insert(objective.counter);
            }
            for group in &stage.spawns {
                names.extend(group.credited_counter());
            }
        }
        names
    }
}

/// Ids of the built-in levels in campaign order
pub const LEVEL_IDS: [&str; 8] = [
    "select-star",
    "select-columns",
    "where-not-null",
    "order-by",
    "group-by",
    "count-guardians",
    "join-temples",
    "distinct-gems",
];

/// Look up a built-in level
pub fn builtin(id: &str) -> Result<LevelConfig, ConfigError> {
    let config = match id {
        "select-star" => select_star(),
        "select-columns" => select_columns(),
        "where-not-null" => where_not_null(),
        "order-by" => order_by(),
        "group-by" => group_by(),
        "count-guardians" => count_guardians(),
        "join-temples" => join_temples(),
        "distinct-gems" => distinct_gems(),
        _ => return Err(ConfigError::UnknownLevel(id.to_string())),
    };
    Ok(config)
}

/// All built-in levels in campaign order
pub fn catalog() -> Vec<LevelConfig> {
    LEVEL_IDS.iter().filter_map(|id| builtin(id).ok()).collect()
}

// --- Built-in level data ---

const ARENA_W: f32 = 960.0;
const ARENA_H: f32 = 540.0;

fn arena_level(id: &str, title: &str, concept: &str, stages: Vec<StageConfig>) -> LevelConfig {
    LevelConfig {
        id: id.to_string(),
        title: title.to_string(),
        concept: concept.to_string(),
        bounds: Bounds::from_size(ARENA_W, ARENA_H),
        player_start: Vec2::new(80.0, ARENA_H / 2.0),
        player: PlayerTuning::default(),
        time_limit_ms: None,
        stages,
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn spread_out() -> SpawnConstraint {
    SpawnConstraint {
        min_distance_from_player: 150.0,
        min_distance_from_siblings: 90.0,
        min_distance_from_hostiles: 70.0,
        max_attempts: SPAWN_MAX_ATTEMPTS,
    }
}

fn collectibles(count: usize, labels: &[&str]) -> SpawnGroup {
    SpawnGroup {
        kind: EntityKind::Collectible,
        count,
        constraint: spread_out(),
        labels: strings(labels),
        radius: 12.0,
        ..Default::default()
    }
}

fn fishing_spots(count: usize, labels: &[&str]) -> SpawnGroup {
    SpawnGroup {
        pickup: PickupMode::Interact,
        radius: 20.0,
        ..collectibles(count, labels)
    }
}

fn hostiles(count: usize, label: &str) -> SpawnGroup {
    SpawnGroup {
        kind: EntityKind::Hostile,
        count,
        constraint: SpawnConstraint {
            min_distance_from_player: 250.0,
            min_distance_from_siblings: 120.0,
            ..Default::default()
        },
        labels: strings(&[label]),
        radius: 16.0,
        ..Default::default()
    }
}

fn zone(pos: Vec2, group: &str) -> SpawnGroup {
    SpawnGroup {
        kind: EntityKind::InteractionZone,
        count: 1,
        preferred: vec![pos],
        labels: strings(&[group]),
        groups: strings(&[group]),
        radius: 50.0,
        ..Default::default()
    }
}

fn select_star() -> LevelConfig {
    arena_level(
        "select-star",
        "The Scroll Vault",
        "SELECT * FROM",
        vec![StageConfig {
            prompt: "You gathered every column of the scrolls table. Return all of them.".into(),
            objectives: vec![Objective::new(COLLECTED, 5)],
            spawns: vec![collectibles(5, &["id", "title", "era", "origin", "value"])],
            answer: CanonicalAnswerSet::literal(["SELECT * FROM scrolls;"]),
            ..Default::default()
        }],
    )
}

fn select_columns() -> LevelConfig {
    arena_level(
        "select-columns",
        "Column Catch",
        "SELECT column list",
        vec![StageConfig {
            prompt: "Only the name and weight of each fish matter. Select just those columns.".into(),
            objectives: vec![Objective::new(COLLECTED, 4)],
            spawns: vec![fishing_spots(4, &["name", "weight", "name", "weight"])],
            answer: CanonicalAnswerSet::literal([
                "SELECT name, weight FROM fish;",
                "SELECT name,weight FROM fish;",
            ]),
            ..Default::default()
        }],
    )
}

fn where_not_null() -> LevelConfig {
    arena_level(
        "where-not-null",
        "Artifact Hunt",
        "WHERE ... IS NOT NULL",
        vec![StageConfig {
            prompt: "Some artifacts were never found. List only those with a finder.".into(),
            objectives: vec![Objective::new(DEFEATED, 3), Objective::new(COLLECTED, 4)],
            spawns: vec![
                hostiles(3, "NULL"),
                SpawnGroup {
                    trigger: SpawnTrigger::HostilesCleared,
                    ..collectibles(4, &["found_by", "found_by", "found_by", "found_by"])
                },
            ],
            answer: CanonicalAnswerSet::literal([
                "SELECT * FROM artifacts WHERE found_by IS NOT NULL;",
            ]),
            ..Default::default()
        }],
    )
}

fn order_by() -> LevelConfig {
    LevelConfig {
        time_limit_ms: Some(90_000),
        ..arena_level(
            "order-by",
            "Tidal Ranking",
            "ORDER BY ... DESC",
            vec![StageConfig {
                prompt: "Rank the catch from heaviest to lightest.".into(),
                objectives: vec![Objective::new(COLLECTED, 5)],
                spawns: vec![fishing_spots(5, &["12kg", "3kg", "8kg", "21kg", "5kg"])],
                answer: CanonicalAnswerSet::structural(["select", "from fish", "order by weight", "desc"]),
                ..Default::default()
            }],
        )
    }
}

fn group_by() -> LevelConfig {
    arena_level(
        "group-by",
        "Jungle Expedition",
        "GROUP BY with COUNT",
        vec![StageConfig {
            prompt: "Count how many explorers share each skill.".into(),
            objectives: vec![Objective::new(GROUPED, 6)],
            spawns: vec![
                zone(Vec2::new(820.0, 90.0), "tracking"),
                zone(Vec2::new(820.0, 270.0), "climbing"),
                zone(Vec2::new(820.0, 450.0), "healing"),
                SpawnGroup {
                    pickup: PickupMode::Carry,
                    groups: strings(&["tracking", "climbing", "healing"]),
                    ..collectibles(6, &["Ana", "Bo", "Cy", "Dee", "Eli", "Fen"])
                },
            ],
            answer: CanonicalAnswerSet::structural([
                RequiredToken::from("select"),
                RequiredToken::from("skill"),
                RequiredToken::from("count("),
                RequiredToken::from("from jungle_explorers"),
                RequiredToken::from("group by skill"),
            ]),
            ..Default::default()
        }],
    )
}

fn count_guardians() -> LevelConfig {
    arena_level(
        "count-guardians",
        "Guardian Census",
        "COUNT aggregate",
        vec![StageConfig {
            prompt: "How many guardians protect the vault? Count them in one query.".into(),
            objectives: vec![Objective::new("keys", 3)],
            combat: Some(Objective::new(DEFEATED, 2)),
            spawns: vec![
                SpawnGroup {
                    counter: Some("keys".into()),
                    ..collectibles(3, &["key", "key", "key"])
                },
                SpawnGroup {
                    trigger: SpawnTrigger::CombatGate,
                    hostile: HostileTuning {
                        health: 100,
                        contact_damage: 20,
                        speed: 60.0,
                        aggro_range: 220.0,
                        ..Default::default()
                    },
                    ..hostiles(2, "guardian")
                },
            ],
            answer: CanonicalAnswerSet::structural([
                RequiredToken::from("select"),
                RequiredToken::AnyOf(strings(&["count(*)", "count(id)"])),
                RequiredToken::from("from guardians"),
            ]),
        }],
    )
}

fn join_temples() -> LevelConfig {
    arena_level(
        "join-temples",
        "Temple of Relations",
        "JOIN ... ON",
        vec![
            StageConfig {
                prompt: "First, look at the temples table on its own.".into(),
                objectives: vec![Objective::new(COLLECTED, 3)],
                spawns: vec![collectibles(3, &["temples.id", "temples.name", "temples.region"])],
                answer: CanonicalAnswerSet::literal(["SELECT * FROM temples;"]),
                ..Default::default()
            },
            StageConfig {
                prompt: "Now pair every relic with the temple that houses it.".into(),
                objectives: vec![Objective::new(COLLECTED, 6)],
                spawns: vec![
                    hostiles(2, "orphan row"),
                    collectibles(3, &["relics.id", "relics.name", "relics.temple_id"]),
                ],
                answer: CanonicalAnswerSet::Structural {
                    tokens: vec![
                        "select".into(),
                        "from temples".into(),
                        "join relics on".into(),
                        "temples.id".into(),
                        "relics.temple_id".into(),
                    ],
                    order: TokenOrder::Unordered,
                },
                ..Default::default()
            },
        ],
    )
}

fn distinct_gems() -> LevelConfig {
    LevelConfig {
        time_limit_ms: Some(120_000),
        ..arena_level(
            "distinct-gems",
            "Gem Rush",
            "SELECT DISTINCT ... LIMIT",
            vec![StageConfig {
                prompt: "Many gems share a kind. List three distinct kinds.".into(),
                objectives: vec![Objective::new(COLLECTED, 6)],
                spawns: vec![
                    hostiles(4, "duplicate"),
                    collectibles(6, &["ruby", "emerald", "ruby", "topaz", "emerald", "ruby"]),
                ],
                answer: CanonicalAnswerSet::structural(["select distinct", "kind", "from gems", "limit 3"]),
                ..Default::default()
            }],
        )
    }
}
