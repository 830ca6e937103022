//! Deterministic challenge engine
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod actor;
pub mod answer;
pub mod collision;
pub mod cooldown;
pub mod spawn;
pub mod state;
pub mod tick;

pub use actor::{ActorController, AiBrain, AiMode, DamageOutcome};
pub use answer::{
    CanonicalAnswerSet, RequiredToken, TokenOrder, ValidationResult, normalize, validate,
};
pub use collision::Contact;
pub use cooldown::{ActionKind, CooldownScheduler, CooldownToken};
pub use spawn::{Bounds, Occupant, Placement, SpawnConstraint, SpawnPlanner};
pub use state::{
    CarriedItem, Entity, EntityId, EntityKind, EntityMeta, Health, LevelEvent, LevelState,
    ObjectiveCounters, Phase, PickupMode, ResetReason,
};
pub use tick::{ControlFlags, report_contact, submit_answer, tick};
