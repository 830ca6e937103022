//! Query Quest - arcade levels that teach SQL
//!
//! Core modules:
//! - `sim`: Deterministic challenge engine (actors, spawning, cooldowns, answers, phases)
//! - `levels`: Data-driven level configuration
//! - `bridge`: The only surface a host (browser/native) talks to
//! - `platform`: Browser/native input and bindings
//! - `autopilot`: Scripted player for headless runs

pub mod autopilot;
pub mod bridge;
pub mod levels;
pub mod platform;
pub mod sim;

pub use bridge::{ControlFlags, EngineBridge, Snapshot};
pub use levels::{ConfigError, LevelConfig};

/// Game configuration constants
pub mod consts {
    /// Simulation tick rate (one tick per animation frame)
    pub const TICK_RATE_HZ: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICK_RATE_HZ as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Player defaults
    pub const PLAYER_SPEED: f32 = 160.0;
    pub const PLAYER_MAX_HEALTH: i32 = 100;
    pub const PLAYER_ATTACK_DAMAGE: i32 = 25;
    pub const PLAYER_ATTACK_RADIUS: f32 = 48.0;
    pub const PLAYER_ATTACK_COOLDOWN_MS: u32 = 400;
    pub const PLAYER_INTERACT_RADIUS: f32 = 40.0;
    pub const PLAYER_INTERACT_COOLDOWN_MS: u32 = 500;

    /// Hostile defaults
    pub const HOSTILE_HEALTH: i32 = 50;
    pub const HOSTILE_CONTACT_DAMAGE: i32 = 15;
    pub const HOSTILE_HIT_COOLDOWN_MS: u32 = 1000;
    pub const HOSTILE_SPEED: f32 = 70.0;
    pub const HOSTILE_AGGRO_RANGE: f32 = 150.0;
    pub const HOSTILE_PATROL_DISTANCE: f32 = 60.0;

    /// Spawn defaults
    pub const SPAWN_MAX_ATTEMPTS: u32 = 50;
}

/// Convert a millisecond duration to whole simulation ticks (rounded up)
#[inline]
pub fn ms_to_ticks(ms: u32) -> u64 {
    (ms as u64 * consts::TICK_RATE_HZ as u64).div_ceil(1000)
}

/// Convert simulation ticks back to milliseconds
#[inline]
pub fn ticks_to_ms(ticks: u64) -> u64 {
    ticks * 1000 / consts::TICK_RATE_HZ as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_ticks_rounds_up() {
        assert_eq!(ms_to_ticks(0), 0);
        assert_eq!(ms_to_ticks(1000), 60);
        assert_eq!(ms_to_ticks(100), 6);
        assert_eq!(ms_to_ticks(1), 1);
        assert_eq!(ticks_to_ms(60), 1000);
    }
}
