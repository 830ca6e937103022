//! Scripted player for headless runs
//!
//! Walks toward the nearest useful target, attacks or interacts when close,
//! reports overlaps the way a host collision resolver would, and types the
//! reference answer at each gate. Used by the native binary and by tests that
//! play every built-in level to completion.

use glam::Vec2;

use crate::bridge::{ControlFlags, EngineBridge, EntityView, Snapshot};
use crate::consts::TICK_RATE_HZ;
use crate::levels::ConfigError;
use crate::sim::{CanonicalAnswerSet, EntityKind, LevelEvent, Phase};

/// Distance at which the demo host reports two entities as touching
const TOUCH_RADIUS: f32 = 18.0;
/// Give up on a level after this much simulated time
const MAX_SECONDS: u64 = 600;
/// Close enough to act on the target. Inside `TOUCH_RADIUS` so walking up to
/// a touch or carry item also produces the contact that picks it up.
const ACTION_RANGE: f32 = 12.0;
/// Seed the native runner uses when none is given
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Outcome of one headless run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub completed: bool,
    pub ticks: u64,
    pub resets: u32,
}

fn pos(e: &EntityView) -> Vec2 {
    Vec2::new(e.x, e.y)
}

/// Pick the next thing to walk to and what to press when there
fn choose_target(snap: &Snapshot) -> Option<(Vec2, ControlFlags)> {
    let player = snap.entities.iter().find(|e| e.kind == EntityKind::Player)?;
    let here = pos(player);
    let nearest = |kind: EntityKind, group: Option<&str>| {
        snap.entities
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| group.is_none() || e.group.as_deref() == group)
            .min_by(|a, b| pos(a).distance(here).total_cmp(&pos(b).distance(here)))
    };

    if let Some(item) = &snap.carrying {
        let zone = nearest(EntityKind::InteractionZone, item.group.as_deref())
            .or_else(|| nearest(EntityKind::InteractionZone, None))?;
        let press = ControlFlags {
            secondary: true,
            ..Default::default()
        };
        return Some((pos(zone), press));
    }
    if let Some(hostile) = nearest(EntityKind::Hostile, None) {
        let press = ControlFlags {
            primary: true,
            ..Default::default()
        };
        return Some((pos(hostile), press));
    }
    // Interact-only spots need the button; pressing it near touch items is harmless
    let item = nearest(EntityKind::Collectible, None)?;
    let press = ControlFlags {
        secondary: true,
        ..Default::default()
    };
    Some((pos(item), press))
}

fn steer(snap: &Snapshot) -> ControlFlags {
    let Some(player) = snap.entities.iter().find(|e| e.kind == EntityKind::Player) else {
        return ControlFlags::default();
    };
    let Some((target, press)) = choose_target(snap) else {
        return ControlFlags::default();
    };
    let delta = target - pos(player);
    if delta.length() <= ACTION_RANGE {
        return press;
    }
    ControlFlags {
        left: delta.x < -4.0,
        right: delta.x > 4.0,
        up: delta.y < -4.0,
        down: delta.y > 4.0,
        ..Default::default()
    }
}

/// Report every non-player entity overlapping the player
fn report_overlaps(bridge: &mut EngineBridge, snap: &Snapshot) {
    let Some(player) = snap.entities.iter().find(|e| e.kind == EntityKind::Player) else {
        return;
    };
    for other in snap.entities.iter().filter(|e| e.id != player.id) {
        if pos(other).distance(pos(player)) <= TOUCH_RADIUS {
            bridge.report_collision(player.id, other.id);
        }
    }
}

/// The first accepted form, typed out the way a careful player would
fn reference_answer(answer: &CanonicalAnswerSet) -> String {
    match answer {
        CanonicalAnswerSet::Literal { accepted } => accepted.first().cloned().unwrap_or_default(),
        CanonicalAnswerSet::Structural { tokens, .. } => tokens
            .iter()
            .filter_map(|t| t.alternatives().first().cloned())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Play one built-in level until it completes, an answer is rejected, or time runs out
pub fn run_level(level_id: &str, seed: u64) -> Result<RunReport, ConfigError> {
    let mut bridge = EngineBridge::from_level_id(level_id, seed)?;
    let max_ticks = MAX_SECONDS * TICK_RATE_HZ as u64;
    let mut steps = 0;

    while !bridge.is_complete() && steps < max_ticks {
        let snap = bridge.snapshot();
        if snap.phase == Phase::AwaitingAnswer {
            let answer = bridge
                .state()
                .stage()
                .map(|s| reference_answer(&s.answer))
                .unwrap_or_default();
            let result = bridge.submit_answer(&answer);
            log::info!("Stage {} answer {:?}: matched={}", snap.stage, answer, result.matched);
            if !result.matched {
                break;
            }
            continue;
        }

        report_overlaps(&mut bridge, &snap);
        bridge.set_controls(steer(&snap));
        bridge.tick();
        steps += 1;

        for event in bridge.drain_events() {
            match event {
                LevelEvent::Reset { reason } => log::warn!("Attempt reset: {:?}", reason),
                LevelEvent::PlayerHit { remaining, .. } => log::debug!("Player hit, {} hp left", remaining),
                _ => {}
            }
        }
    }

    let snap = bridge.snapshot();
    Ok(RunReport {
        completed: bridge.is_complete(),
        ticks: snap.tick,
        resets: snap.resets,
    })
}
