//! Procedural entity placement under spacing constraints
//!
//! Placement never fails: curated positions are tried first, then up to
//! `max_attempts` random points. If nothing satisfies every minimum distance
//! the last candidate tried is returned with `satisfied: false`, so dense
//! layouts degrade to slightly-too-close spawns instead of missing entities.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Entity, EntityKind};
use crate::consts::SPAWN_MAX_ATTEMPTS;

/// Axis-aligned arena rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Bounds anchored at the origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(Vec2::ZERO, Vec2::new(width, height))
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Uniform random point inside the rectangle
    pub fn random_point<R: Rng>(&self, rng: &mut R) -> Vec2 {
        let size = self.size();
        Vec2::new(
            self.min.x + rng.random::<f32>() * size.x,
            self.min.y + rng.random::<f32>() * size.y,
        )
    }
}

/// Minimum spacing rules for one placement call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConstraint {
    pub min_distance_from_player: f32,
    pub min_distance_from_siblings: f32,
    pub min_distance_from_hostiles: f32,
    pub max_attempts: u32,
}

impl Default for SpawnConstraint {
    fn default() -> Self {
        Self {
            min_distance_from_player: 0.0,
            min_distance_from_siblings: 0.0,
            min_distance_from_hostiles: 0.0,
            max_attempts: SPAWN_MAX_ATTEMPTS,
        }
    }
}

/// What the planner needs to know about something already in the arena
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupant {
    pub kind: EntityKind,
    pub pos: Vec2,
}

impl From<&Entity> for Occupant {
    fn from(e: &Entity) -> Self {
        Self {
            kind: e.kind,
            pos: e.pos,
        }
    }
}

/// Result of a placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub pos: Vec2,
    /// All minimum distances hold
    pub satisfied: bool,
    /// Random attempts consumed (preferred positions are not counted)
    pub attempts: u32,
    /// Index into the preferred list if a curated position was used
    pub preferred_index: Option<usize>,
}

/// Places entities inside `bounds`, keeping clear of the player position
#[derive(Debug, Clone, Copy)]
pub struct SpawnPlanner {
    pub bounds: Bounds,
    pub player_pos: Vec2,
}

impl SpawnPlanner {
    pub fn new(bounds: Bounds, player_pos: Vec2) -> Self {
        Self { bounds, player_pos }
    }

    /// Check a candidate against every rule in `constraint`
    pub fn satisfies(
        &self,
        constraint: &SpawnConstraint,
        kind: EntityKind,
        candidate: Vec2,
        existing: &[Occupant],
    ) -> bool {
        if !self.bounds.contains(candidate) {
            return false;
        }
        if candidate.distance(self.player_pos) < constraint.min_distance_from_player {
            return false;
        }
        existing.iter().all(|other| {
            let d = candidate.distance(other.pos);
            if other.kind == kind && d < constraint.min_distance_from_siblings {
                return false;
            }
            if other.kind == EntityKind::Hostile && d < constraint.min_distance_from_hostiles {
                return false;
            }
            true
        })
    }

    /// Place one entity of `kind`
    pub fn place<R: Rng>(
        &self,
        constraint: &SpawnConstraint,
        kind: EntityKind,
        existing: &[Occupant],
        preferred: &[Vec2],
        rng: &mut R,
    ) -> Placement {
        let mut last = None;

        for (i, &candidate) in preferred.iter().enumerate() {
            last = Some((candidate, Some(i)));
            if self.satisfies(constraint, kind, candidate, existing) {
                return Placement {
                    pos: candidate,
                    satisfied: true,
                    attempts: 0,
                    preferred_index: Some(i),
                };
            }
        }

        let mut attempts = 0;
        while attempts < constraint.max_attempts {
            let candidate = self.bounds.random_point(rng);
            attempts += 1;
            last = Some((candidate, None));
            if self.satisfies(constraint, kind, candidate, existing) {
                return Placement {
                    pos: candidate,
                    satisfied: true,
                    attempts,
                    preferred_index: None,
                };
            }
        }

        // Nothing fit: fall back to the last candidate we looked at
        let (pos, preferred_index) = last.unwrap_or((self.bounds.center(), None));
        Placement {
            pos,
            satisfied: self.satisfies(constraint, kind, pos, existing),
            attempts,
            preferred_index,
        }
    }

    /// Place `count` entities of `kind`, each new one counting as a sibling
    /// for the next. Curated positions are used at most once each.
    pub fn place_many<R: Rng>(
        &self,
        constraint: &SpawnConstraint,
        kind: EntityKind,
        count: usize,
        existing: &[Occupant],
        preferred: &[Vec2],
        rng: &mut R,
    ) -> Vec<Placement> {
        let mut occupants = existing.to_vec();
        let mut remaining: Vec<Vec2> = preferred.to_vec();
        let mut placements = Vec::with_capacity(count);

        for _ in 0..count {
            let placement = self.place(constraint, kind, &occupants, &remaining, rng);
            if let Some(i) = placement.preferred_index {
                remaining.remove(i);
            }
            occupants.push(Occupant {
                kind,
                pos: placement.pos,
            });
            placements.push(placement);
        }

        placements
    }
}
