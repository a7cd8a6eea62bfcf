//! Spawn options and placement.
//!
//! Placement samples candidate points on a ring around the player, prefers
//! points behind the player's view with a clear footprint, then any clear
//! point, and finally degrades to an unconstrained ring point.

use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, LineageTag};
use crate::config::SpawnConfig;
use crate::context::PlayerState;
use crate::math::{flat, flat_direction, safe_normalize, Vec3};
use crate::movement::BodyShape;
use crate::rng::SimRng;
use crate::spatial::{Aabb, ColliderSet};

/// Population bucket an agent is counted in. Caps apply per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpawnRole {
    /// Trickle-wave combatant.
    Wave,
    /// Boss encounter.
    Boss,
    /// Add spawned for a boss.
    BossAdd,
    /// Carrier minion.
    Minion,
    /// Hazard or destructible.
    Hazard,
    /// Descendant of a splitting boss.
    Lineage,
    /// Spawned or registered by the host.
    #[default]
    External,
}

impl SpawnRole {
    /// Whether agents in this bucket count toward the wave by default.
    #[must_use]
    pub const fn counts_toward_wave(self) -> bool {
        matches!(self, Self::Wave | Self::Boss | Self::External)
    }
}

/// Options accepted by every spawn path.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnOptions {
    /// Population bucket.
    pub role: SpawnRole,
    /// Owning agent.
    pub owner: Option<AgentId>,
    /// Max-health multiplier; `None` applies the current wave's scaling.
    pub health_scale: Option<f32>,
    /// Outgoing damage multiplier; `None` applies the current wave's scaling.
    pub damage_multiplier: Option<f32>,
    /// Uniform body scale.
    pub scale: f32,
    /// Initial yaw; `None` faces the player.
    pub yaw: Option<f32>,
    /// Lineage membership.
    pub lineage: Option<LineageTag>,
    /// Home slot index (carrier minions).
    pub slot: Option<u8>,
    /// Lifetime override in seconds (hazards).
    pub lifetime: Option<f32>,
    /// Override for [`SpawnRole::counts_toward_wave`].
    pub counts_toward_wave: Option<bool>,
    /// Palette handed to the asset factory.
    pub palette: Option<u32>,
}

impl SpawnOptions {
    /// Defaults with a role.
    #[must_use]
    pub fn role(role: SpawnRole) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }

    /// Set the owner.
    #[must_use]
    pub fn owned_by(mut self, owner: AgentId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Whether the spawned agent counts toward the wave.
    #[must_use]
    pub fn counts(&self) -> bool {
        self.counts_toward_wave
            .unwrap_or_else(|| self.role.counts_toward_wave())
    }
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            role: SpawnRole::External,
            owner: None,
            health_scale: None,
            damage_multiplier: None,
            scale: 1.0,
            yaw: None,
            lineage: None,
            slot: None,
            lifetime: None,
            counts_toward_wave: None,
            palette: None,
        }
    }
}

/// Result of a placement search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Body centre.
    pub position: Vec3,
    /// Candidate was behind the player's view.
    pub behind: bool,
    /// No clear candidate existed; the point is unconstrained.
    pub fallback: bool,
}

/// Point on a horizontal ring.
#[must_use]
pub fn ring_point(center: Vec3, radius: f32, angle: f32) -> Vec3 {
    Vec3::new(
        center.x + angle.sin() * radius,
        center.y,
        center.z + angle.cos() * radius,
    )
}

fn footprint_clear(colliders: &ColliderSet, position: Vec3, shape: &BodyShape, clearance: f32) -> bool {
    let half = shape.footprint + clearance;
    let feet = shape.feet(position);
    let probe = Aabb::new(
        Vec3::new(position.x - half, feet + 0.05, position.z - half),
        Vec3::new(position.x + half, feet + shape.height(), position.z + half),
    );
    !colliders.overlaps(&probe)
}

/// Choose a spawn point for a body of `shape` around the player.
pub fn place_spawn(
    colliders: &ColliderSet,
    config: &SpawnConfig,
    player: &PlayerState,
    shape: &BodyShape,
    rng: &mut SimRng,
) -> Placement {
    let forward = safe_normalize(flat(player.forward)).unwrap_or(Vec3::Z);
    let limit = config.arena_half_size - shape.footprint;
    let probe_top = player.feet().max(colliders.floor()) + shape.height();
    let mut first_clear: Option<Vec3> = None;

    for _ in 0..config.candidates {
        let angle = rng.angle();
        let radius = rng.range(config.ring_min, config.ring_max);
        let mut point = ring_point(player.position, radius, angle);
        point.x = point.x.clamp(-limit, limit);
        point.z = point.z.clamp(-limit, limit);
        let ground = colliders.ground_height(point.x, point.z, probe_top, shape.footprint);
        point.y = ground + shape.half_height;

        if !footprint_clear(colliders, point, shape, config.clearance) {
            continue;
        }
        let behind = flat_direction(player.position, point)
            .map_or(false, |dir| dir.dot(forward) <= config.behind_dot);
        if behind {
            return Placement {
                position: point,
                behind: true,
                fallback: false,
            };
        }
        first_clear.get_or_insert(point);
    }

    if let Some(position) = first_clear {
        return Placement {
            position,
            behind: false,
            fallback: false,
        };
    }

    let angle = rng.angle();
    let mut point = ring_point(player.position, config.ring_min, angle);
    point.x = point.x.clamp(-limit, limit);
    point.z = point.z.clamp(-limit, limit);
    point.y = colliders.floor() + shape.half_height;
    tracing::warn!(x = point.x, z = point.z, "No clear spawn candidate, placing unconstrained");
    Placement {
        position: point,
        behind: false,
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;

    #[test]
    fn test_open_arena_prefers_behind_player() {
        let colliders = ColliderSet::new(0.0);
        let player = PlayerState::new(Vec3::new(0.0, 0.9, 0.0), Vec3::Z);
        let mut rng = SimRng::new(4);
        let shape = AgentKind::Melee.body_shape();
        for _ in 0..20 {
            let p = place_spawn(&colliders, &SpawnConfig::default(), &player, &shape, &mut rng);
            assert!(!p.fallback);
            assert!(p.behind);
            assert!(p.position.z < 0.0);
            assert!((p.position.y - shape.half_height).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ring_distance_respected() {
        let colliders = ColliderSet::new(0.0);
        let player = PlayerState::default();
        let config = SpawnConfig::default();
        let mut rng = SimRng::new(5);
        let shape = AgentKind::Melee.body_shape();
        let p = place_spawn(&colliders, &config, &player, &shape, &mut rng);
        let d = flat(p.position - player.position).length();
        assert!(d >= config.ring_min - 1e-3 && d <= config.ring_max + 1e-3);
    }

    #[test]
    fn test_fully_blocked_arena_falls_back() {
        let colliders = ColliderSet::with_boxes(vec![Aabb::block(-60.0, 60.0, -60.0, 60.0, 0.0, 10.0)]);
        let player = PlayerState::default();
        let mut rng = SimRng::new(6);
        let shape = AgentKind::Melee.body_shape();
        let p = place_spawn(&colliders, &SpawnConfig::default(), &player, &shape, &mut rng);
        assert!(p.fallback);
    }

    #[test]
    fn test_default_counting_by_role() {
        assert!(SpawnOptions::role(SpawnRole::Wave).counts());
        assert!(!SpawnOptions::role(SpawnRole::Minion).counts());
        let mut opts = SpawnOptions::role(SpawnRole::Hazard);
        opts.counts_toward_wave = Some(true);
        assert!(opts.counts());
    }
}
