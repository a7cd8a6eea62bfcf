//! Stateless steering primitives.
//!
//! Agents compose these with their own desire vector before calling the
//! movement system. Nothing here keeps state between calls.

use crate::agent::AgentId;
use crate::context::AgentSnapshot;
use crate::math::{flat, rotate_y, safe_normalize, Vec3, EPSILON};
use crate::spatial::ColliderSet;

/// Fan of alternatives tried when the desired direction is blocked, in
/// degrees, nearest first.
const AVOIDANCE_FAN_DEG: [f32; 4] = [40.0, -40.0, 80.0, -80.0];

/// Closest distance used when weighting separation pushes.
const MIN_SEPARATION_DISTANCE: f32 = 0.1;

/// Probe along `desired_dir` and bend around obstacles.
///
/// Returns the desired direction (flattened and normalised) when clear,
/// otherwise the first clear alternative from a fan of rotations, otherwise
/// the least obstructed candidate. A zero desire yields zero.
#[must_use]
pub fn avoid_obstacles(
    colliders: &ColliderSet,
    origin: Vec3,
    desired_dir: Vec3,
    probe_distance: f32,
) -> Vec3 {
    let Some(dir) = safe_normalize(flat(desired_dir)) else {
        return Vec3::ZERO;
    };

    let Some(hit) = colliders.raycast(origin, dir, probe_distance) else {
        return dir;
    };

    let mut best_dir = dir;
    let mut best_clearance = hit.distance;
    for degrees in AVOIDANCE_FAN_DEG {
        let candidate = rotate_y(dir, degrees.to_radians());
        match colliders.raycast(origin, candidate, probe_distance) {
            None => return candidate,
            Some(h) if h.distance > best_clearance => {
                best_clearance = h.distance;
                best_dir = candidate;
            }
            Some(_) => {}
        }
    }
    best_dir
}

/// Inverse-distance weighted push away from every other agent within `radius`.
///
/// Coincident agents are pushed apart along X, ordered by id so the two
/// members of a pair move in opposite directions.
#[must_use]
pub fn separation(
    position: Vec3,
    radius: f32,
    self_id: AgentId,
    agents: &[AgentSnapshot],
) -> Vec3 {
    let mut push = Vec3::ZERO;
    for other in agents {
        if other.id == self_id {
            continue;
        }
        let offset = flat(position - other.position);
        let distance = offset.length();
        if distance >= radius {
            continue;
        }
        let away = if distance <= EPSILON {
            if self_id < other.id {
                Vec3::NEG_X
            } else {
                Vec3::X
            }
        } else {
            offset / distance
        };
        push += away / distance.max(MIN_SEPARATION_DISTANCE);
    }
    push
}

/// Whether `to` is visible from `from`: every height-offset ray must be clear.
#[must_use]
pub fn line_of_sight(colliders: &ColliderSet, from: Vec3, to: Vec3, height_offsets: &[f32]) -> bool {
    if height_offsets.is_empty() {
        return !colliders.segment_blocked(from, to);
    }
    height_offsets.iter().all(|&dy| {
        let lift = Vec3::Y * dy;
        !colliders.segment_blocked(from + lift, to + lift)
    })
}

/// Blend a desire direction with a separation push into one unit heading.
///
/// Falls back to the desire alone when the blend cancels out.
#[must_use]
pub fn blend(desire: Vec3, separation_push: Vec3, separation_weight: f32) -> Vec3 {
    let desire = flat(desire);
    safe_normalize(desire + flat(separation_push) * separation_weight)
        .or_else(|| safe_normalize(desire))
        .unwrap_or(Vec3::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::spatial::Aabb;

    fn snapshot(id: u64, position: Vec3) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId(id),
            kind: AgentKind::Melee,
            position,
            velocity: Vec3::ZERO,
            current_health: 10.0,
            max_health: 10.0,
            footprint: 0.3,
            owner: None,
        }
    }

    #[test]
    fn test_clear_path_unchanged() {
        let set = ColliderSet::new(0.0);
        let dir = avoid_obstacles(&set, Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 3.0), 2.0);
        assert!((dir - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_blocked_path_bends() {
        let set = ColliderSet::with_boxes(vec![Aabb::block(-0.5, 0.5, 1.0, 2.0, 0.0, 3.0)]);
        let dir = avoid_obstacles(&set, Vec3::new(0.0, 1.0, 0.0), Vec3::Z, 2.5);
        assert!(dir.x.abs() > 0.5, "expected a sideways bend, got {dir:?}");
        assert!(set.raycast(Vec3::new(0.0, 1.0, 0.0), dir, 2.5).is_none());
    }

    #[test]
    fn test_zero_desire_is_zero() {
        let set = ColliderSet::new(0.0);
        assert_eq!(avoid_obstacles(&set, Vec3::ZERO, Vec3::Y, 2.0), Vec3::ZERO);
    }

    #[test]
    fn test_separation_excludes_self_and_far_agents() {
        let agents = vec![
            snapshot(1, Vec3::ZERO),
            snapshot(2, Vec3::new(1.0, 0.0, 0.0)),
            snapshot(3, Vec3::new(10.0, 0.0, 0.0)),
        ];
        let push = separation(Vec3::ZERO, 2.0, AgentId(1), &agents);
        assert!(push.x < 0.0);
        assert!(push.z.abs() < 1e-6);
    }

    #[test]
    fn test_separation_closer_pushes_harder() {
        let near = separation(Vec3::ZERO, 3.0, AgentId(1), &[snapshot(2, Vec3::new(0.5, 0.0, 0.0))]);
        let far = separation(Vec3::ZERO, 3.0, AgentId(1), &[snapshot(2, Vec3::new(2.0, 0.0, 0.0))]);
        assert!(near.length() > far.length());
    }

    #[test]
    fn test_coincident_agents_split() {
        let agents = vec![snapshot(1, Vec3::ZERO), snapshot(2, Vec3::ZERO)];
        let a = separation(Vec3::ZERO, 1.0, AgentId(1), &agents);
        let b = separation(Vec3::ZERO, 1.0, AgentId(2), &agents);
        assert!(a.x * b.x < 0.0);
    }

    #[test]
    fn test_partial_cover_blocks_sight() {
        // Low wall covers only the lower sample
        let set = ColliderSet::with_boxes(vec![Aabb::block(4.0, 5.0, -2.0, 2.0, 0.0, 1.2)]);
        let from = Vec3::new(0.0, 1.0, 0.0);
        let to = Vec3::new(10.0, 1.0, 0.0);
        assert!(!line_of_sight(&set, from, to, &[0.0, 0.45]));
        assert!(line_of_sight(&set, from, to, &[0.45]));
    }

    #[test]
    fn test_blend_cancelling_falls_back_to_desire() {
        let out = blend(Vec3::X, Vec3::NEG_X, 1.0);
        assert!((out - Vec3::X).length() < 1e-5);
    }
}
