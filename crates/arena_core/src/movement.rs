//! Movement and collision: turns a desired displacement into an actual one.
//!
//! Horizontal motion is resolved one axis at a time so agents slide along
//! walls. Vertical position then follows the ground under the footprint
//! according to the body's [`StepProfile`]:
//!
//! | rise (fraction of body height) | result                               |
//! |--------------------------------|--------------------------------------|
//! | `<= 0`                         | snap down to the ground this frame   |
//! | `<= step_fraction`             | step up instantly                    |
//! | `<= assist_fraction`           | lift, clamped to `max_lift_fraction` |
//! | `> assist_fraction`            | no vertical follow                   |

use serde::{Deserialize, Serialize};

use crate::math::{Vec3, EPSILON};
use crate::spatial::{Aabb, ColliderSet};

/// Body weight class selecting a step profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StepClass {
    /// Small, nimble bodies.
    Light,
    /// Ordinary infantry.
    #[default]
    Standard,
    /// Tanks, carriers and bosses.
    Heavy,
}

/// Step-climb tolerances as fractions of body height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepProfile {
    /// Rises up to this are absorbed instantly.
    pub step_fraction: f32,
    /// Rises up to this are climbed with a per-move lift clamp.
    pub assist_fraction: f32,
    /// Largest vertical lift applied in one move.
    pub max_lift_fraction: f32,
}

/// Collision shape of an agent body. `position` is the body centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyShape {
    /// Half of the body height.
    pub half_height: f32,
    /// Half-extent of the square footprint.
    pub footprint: f32,
    /// Step class.
    pub class: StepClass,
}

impl BodyShape {
    /// Create a shape.
    #[must_use]
    pub const fn new(half_height: f32, footprint: f32, class: StepClass) -> Self {
        Self {
            half_height,
            footprint,
            class,
        }
    }

    /// Full body height.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.half_height * 2.0
    }

    /// Feet height for a body centred at `position`.
    #[must_use]
    pub fn feet(&self, position: Vec3) -> f32 {
        position.y - self.half_height
    }
}

/// How the vertical follow resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Climb {
    /// Ground level unchanged.
    Level,
    /// Dropped onto lower ground.
    Descended,
    /// Small rise absorbed instantly.
    Stepped,
    /// Larger rise climbed; `clamped` when the lift limit cut it short.
    Assisted {
        /// Whether part of the rise remains for later moves.
        clamped: bool,
    },
    /// Rise too tall to follow.
    Blocked,
}

/// Outcome of one [`move_with_collisions`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    /// The X component was accepted.
    pub moved_x: bool,
    /// The Z component was accepted.
    pub moved_z: bool,
    /// Ground rise relative to the feet before the vertical follow.
    pub rise: f32,
    /// Vertical resolution.
    pub climb: Climb,
}

impl MoveOutcome {
    /// Whether any requested horizontal axis was rejected.
    #[must_use]
    pub fn obstructed(&self, delta: Vec3) -> bool {
        (delta.x.abs() > EPSILON && !self.moved_x) || (delta.z.abs() > EPSILON && !self.moved_z)
    }
}

fn probe_box(center_x: f32, center_z: f32, shape: &BodyShape, bottom: f32, top: f32) -> Aabb {
    Aabb::new(
        Vec3::new(center_x - shape.footprint, bottom, center_z - shape.footprint),
        Vec3::new(center_x + shape.footprint, top, center_z + shape.footprint),
    )
}

/// Move a grounded body by as much of `delta` as the colliders permit.
///
/// Only the horizontal part of `delta` is used; the vertical position is
/// derived from the ground.
pub fn move_with_collisions(
    position: &mut Vec3,
    shape: &BodyShape,
    profile: &StepProfile,
    delta: Vec3,
    colliders: &ColliderSet,
    probe_epsilon: f32,
) -> MoveOutcome {
    let height = shape.height();
    let feet = shape.feet(*position);
    let probe_bottom = feet + profile.assist_fraction * height + probe_epsilon;
    let probe_top = feet + height;

    let mut moved_x = false;
    let mut moved_z = false;

    if delta.x.abs() > EPSILON {
        let probe = probe_box(position.x + delta.x, position.z, shape, probe_bottom, probe_top);
        if !colliders.overlaps(&probe) {
            position.x += delta.x;
            moved_x = true;
        }
    }
    if delta.z.abs() > EPSILON {
        let probe = probe_box(position.x, position.z + delta.z, shape, probe_bottom, probe_top);
        if !colliders.overlaps(&probe) {
            position.z += delta.z;
            moved_z = true;
        }
    }

    let ground = colliders.ground_height(position.x, position.z, probe_top, shape.footprint);
    let rise = ground - feet;

    let climb = if rise < -EPSILON {
        position.y = ground + shape.half_height;
        Climb::Descended
    } else if rise <= EPSILON {
        position.y = ground + shape.half_height;
        Climb::Level
    } else if rise <= profile.step_fraction * height + probe_epsilon {
        position.y = ground + shape.half_height;
        Climb::Stepped
    } else if rise <= profile.assist_fraction * height + probe_epsilon {
        let max_lift = profile.max_lift_fraction * height;
        let clamped = rise > max_lift + EPSILON;
        position.y += rise.min(max_lift);
        Climb::Assisted { clamped }
    } else {
        Climb::Blocked
    };

    MoveOutcome {
        moved_x,
        moved_z,
        rise,
        climb,
    }
}

/// Move an airborne body: full-height slide resolution and a minimum
/// altitude above whatever ground lies below.
pub fn move_flying(
    position: &mut Vec3,
    radius: f32,
    delta: Vec3,
    colliders: &ColliderSet,
    min_altitude: f32,
) -> MoveOutcome {
    let half = Vec3::splat(radius);
    let mut moved_x = false;
    let mut moved_z = false;

    for axis in [0usize, 2] {
        let step = delta[axis];
        if step.abs() <= EPSILON {
            continue;
        }
        let mut candidate = *position;
        candidate[axis] += step;
        if !colliders.overlaps(&Aabb::from_center(candidate, half)) {
            *position = candidate;
            if axis == 0 {
                moved_x = true;
            } else {
                moved_z = true;
            }
        }
    }

    let mut candidate = *position;
    candidate.y += delta.y;
    if !colliders.overlaps(&Aabb::from_center(candidate, half)) {
        position.y = candidate.y;
    }

    let ground = colliders.ground_height(position.x, position.z, position.y, radius);
    let floor = ground + min_altitude;
    let rise = floor - position.y;
    let climb = if rise > 0.0 {
        position.y = floor;
        Climb::Stepped
    } else {
        Climb::Level
    };

    MoveOutcome {
        moved_x,
        moved_z,
        rise,
        climb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MovementConfig;

    const STANDARD: BodyShape = BodyShape::new(0.8, 0.3, StepClass::Standard);
    const HEAVY: BodyShape = BodyShape::new(0.8, 0.3, StepClass::Heavy);

    fn ledge(height: f32) -> ColliderSet {
        ColliderSet::with_boxes(vec![Aabb::block(1.0, 2.0, -2.0, 2.0, 0.0, height)])
    }

    fn step(shape: &BodyShape, colliders: &ColliderSet, pos: &mut Vec3, delta: Vec3) -> MoveOutcome {
        let config = MovementConfig::default();
        move_with_collisions(
            pos,
            shape,
            config.profile(shape.class),
            delta,
            colliders,
            config.probe_epsilon,
        )
    }

    #[test]
    fn test_flat_move() {
        let mut pos = Vec3::new(0.0, 0.8, 0.0);
        let out = step(&STANDARD, &ColliderSet::new(0.0), &mut pos, Vec3::new(1.0, 0.0, 0.5));
        assert_eq!(pos, Vec3::new(1.0, 0.8, 0.5));
        assert_eq!(out.climb, Climb::Level);
    }

    #[test]
    fn test_standard_climbs_assist_ledge() {
        let colliders = ledge(0.64);
        let mut pos = Vec3::new(0.0, 0.8, 0.0);
        let out = step(&STANDARD, &colliders, &mut pos, Vec3::new(1.0, 0.0, 0.0));
        assert!(out.moved_x);
        assert!((pos.x - 1.0).abs() < 1e-5);
        assert!((pos.y - 1.44).abs() < 1e-4, "y = {}", pos.y);
    }

    #[test]
    fn test_heavy_blocked_by_same_ledge() {
        let colliders = ledge(0.64);
        let mut pos = Vec3::new(0.0, 0.8, 0.0);
        let out = step(&HEAVY, &colliders, &mut pos, Vec3::new(1.0, 0.0, 0.0));
        assert!(!out.moved_x);
        assert_eq!(pos, Vec3::new(0.0, 0.8, 0.0));
    }

    #[test]
    fn test_small_step_is_instant() {
        let colliders = ledge(0.15);
        let mut pos = Vec3::new(0.0, 0.8, 0.0);
        let out = step(&HEAVY, &colliders, &mut pos, Vec3::new(1.2, 0.0, 0.0));
        assert_eq!(out.climb, Climb::Stepped);
        assert!((pos.y - 0.95).abs() < 1e-5);
    }

    #[test]
    fn test_heavy_climb_is_progressive() {
        // 0.4 of a 1.6 body: above heavy step (0.192), inside heavy assist (0.48),
        // above heavy lift (0.24 per move)
        let colliders = ledge(0.4);
        let mut pos = Vec3::new(0.0, 0.8, 0.0);
        let first = step(&HEAVY, &colliders, &mut pos, Vec3::new(1.2, 0.0, 0.0));
        assert_eq!(first.climb, Climb::Assisted { clamped: true });
        assert!((pos.y - (0.8 + 0.24)).abs() < 1e-4);

        let second = step(&HEAVY, &colliders, &mut pos, Vec3::ZERO);
        assert_eq!(second.climb, Climb::Stepped);
        assert!((pos.y - 1.2).abs() < 1e-4);
    }

    #[test]
    fn test_descent_snaps_same_frame() {
        let colliders = ledge(0.6);
        let mut pos = Vec3::new(1.5, 1.4, 0.0);
        let out = step(&STANDARD, &colliders, &mut pos, Vec3::new(1.5, 0.0, 0.0));
        assert_eq!(out.climb, Climb::Descended);
        assert!((pos.y - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_wall_slides_on_free_axis() {
        let wall = ColliderSet::with_boxes(vec![Aabb::block(1.0, 2.0, -5.0, 5.0, 0.0, 3.0)]);
        let mut pos = Vec3::new(0.5, 0.8, 0.0);
        let delta = Vec3::new(0.5, 0.0, 0.5);
        let out = step(&STANDARD, &wall, &mut pos, delta);
        assert!(!out.moved_x);
        assert!(out.moved_z);
        assert!(out.obstructed(delta));
        assert!((pos.z - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_flying_keeps_min_altitude() {
        let mut pos = Vec3::new(0.0, 3.0, 0.0);
        move_flying(&mut pos, 0.4, Vec3::new(0.0, -5.0, 0.0), &ColliderSet::new(0.0), 1.5);
        assert!((pos.y - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_flying_blocked_by_tall_box() {
        let wall = ColliderSet::with_boxes(vec![Aabb::block(1.0, 2.0, -5.0, 5.0, 0.0, 10.0)]);
        let mut pos = Vec3::new(0.0, 3.0, 0.0);
        let out = move_flying(&mut pos, 0.4, Vec3::new(1.0, 0.0, 0.0), &wall, 1.0);
        assert!(!out.moved_x);
    }
}
