//! Vector helpers shared by movement, steering and the behaviours.
//!
//! The arena is Y-up: agents walk on the XZ plane and `yaw` is measured
//! around +Y with `yaw = 0` facing +Z. All helpers guard zero-length
//! vectors instead of dividing by zero.

use std::f32::consts::{PI, TAU};

pub use glam::{Vec2, Vec3};

/// Lengths below this are treated as zero.
pub const EPSILON: f32 = 1e-5;

/// Drop the vertical component.
#[must_use]
pub fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Normalize, or `None` when the vector is (near) zero length.
#[must_use]
pub fn safe_normalize(v: Vec3) -> Option<Vec3> {
    let len_sq = v.length_squared();
    if len_sq <= EPSILON * EPSILON {
        return None;
    }
    Some(v / len_sq.sqrt())
}

/// Horizontal unit direction from `from` to `to`, or `None` if they coincide.
#[must_use]
pub fn flat_direction(from: Vec3, to: Vec3) -> Option<Vec3> {
    safe_normalize(flat(to - from))
}

/// Horizontal distance between two points.
#[must_use]
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    flat(b - a).length()
}

/// Unit forward vector for a yaw angle.
#[must_use]
pub fn forward_from_yaw(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Yaw that faces along `dir`; `fallback` when `dir` has no horizontal part.
#[must_use]
pub fn yaw_of(dir: Vec3, fallback: f32) -> f32 {
    if flat(dir).length_squared() <= EPSILON * EPSILON {
        return fallback;
    }
    dir.x.atan2(dir.z)
}

/// Rotate a vector around +Y.
#[must_use]
pub fn rotate_y(v: Vec3, angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
}

/// Wrap an angle into `[-PI, PI)`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Turn `current` toward `target` by at most `max_step` radians.
#[must_use]
pub fn turn_towards(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = wrap_angle(target - current);
    if diff.abs() <= max_step {
        target
    } else {
        wrap_angle(current + max_step.copysign(diff))
    }
}

/// Move a scalar toward a target by at most `max_delta`.
#[must_use]
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(target - current)
    }
}

/// Unsigned horizontal angle between two directions, in radians.
#[must_use]
pub fn flat_angle_between(a: Vec3, b: Vec3) -> f32 {
    match (safe_normalize(flat(a)), safe_normalize(flat(b))) {
        (Some(a), Some(b)) => a.dot(b).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}

/// Perpendicular of a horizontal direction (90° to the left when looking down -Y).
#[must_use]
pub fn flat_perpendicular(dir: Vec3) -> Vec3 {
    Vec3::new(dir.z, 0.0, -dir.x)
}

/// Closest distance from `point` to the segment `a..b`.
#[must_use]
pub fn segment_distance(a: Vec3, b: Vec3, point: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= EPSILON * EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// Aim point for a constant-speed projectile to meet a target moving at
/// `target_velocity`. Falls back to the current target position when no
/// positive-time solution exists.
#[must_use]
pub fn predict_intercept(
    shooter: Vec3,
    target: Vec3,
    target_velocity: Vec3,
    projectile_speed: f32,
) -> Vec3 {
    if projectile_speed <= EPSILON {
        return target;
    }
    let to_target = target - shooter;
    let a = target_velocity.length_squared() - projectile_speed * projectile_speed;
    let b = 2.0 * to_target.dot(target_velocity);
    let c = to_target.length_squared();

    let t = if a.abs() <= EPSILON {
        if b.abs() <= EPSILON {
            return target;
        }
        -c / b
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return target;
        }
        let sqrt_disc = disc.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);
        match (t1 > 0.0, t2 > 0.0) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return target,
        }
    };

    if t <= 0.0 || !t.is_finite() {
        return target;
    }
    target + target_velocity * t
}

/// Launch velocity that carries a projectile from `from` to `to` in `flight_time`
/// seconds under downward `gravity`.
#[must_use]
pub fn ballistic_velocity(from: Vec3, to: Vec3, flight_time: f32, gravity: f32) -> Vec3 {
    let t = flight_time.max(0.05);
    let delta = to - from;
    Vec3::new(
        delta.x / t,
        delta.y / t + 0.5 * gravity * t,
        delta.z / t,
    )
}
