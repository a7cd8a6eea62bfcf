//! Ballistic projectiles owned by the agent that fired them.
//!
//! A pool lives inside the shooting behaviour and is stepped from its
//! update, so clearing the pool in `on_removed` releases every shot.

use crate::agent::AgentBody;
use crate::context::TickContext;
use crate::math::{safe_normalize, Vec3, EPSILON};

/// One projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    /// Current position.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Downward acceleration.
    pub gravity: f32,
    /// Hit radius.
    pub radius: f32,
    /// Base damage before the shooter's multiplier.
    pub damage: f32,
    /// Knockback strength along the flight direction.
    pub knockback: f32,
    /// Seconds left before it fizzles.
    pub lifetime: f32,
}

/// Projectiles owned by one agent.
#[derive(Debug, Clone, Default)]
pub struct ProjectilePool {
    shots: Vec<Projectile>,
}

/// Closest point on segment `a..b` to `p`.
fn closest_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= EPSILON * EPSILON {
        return a;
    }
    a + ab * ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

impl ProjectilePool {
    /// Add a projectile.
    pub fn fire(&mut self, projectile: Projectile) {
        self.shots.push(projectile);
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shots.len()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Drop every projectile.
    pub fn clear(&mut self) {
        self.shots.clear();
    }

    /// Advance every projectile, damaging the player on contact. Returns the
    /// number of hits landed this step.
    pub fn step(&mut self, owner: &AgentBody, ctx: &mut TickContext<'_>, dt: f32) -> u32 {
        let player = *ctx.player;
        let floor = ctx.colliders.floor();
        let mut hits = 0;
        let mut landed = Vec::new();

        self.shots.retain_mut(|shot| {
            let from = shot.position;
            shot.velocity.y -= shot.gravity * dt;
            let to = from + shot.velocity * dt;
            shot.position = to;
            shot.lifetime -= dt;

            let closest = closest_on_segment(from, to, player.position);
            let horizontal = Vec3::new(closest.x - player.position.x, 0.0, closest.z - player.position.z);
            let within_height = closest.y >= player.feet() - shot.radius
                && closest.y <= player.feet() + player.half_height * 2.0 + shot.radius;
            if within_height && horizontal.length() <= shot.radius + player.radius {
                let push = safe_normalize(shot.velocity).unwrap_or(Vec3::ZERO) * shot.knockback;
                landed.push((shot.damage, push));
                return false;
            }

            if ctx.colliders.segment_blocked(from, to) {
                return false;
            }
            shot.lifetime > 0.0 && to.y > floor
        });

        for (damage, push) in landed {
            ctx.hit_player(owner, damage, push);
            hits += 1;
        }
        hits
    }
}
