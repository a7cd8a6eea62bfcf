//! Ranged skirmisher.
//!
//! Holds a stand-off band, telegraphs a burst with a head glow and an aim
//! line, fires a fixed-size burst of ballistic projectiles whose spread
//! blooms per shot, then relocates sideways before engaging again. Losing sight of the
//! player during the telegraph cancels it.

use crate::agent::{AgentBody, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::{face_towards, strafe_direction, tick_down, walk};
use crate::context::{CommandBuffer, TickContext};
use crate::math::{ballistic_velocity, predict_intercept, rotate_y, Vec3};
use crate::projectile::{Projectile, ProjectilePool};
use crate::rig::AttachPoint;
use crate::rng::SimRng;

const BAND_MIN: f32 = 8.0;
const BAND_MAX: f32 = 14.0;
const TELEGRAPH_TIME: f32 = 0.6;
const SHOT_INTERVAL: f32 = 0.12;
const RELOCATE_TIME: f32 = 1.2;
const ENGAGE_DELAY: (f32, f32) = (0.8, 1.6);
const BLOOM_PER_SHOT: f32 = 0.04;
const BLOOM_DECAY: f32 = 0.1;
const BLOOM_MAX: f32 = 0.3;
const PROJECTILE_SPEED: f32 = 28.0;
const PROJECTILE_GRAVITY: f32 = 4.0;
const SHOT_DAMAGE: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Engage { delay: f32 },
    Telegraph { timer: f32 },
    Burst { shots_left: u32, timer: f32 },
    Relocate { timer: f32, sign: f32 },
}

/// Ranged skirmisher.
#[derive(Debug, Clone)]
pub struct Shooter {
    phase: Phase,
    bloom: f32,
    shots: ProjectilePool,
    cancelled: u32,
}

impl Shooter {
    /// New shooter.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            phase: Phase::Engage {
                delay: rng.range(ENGAGE_DELAY.0, ENGAGE_DELAY.1),
            },
            bloom: 0.0,
            shots: ProjectilePool::default(),
            cancelled: 0,
        }
    }

    /// Current spread in radians.
    #[must_use]
    pub fn bloom(&self) -> f32 {
        self.bloom
    }

    /// Telegraphs cancelled by lost line of sight.
    #[must_use]
    pub fn cancelled_telegraphs(&self) -> u32 {
        self.cancelled
    }

    fn fire(&mut self, body: &AgentBody, ctx: &mut TickContext<'_>) {
        let muzzle = body.rig.world_point(AttachPoint::Muzzle, &body.transform);
        let target = ctx.player.position;
        let aim = predict_intercept(muzzle, target, ctx.blackboard.player_velocity, PROJECTILE_SPEED);
        let flight_time = muzzle.distance(aim) / PROJECTILE_SPEED;
        let velocity = ballistic_velocity(muzzle, aim, flight_time, PROJECTILE_GRAVITY);
        let yaw_jitter = ctx.rng.range(-self.bloom, self.bloom);
        let lift_jitter = ctx.rng.range(-self.bloom, self.bloom) * velocity.length() * 0.5;
        let velocity = rotate_y(velocity, yaw_jitter) + Vec3::Y * lift_jitter;
        self.shots.fire(Projectile {
            position: muzzle,
            velocity,
            gravity: PROJECTILE_GRAVITY,
            radius: 0.15,
            damage: SHOT_DAMAGE,
            knockback: 0.8,
            lifetime: 3.0,
        });
        self.bloom = (self.bloom + BLOOM_PER_SHOT).min(BLOOM_MAX);
    }

    fn draw_aim(body: &AgentBody, ctx: &mut TickContext<'_>) {
        let muzzle = body.rig.world_point(AttachPoint::Muzzle, &body.transform);
        let target = ctx.player.position;
        ctx.aim_line(muzzle, target);
    }

    fn position_in_band(&self, body: &mut AgentBody, ctx: &TickContext<'_>, dt: f32) {
        let distance = ctx.player_distance(body.position());
        let speed = body.kind().speed();
        if distance > BAND_MAX {
            let heading = ctx.steer_towards(body, ctx.player.position);
            walk(body, ctx, heading, speed, dt);
        } else if distance < BAND_MIN {
            let away = ctx.player_direction(body.position()).map_or(Vec3::ZERO, |d| -d);
            let heading = ctx.steer(body, away);
            ctx.move_body(body, heading * speed * dt);
        }
        face_towards(body, ctx.player.position, dt);
    }
}

impl Behavior for Shooter {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        self.shots.step(body, ctx, dt);

        self.phase = match self.phase {
            Phase::Engage { mut delay } => {
                self.bloom = (self.bloom - BLOOM_DECAY * dt).max(0.0);
                self.position_in_band(body, ctx, dt);
                let distance = ctx.player_distance(body.position());
                let ready = tick_down(&mut delay, dt);
                if ready && distance <= BAND_MAX + 2.0 && ctx.sees_player(body) {
                    body.rig.head.emissive = 2.0;
                    Self::draw_aim(body, ctx);
                    Phase::Telegraph {
                        timer: TELEGRAPH_TIME,
                    }
                } else {
                    Phase::Engage {
                        delay: delay.max(0.0),
                    }
                }
            }
            Phase::Telegraph { mut timer } => {
                face_towards(body, ctx.player.position, dt);
                if !ctx.sees_player(body) {
                    body.rig.head.emissive = 0.0;
                    self.cancelled += 1;
                    Phase::Engage { delay: 0.5 }
                } else if tick_down(&mut timer, dt) {
                    body.rig.head.emissive = 0.0;
                    Phase::Burst {
                        shots_left: ctx.rng.range_inclusive(3, 5),
                        timer: 0.0,
                    }
                } else {
                    Self::draw_aim(body, ctx);
                    Phase::Telegraph { timer }
                }
            }
            Phase::Burst {
                mut shots_left,
                mut timer,
            } => {
                face_towards(body, ctx.player.position, dt);
                if tick_down(&mut timer, dt) {
                    self.fire(body, ctx);
                    body.rig.set_emissive(AttachPoint::Muzzle, 3.0);
                    shots_left = shots_left.saturating_sub(1);
                    timer = SHOT_INTERVAL;
                } else {
                    body.rig.set_emissive(AttachPoint::Muzzle, 0.0);
                }
                if shots_left == 0 {
                    Phase::Relocate {
                        timer: RELOCATE_TIME,
                        sign: ctx.rng.sign(),
                    }
                } else {
                    Phase::Burst { shots_left, timer }
                }
            }
            Phase::Relocate { mut timer, mut sign } => {
                self.bloom = (self.bloom - BLOOM_DECAY * dt).max(0.0);
                let lateral = strafe_direction(ctx, body, sign);
                let outcome = ctx.move_body(body, lateral * body.kind().speed() * dt);
                if outcome.obstructed(lateral) {
                    sign = -sign;
                }
                face_towards(body, ctx.player.position, dt);
                if tick_down(&mut timer, dt) {
                    let (lo, hi) = ENGAGE_DELAY;
                    let mut delay = ctx.rng.range(lo, hi);
                    if ctx.blackboard.suppression {
                        delay *= 1.5;
                    }
                    Phase::Engage { delay }
                } else {
                    Phase::Relocate { timer, sign }
                }
            }
        };
    }

    fn on_removed(&mut self, _body: &AgentBody, _cause: RemovalCause, _commands: &mut CommandBuffer) {
        self.shots.clear();
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.phase {
            Phase::Engage { .. } => ("engage", 0),
            Phase::Telegraph { .. } => ("telegraph", 1),
            Phase::Burst { .. } => ("burst", 1),
            Phase::Relocate { .. } => ("relocate", 0),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            projectiles: self.shots.len(),
            ..BehaviorStatus::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::behaviors::testing::{body, player_at, run, world};
    use crate::fx::FxRequest;
    use crate::spatial::{Aabb, ColliderSet};

    #[test]
    fn test_burst_blooms_and_hits() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Shooter, Vec3::new(0.0, 0.0, -10.0));
        let mut brain = Shooter::new(&mut SimRng::new(1));
        let mut peak_bloom: f32 = 0.0;
        for _ in 0..240 {
            run(&mut world, &player, &mut brain, &mut me, &[], 1);
            peak_bloom = peak_bloom.max(brain.bloom());
        }
        assert!(peak_bloom >= BLOOM_PER_SHOT * 3.0 - 1e-4);
        assert!(!world.commands.player_hits.is_empty());
    }

    #[test]
    fn test_keeps_stand_off_band() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Shooter, Vec3::new(0.0, 0.0, -3.0));
        let mut brain = Shooter::new(&mut SimRng::new(2));
        run(&mut world, &player, &mut brain, &mut me, &[], 60);
        assert!(me.position().z < -4.0);
    }

    #[test]
    fn test_telegraph_cancelled_when_sight_breaks() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Shooter, Vec3::new(0.0, 0.0, -10.0));
        let mut brain = Shooter::new(&mut SimRng::new(3));
        for _ in 0..200 {
            run(&mut world, &player, &mut brain, &mut me, &[], 1);
            if brain.status().phase == "telegraph" {
                break;
            }
        }
        assert_eq!(brain.status().phase, "telegraph");
        let muzzle = me.rig.world_point(AttachPoint::Muzzle, &me.transform);
        let aimed = world.commands.fx.iter().any(|fx| match fx {
            FxRequest::Line { from, to, .. } => {
                from.distance(muzzle) < 0.5 && to.distance(player.position) < 1e-4
            }
            _ => false,
        });
        assert!(aimed);
        world.colliders = ColliderSet::with_boxes(vec![Aabb::block(-4.0, 4.0, -6.0, -5.0, 0.0, 4.0)]);
        run(&mut world, &player, &mut brain, &mut me, &[], 1);
        assert_eq!(brain.status().phase, "engage");
        assert_eq!(brain.cancelled_telegraphs(), 1);
    }

    #[test]
    fn test_removal_clears_projectiles() {
        let mut brain = Shooter::new(&mut SimRng::new(4));
        brain.shots.fire(Projectile {
            position: Vec3::ZERO,
            velocity: Vec3::Z,
            gravity: 0.0,
            radius: 0.1,
            damage: 1.0,
            knockback: 0.0,
            lifetime: 5.0,
        });
        let me = body(1, AgentKind::Shooter, Vec3::ZERO);
        brain.on_removed(&me, RemovalCause::Killed, &mut CommandBuffer::default());
        assert_eq!(brain.status().projectiles, 0);
    }
}
