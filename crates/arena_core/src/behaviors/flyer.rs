//! Dive-bomber flyer.
//!
//! `cruise` (orbit plus weave) → `windup` (strafe to a flanking anchor
//! steep enough above the player) → `dive` (straight line at the player) →
//! `recover` (climb back). Only the tail of the dive deals damage, and any
//! contact ends the dive.

use std::f32::consts::TAU;

use crate::agent::{AgentBody, Behavior, BehaviorStatus};
use crate::behaviors::tick_down;
use crate::context::TickContext;
use crate::math::{flat, flat_perpendicular, safe_normalize, yaw_of, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;

const ORBIT_RADIUS: f32 = 10.0;
const CRUISE_ALTITUDE: f32 = 6.0;
const WEAVE_AMPLITUDE: f32 = 1.2;
const WEAVE_RATE: f32 = 2.2;
/// Minimum angle between the dive line and straight down.
const MIN_ANGLE_OFF_VERTICAL: f32 = 35.0;
const ANCHOR_OFFSET: f32 = 7.0;
const WINDUP_LIMIT: f32 = 1.5;
const DIVE_SPEED: f32 = 18.0;
/// Fraction of the dive after which contact deals damage.
const DAMAGE_WINDOW_START: f32 = 0.65;
const DIVE_DAMAGE: f32 = 15.0;
const CONTACT_RADIUS: f32 = 0.8;
const RECOVER_TIME: f32 = 1.2;
const MIN_ALTITUDE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Cruise { timer: f32 },
    Windup { timer: f32, anchor: Vec3 },
    Dive { direction: Vec3, length: f32, travelled: f32 },
    Recover { timer: f32 },
}

/// Dive-bombing flyer.
#[derive(Debug, Clone)]
pub struct Flyer {
    phase: Phase,
    orbit_angle: f32,
    orbit_sign: f32,
    weave_phase: f32,
    dives: u32,
    hits: u32,
}

impl Flyer {
    /// New flyer.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            phase: Phase::Cruise {
                timer: rng.range(2.5, 4.5),
            },
            orbit_angle: rng.angle(),
            orbit_sign: rng.sign(),
            weave_phase: rng.angle(),
            dives: 0,
            hits: 0,
        }
    }

    /// Dives started.
    #[must_use]
    pub fn dives(&self) -> u32 {
        self.dives
    }

    /// Dives that hit.
    #[must_use]
    pub fn hits(&self) -> u32 {
        self.hits
    }

    /// Whether a dive from `anchor` to `target` leans far enough away from
    /// vertical.
    #[must_use]
    pub fn anchor_is_valid(anchor: Vec3, target: Vec3) -> bool {
        let delta = anchor - target;
        let horizontal = flat(delta).length();
        let vertical = delta.y.max(1e-3);
        horizontal.atan2(vertical).to_degrees() >= MIN_ANGLE_OFF_VERTICAL
    }

    fn pick_anchor(&self, ctx: &mut TickContext<'_>) -> Vec3 {
        let player = ctx.player.position;
        let forward = safe_normalize(flat(ctx.player.forward)).unwrap_or(Vec3::Z);
        let side = flat_perpendicular(forward) * ctx.rng.sign();
        let offset = (side + forward * ctx.rng.range(-0.3, 0.3)).normalize_or_zero() * ANCHOR_OFFSET;
        let ground = ctx.ground_height(player.x + offset.x, player.z + offset.z);
        Vec3::new(player.x + offset.x, ground + CRUISE_ALTITUDE, player.z + offset.z)
    }

    fn cruise(&mut self, body: &mut AgentBody, ctx: &TickContext<'_>, dt: f32) {
        let speed = body.kind().speed();
        self.orbit_angle += self.orbit_sign * speed / ORBIT_RADIUS * dt;
        self.weave_phase = (self.weave_phase + WEAVE_RATE * dt) % TAU;
        let player = ctx.player.position;
        let mut goal = Vec3::new(
            player.x + self.orbit_angle.sin() * ORBIT_RADIUS,
            0.0,
            player.z + self.orbit_angle.cos() * ORBIT_RADIUS,
        );
        goal.y = ctx.ground_height(goal.x, goal.z) + CRUISE_ALTITUDE + self.weave_phase.sin() * WEAVE_AMPLITUDE;
        self.fly_to(body, ctx, goal, speed, dt);
    }

    fn fly_to(&self, body: &mut AgentBody, ctx: &TickContext<'_>, goal: Vec3, speed: f32, dt: f32) {
        let delta = goal - body.position();
        let step = speed * dt;
        let motion = if delta.length() <= step {
            delta
        } else {
            delta.normalize_or_zero() * step
        };
        if flat(motion).length_squared() > 1e-8 {
            body.transform.yaw = yaw_of(motion, body.transform.yaw);
        }
        ctx.fly_body(body, motion, MIN_ALTITUDE);
    }
}

impl Behavior for Flyer {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        let speed = body.kind().speed();
        self.phase = match self.phase {
            Phase::Cruise { mut timer } => {
                self.cruise(body, ctx, dt);
                body.transform.roll = self.weave_phase.cos() * 0.3;
                if tick_down(&mut timer, dt) {
                    let anchor = self.pick_anchor(ctx);
                    Phase::Windup {
                        timer: WINDUP_LIMIT,
                        anchor,
                    }
                } else {
                    Phase::Cruise { timer }
                }
            }
            Phase::Windup { mut timer, anchor } => {
                self.fly_to(body, ctx, anchor, speed * 1.4, dt);
                body.rig.set_emissive(AttachPoint::LeftWing, 2.0);
                body.rig.set_emissive(AttachPoint::RightWing, 2.0);
                let target = ctx.player.position;
                let arrived = body.position().distance(anchor) < 0.6;
                let expired = tick_down(&mut timer, dt);
                if (arrived || expired) && Self::anchor_is_valid(body.position(), target) {
                    let line = target - body.position();
                    let length = line.length();
                    match safe_normalize(line) {
                        Some(direction) => {
                            self.dives += 1;
                            ctx.vocal(body.kind());
                            Phase::Dive {
                                direction,
                                length,
                                travelled: 0.0,
                            }
                        }
                        None => Phase::Recover { timer: RECOVER_TIME },
                    }
                } else if expired {
                    // Anchor unreachable at a legal angle
                    Phase::Cruise { timer: 1.0 }
                } else {
                    Phase::Windup { timer, anchor }
                }
            }
            Phase::Dive {
                direction,
                length,
                mut travelled,
            } => {
                body.transform.pitch = -direction.y.asin();
                let step = DIVE_SPEED * dt;
                let before = body.position();
                ctx.fly_body(body, direction * step, MIN_ALTITUDE);
                travelled += body.position().distance(before).max(step * 0.25);

                let contact = body.position().distance(ctx.player.position)
                    <= CONTACT_RADIUS + ctx.player.radius;
                if contact {
                    if travelled >= length * DAMAGE_WINDOW_START {
                        let push = direction * 5.0;
                        ctx.hit_player(body, DIVE_DAMAGE, push);
                        self.hits += 1;
                    }
                    Phase::Recover { timer: RECOVER_TIME }
                } else if travelled >= length + 2.0 {
                    Phase::Recover { timer: RECOVER_TIME }
                } else {
                    Phase::Dive {
                        direction,
                        length,
                        travelled,
                    }
                }
            }
            Phase::Recover { mut timer } => {
                body.transform.pitch = 0.0;
                body.rig.set_emissive(AttachPoint::LeftWing, 0.0);
                body.rig.set_emissive(AttachPoint::RightWing, 0.0);
                let climb = Vec3::new(0.0, speed * 0.8 * dt, 0.0);
                let away = ctx
                    .player_direction(body.position())
                    .map_or(Vec3::ZERO, |d| -d * speed * 0.6 * dt);
                ctx.fly_body(body, climb + away, MIN_ALTITUDE);
                if tick_down(&mut timer, dt) {
                    Phase::Cruise {
                        timer: ctx.rng.range(2.5, 4.5),
                    }
                } else {
                    Phase::Recover { timer }
                }
            }
        };
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.phase {
            Phase::Cruise { .. } => ("cruise", 0),
            Phase::Windup { .. } => ("windup", 1),
            Phase::Dive { .. } => ("dive", 1),
            Phase::Recover { .. } => ("recover", 0),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            ..BehaviorStatus::default()
        }
    }
}
