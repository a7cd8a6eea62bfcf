//! Stormcaller: a flying boss that calls lightning onto marked ground.
//!
//! It circles the player at altitude. Each strike is telegraphed by a ring
//! under the player; phase two calls several strikes at once and adds a
//! diving attack. Add spawns come from the manager's boss director.

use std::f32::consts::TAU;

use tracing::debug;

use crate::agent::{AgentBody, Behavior, BehaviorStatus};
use crate::bosses::shared::{in_radius, AbilityCycle, CycleEvent, PhaseGate};
use crate::context::TickContext;
use crate::fx::colors;
use crate::math::{flat, safe_normalize, yaw_of, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;
use crate::spawn::ring_point;

const ALTITUDE: f32 = 5.0;
const ORBIT_RADIUS: f32 = 12.0;
const MIN_ALTITUDE: f32 = 1.0;

const STRIKE_WINDUP: f32 = 1.2;
const STRIKE_RADIUS: f32 = 3.0;
const STRIKE_DAMAGE: f32 = 22.0;
const ENRAGED_STRIKES: usize = 3;
const STRIKE_SPREAD: f32 = 4.0;

const DIVE_WINDUP: f32 = 0.8;
const DIVE_SPEED: f32 = 14.0;
const DIVE_TIME: f32 = 1.6;
const DIVE_DAMAGE: f32 = 30.0;
const DIVE_CONTACT: f32 = 1.5;

const COOLDOWN: f32 = 2.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ability {
    Lightning,
    Dive,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Flight {
    Circle,
    Dive { direction: Vec3, remaining: f32 },
    Climb,
}

/// Flying storm boss.
#[derive(Debug, Clone)]
pub struct Stormcaller {
    gate: PhaseGate,
    cycle: AbilityCycle<Ability>,
    flight: Flight,
    orbit_angle: f32,
    orbit_sign: f32,
    strikes: Vec<Vec3>,
}

impl Stormcaller {
    /// New stormcaller.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            gate: PhaseGate::default(),
            cycle: AbilityCycle::new(rng.range(1.5, 2.5)),
            flight: Flight::Circle,
            orbit_angle: rng.angle(),
            orbit_sign: rng.sign(),
            strikes: Vec::new(),
        }
    }

    /// Strike points of the pending lightning call.
    #[must_use]
    pub fn marked(&self) -> &[Vec3] {
        &self.strikes
    }

    fn mark_strikes(&mut self, ctx: &mut TickContext<'_>) {
        self.strikes.clear();
        let player = ctx.player.position;
        self.strikes.push(Vec3::new(player.x, ctx.ground_height(player.x, player.z), player.z));
        if self.gate.phase_two() {
            let offset = ctx.rng.angle();
            for i in 1..ENRAGED_STRIKES {
                let angle = offset + i as f32 * TAU / (ENRAGED_STRIKES - 1) as f32;
                let mut at = ring_point(player, STRIKE_SPREAD, angle);
                at.y = ctx.ground_height(at.x, at.z);
                self.strikes.push(at);
            }
        }
        for &at in &self.strikes {
            ctx.ring(at, STRIKE_RADIUS, colors::STORM);
        }
    }

    fn fly_to(body: &mut AgentBody, ctx: &TickContext<'_>, goal: Vec3, speed: f32, dt: f32) {
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

    fn circle(&mut self, body: &mut AgentBody, ctx: &TickContext<'_>, dt: f32) {
        let speed = body.kind().speed();
        self.orbit_angle += self.orbit_sign * speed / ORBIT_RADIUS * dt;
        let mut goal = ring_point(ctx.player.position, ORBIT_RADIUS, self.orbit_angle);
        goal.y = ctx.ground_height(goal.x, goal.z) + ALTITUDE;
        Self::fly_to(body, ctx, goal, speed, dt);
    }

    fn resolve(&mut self, ability: Ability, target: Vec3, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        body.rig.set_emissive(AttachPoint::Core, 0.0);
        match ability {
            Ability::Lightning => {
                let struck = self.strikes.iter().any(|&at| in_radius(at, STRIKE_RADIUS, ctx.player));
                for &at in &self.strikes {
                    ctx.ground_slam(at, STRIKE_RADIUS);
                }
                if struck {
                    ctx.hit_player(body, STRIKE_DAMAGE, Vec3::ZERO);
                }
                self.strikes.clear();
            }
            Ability::Dive => {
                if let Some(direction) = safe_normalize(target - body.position()) {
                    ctx.vocal(body.kind());
                    self.flight = Flight::Dive {
                        direction,
                        remaining: DIVE_TIME,
                    };
                }
            }
        }
    }

    fn dive(&mut self, direction: Vec3, remaining: f32, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        let outcome = ctx.fly_body(body, direction * DIVE_SPEED * dt, MIN_ALTITUDE);
        if ctx.player_distance(body.position()) <= DIVE_CONTACT + ctx.player.radius {
            let push = flat(direction).normalize_or_zero() * 8.0;
            ctx.hit_player(body, DIVE_DAMAGE, push);
            self.flight = Flight::Climb;
            return;
        }
        let remaining = remaining - dt;
        self.flight = if remaining <= 0.0 || outcome.obstructed(direction) {
            Flight::Climb
        } else {
            Flight::Dive { direction, remaining }
        };
    }
}

impl Behavior for Stormcaller {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.gate.check(body.meta.health_fraction()) {
            debug!(agent = %body.id, "stormcaller enters phase two");
            ctx.vocal(body.kind());
        }

        match self.flight {
            Flight::Dive { direction, remaining } => {
                self.dive(direction, remaining, body, ctx, dt);
                return;
            }
            Flight::Climb => {
                let goal_height = ctx.ground_height(body.position().x, body.position().z) + ALTITUDE;
                let goal = Vec3::new(body.position().x, goal_height, body.position().z);
                Self::fly_to(body, ctx, goal, body.kind().speed(), dt);
                if (body.position().y - goal_height).abs() < 0.1 {
                    self.flight = Flight::Circle;
                }
                return;
            }
            Flight::Circle => {}
        }

        match self.cycle.tick(dt) {
            CycleEvent::Ready => {
                let cooldown = if self.gate.phase_two() { COOLDOWN * 0.75 } else { COOLDOWN };
                if self.gate.phase_two() && ctx.rng.chance(0.4) && ctx.sees_player(body) {
                    self.cycle
                        .begin(Ability::Dive, DIVE_WINDUP, ctx.player.position, cooldown);
                    body.rig.set_emissive(AttachPoint::Core, 3.0);
                } else {
                    self.cycle
                        .begin(Ability::Lightning, STRIKE_WINDUP, ctx.player.position, cooldown);
                    self.mark_strikes(ctx);
                    body.rig.set_emissive(AttachPoint::Core, 2.0);
                }
            }
            CycleEvent::Resolve(ability, target) => self.resolve(ability, target, body, ctx),
            CycleEvent::Idle => {}
        }

        if let Some((Ability::Dive, _)) = self.cycle.telegraphing() {
            self.cycle.retarget(ctx.player.position);
            return;
        }
        if matches!(self.flight, Flight::Circle) {
            self.circle(body, ctx, dt);
        }
    }

    fn self_manages_cadence(&self) -> bool {
        false
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match (self.flight, self.cycle.telegraphing()) {
            (Flight::Dive { .. }, _) => ("dive", 1),
            (Flight::Climb, _) => ("climb", 0),
            (Flight::Circle, Some((Ability::Lightning, _))) => ("lightning_windup", 1),
            (Flight::Circle, Some((Ability::Dive, _))) => ("dive_windup", 1),
            (Flight::Circle, None) => ("circle", 0),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            boss_phase: Some(self.gate.phase()),
            ..BehaviorStatus::default()
        }
    }
}
