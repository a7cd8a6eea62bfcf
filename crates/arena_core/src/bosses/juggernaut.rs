//! Juggernaut: a heavy bruiser with a stomp, a cleave and a charge.
//!
//! Phase two speeds it up and shortens its cooldowns. It leaves add
//! spawning to the manager's boss director.

use tracing::debug;

use crate::agent::{AgentBody, Behavior, BehaviorStatus};
use crate::behaviors::{face_towards, walk};
use crate::bosses::shared::{in_cone, in_radius, AbilityCycle, CycleEvent, PhaseGate};
use crate::context::TickContext;
use crate::fx::colors;
use crate::math::{flat_direction, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;

const ENRAGED_SPEED: f32 = 1.35;
const ENRAGED_COOLDOWN: f32 = 0.7;
const BASE_COOLDOWN: f32 = 2.5;

const STOMP_RADIUS: f32 = 5.0;
const STOMP_WINDUP: f32 = 1.0;
const STOMP_DAMAGE: f32 = 25.0;
const STOMP_KNOCKBACK: f32 = 9.0;

const CLEAVE_RANGE: f32 = 4.5;
const CLEAVE_HALF_ARC: f32 = 1.0;
const CLEAVE_WINDUP: f32 = 0.7;
const CLEAVE_DAMAGE: f32 = 30.0;

const CHARGE_WINDUP: f32 = 0.8;
const CHARGE_RANGE: f32 = 18.0;
const CHARGE_SPEED: f32 = 3.5;
const CHARGE_TIME: f32 = 1.2;
const CHARGE_DAMAGE: f32 = 35.0;
const CHARGE_CONTACT: f32 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ability {
    Stomp,
    Cleave,
    Charge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ChargeRun {
    direction: Vec3,
    remaining: f32,
    hit: bool,
}

/// Heavy bruiser boss.
#[derive(Debug, Clone)]
pub struct Juggernaut {
    gate: PhaseGate,
    cycle: AbilityCycle<Ability>,
    charge: Option<ChargeRun>,
}

impl Juggernaut {
    /// New juggernaut.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            gate: PhaseGate::default(),
            cycle: AbilityCycle::new(rng.range(1.0, 2.0)),
            charge: None,
        }
    }

    fn cooldown(&self) -> f32 {
        if self.gate.phase_two() {
            BASE_COOLDOWN * ENRAGED_COOLDOWN
        } else {
            BASE_COOLDOWN
        }
    }

    fn speed(&self, body: &AgentBody) -> f32 {
        let base = body.kind().speed();
        if self.gate.phase_two() {
            base * ENRAGED_SPEED
        } else {
            base
        }
    }

    fn choose(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        let distance = ctx.player_distance(body.position());
        let target = ctx.player.position;
        let cooldown = self.cooldown();
        if distance <= CLEAVE_RANGE {
            if ctx.rng.chance(0.5) {
                self.cycle.begin(Ability::Stomp, STOMP_WINDUP, body.position(), cooldown);
                ctx.ring(body.position(), STOMP_RADIUS, colors::DANGER);
            } else {
                self.cycle.begin(Ability::Cleave, CLEAVE_WINDUP, target, cooldown);
                ctx.ring(body.position(), CLEAVE_RANGE, colors::WARNING);
            }
            body.rig.set_emissive(AttachPoint::RightArm, 2.0);
        } else if distance <= CHARGE_RANGE && ctx.sees_player(body) {
            self.cycle.begin(Ability::Charge, CHARGE_WINDUP, target, cooldown);
            ctx.ring(target, 1.5, colors::DANGER);
            body.rig.head.emissive = 2.0;
        }
    }

    fn resolve(&mut self, ability: Ability, target: Vec3, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        body.rig.set_emissive(AttachPoint::RightArm, 0.0);
        body.rig.head.emissive = 0.0;
        match ability {
            Ability::Stomp => {
                ctx.ground_slam(body.position(), STOMP_RADIUS);
                if in_radius(body.position(), STOMP_RADIUS, ctx.player) {
                    let push = ctx.knockback_from(body.position(), STOMP_KNOCKBACK);
                    ctx.hit_player(body, STOMP_DAMAGE, push);
                }
            }
            Ability::Cleave => {
                if in_cone(body.position(), body.transform.forward(), CLEAVE_HALF_ARC, CLEAVE_RANGE, ctx.player) {
                    let push = ctx.knockback_from(body.position(), 4.0);
                    ctx.hit_player(body, CLEAVE_DAMAGE, push);
                }
            }
            Ability::Charge => {
                if let Some(direction) = flat_direction(body.position(), target) {
                    ctx.vocal(body.kind());
                    self.charge = Some(ChargeRun {
                        direction,
                        remaining: CHARGE_TIME,
                        hit: false,
                    });
                }
            }
        }
    }

    fn run_charge(&mut self, mut run: ChargeRun, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        let step = run.direction * self.speed(body) * CHARGE_SPEED * dt;
        let outcome = ctx.move_body(body, step);
        if !run.hit && ctx.player_distance(body.position()) <= CHARGE_CONTACT + ctx.player.radius {
            let push = run.direction * 10.0;
            ctx.hit_player(body, CHARGE_DAMAGE, push);
            run.hit = true;
        }
        run.remaining -= dt;
        if outcome.obstructed(run.direction) {
            ctx.ground_slam(body.position(), 2.0);
        } else if run.remaining > 0.0 && !run.hit {
            self.charge = Some(run);
        }
    }
}

impl Behavior for Juggernaut {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.gate.check(body.meta.health_fraction()) {
            debug!(agent = %body.id, "juggernaut enters phase two");
            ctx.vocal(body.kind());
        }
        if let Some(run) = self.charge.take() {
            self.run_charge(run, body, ctx, dt);
            return;
        }

        match self.cycle.tick(dt) {
            CycleEvent::Ready => self.choose(body, ctx),
            CycleEvent::Resolve(ability, target) => self.resolve(ability, target, body, ctx),
            CycleEvent::Idle => {}
        }

        match self.cycle.telegraphing() {
            Some((Ability::Cleave, _)) => {
                self.cycle.retarget(ctx.player.position);
                face_towards(body, ctx.player.position, dt);
            }
            Some((Ability::Charge, target)) => face_towards(body, target, dt),
            Some((Ability::Stomp, _)) => {}
            None if self.charge.is_none() => {
                if ctx.player_distance(body.position()) > 2.5 {
                    let heading = ctx.steer_towards(body, ctx.player.position);
                    walk(body, ctx, heading, self.speed(body), dt);
                } else {
                    face_towards(body, ctx.player.position, dt);
                }
            }
            None => {}
        }
    }

    fn self_manages_cadence(&self) -> bool {
        false
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match (self.charge, self.cycle.telegraphing()) {
            (Some(_), _) => ("charge", 1),
            (None, Some((Ability::Stomp, _))) => ("stomp_windup", 1),
            (None, Some((Ability::Cleave, _))) => ("cleave_windup", 1),
            (None, Some((Ability::Charge, _))) => ("charge_windup", 1),
            (None, None) => ("pursue", 0),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            boss_phase: Some(self.gate.phase()),
            ..BehaviorStatus::default()
        }
    }
}
