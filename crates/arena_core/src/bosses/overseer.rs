//! Overseer: a slow turret boss that shields itself behind nodes.
//!
//! On entering phase two it raises a shield and deploys shield nodes around
//! itself; it takes no damage until every node is destroyed. Its attacks
//! are a rotating beam sweep and a close-range pulse.

use std::f32::consts::TAU;

use tracing::debug;

use crate::agent::{AgentBody, AgentKind, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::{face_towards, walk};
use crate::bosses::shared::{in_radius, swept_past, AbilityCycle, CycleEvent, OwnedAdds, PhaseGate};
use crate::context::{CommandBuffer, TickContext};
use crate::fx::colors;
use crate::math::{flat_direction, yaw_of, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;
use crate::spawn::{ring_point, SpawnOptions, SpawnRole};

const NODE_COUNT: usize = 3;
const NODE_RING: f32 = 6.0;

const SWEEP_WINDUP: f32 = 1.0;
const SWEEP_ARC: f32 = 120.0;
const SWEEP_TIME: f32 = 2.0;
const SWEEP_RANGE: f32 = 16.0;
const SWEEP_DAMAGE: f32 = 20.0;

const PULSE_WINDUP: f32 = 1.2;
const PULSE_RADIUS: f32 = 7.0;
const PULSE_DAMAGE: f32 = 20.0;

const COOLDOWN: f32 = 2.5;
const DRIFT_DISTANCE: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ability {
    Sweep,
    Pulse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sweep {
    yaw: f32,
    end_yaw: f32,
    rate: f32,
    hit: bool,
}

/// Shielded turret boss.
#[derive(Debug, Clone)]
pub struct Overseer {
    gate: PhaseGate,
    cycle: AbilityCycle<Ability>,
    sweep: Option<Sweep>,
    nodes: OwnedAdds,
    shielded: bool,
}

impl Overseer {
    /// New overseer.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            gate: PhaseGate::default(),
            cycle: AbilityCycle::new(rng.range(1.0, 2.0)),
            sweep: None,
            nodes: OwnedAdds::new(NODE_COUNT),
            shielded: false,
        }
    }

    /// Whether the shield is up.
    #[must_use]
    pub fn shielded(&self) -> bool {
        self.shielded
    }

    fn raise_shield(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        let offset = ctx.rng.angle();
        for i in 0..NODE_COUNT {
            let angle = offset + i as f32 * TAU / NODE_COUNT as f32;
            let mut at = ring_point(body.position(), NODE_RING, angle);
            at.y = ctx.ground_height(at.x, at.z);
            self.nodes
                .try_spawn(ctx, body.id, AgentKind::ShieldNode, SpawnRole::BossAdd, at, SpawnOptions::default());
        }
        self.shielded = !self.nodes.is_empty();
        if self.shielded {
            body.rig.set_emissive(AttachPoint::Core, 3.0);
            debug!(agent = %body.id, nodes = self.nodes.len(), "overseer shield raised");
        }
    }

    fn run_sweep(&mut self, mut sweep: Sweep, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        let from = sweep.yaw;
        let step = sweep.rate * dt;
        let remaining = sweep.end_yaw - sweep.yaw;
        let to = if remaining.abs() <= step.abs() {
            sweep.end_yaw
        } else {
            sweep.yaw + step
        };
        body.transform.yaw = to;
        let origin = body.rig.world_point(AttachPoint::Muzzle, &body.transform);
        if !sweep.hit
            && swept_past(origin, from, to, SWEEP_RANGE, ctx.player)
            && ctx.has_line_of_sight(origin, ctx.player.eye())
        {
            ctx.hit_player(body, SWEEP_DAMAGE, Vec3::ZERO);
            sweep.hit = true;
        }
        sweep.yaw = to;
        if (sweep.end_yaw - sweep.yaw).abs() > 1e-4 {
            self.sweep = Some(sweep);
        } else {
            body.rig.set_emissive(AttachPoint::Muzzle, 0.0);
        }
    }
}

impl Behavior for Overseer {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.gate.check(body.meta.health_fraction()) {
            ctx.vocal(body.kind());
            self.raise_shield(body, ctx);
        }
        self.nodes.prune(ctx);
        if self.shielded && self.nodes.is_empty() {
            self.shielded = false;
            body.rig.set_emissive(AttachPoint::Core, 0.0);
            debug!(agent = %body.id, "overseer shield down");
        }

        if let Some(sweep) = self.sweep.take() {
            self.run_sweep(sweep, body, ctx, dt);
            return;
        }

        match self.cycle.tick(dt) {
            CycleEvent::Ready => {
                let distance = ctx.player_distance(body.position());
                if distance <= PULSE_RADIUS && ctx.rng.chance(0.6) {
                    self.cycle
                        .begin(Ability::Pulse, PULSE_WINDUP, body.position(), COOLDOWN);
                    ctx.ring(body.position(), PULSE_RADIUS, colors::DANGER);
                } else if distance <= SWEEP_RANGE {
                    self.cycle
                        .begin(Ability::Sweep, SWEEP_WINDUP, ctx.player.position, COOLDOWN);
                    body.rig.set_emissive(AttachPoint::Muzzle, 2.0);
                }
            }
            CycleEvent::Resolve(Ability::Pulse, center) => {
                ctx.ground_slam(center, PULSE_RADIUS);
                if in_radius(center, PULSE_RADIUS, ctx.player) {
                    let push = ctx.knockback_from(center, 7.0);
                    ctx.hit_player(body, PULSE_DAMAGE, push);
                }
            }
            CycleEvent::Resolve(Ability::Sweep, target) => {
                let centre = flat_direction(body.position(), target)
                    .map_or(body.transform.yaw, |d| yaw_of(d, body.transform.yaw));
                let half = SWEEP_ARC.to_radians() * 0.5;
                let sign = ctx.rng.sign();
                let start = centre - half * sign;
                let end_yaw = centre + half * sign;
                body.transform.yaw = start;
                self.sweep = Some(Sweep {
                    yaw: start,
                    end_yaw,
                    rate: (end_yaw - start) / SWEEP_TIME,
                    hit: false,
                });
            }
            CycleEvent::Idle => {}
        }

        if self.cycle.telegraphing().is_some() || self.sweep.is_some() {
            return;
        }
        if ctx.player_distance(body.position()) > DRIFT_DISTANCE {
            let heading = ctx.steer_towards(body, ctx.player.position);
            walk(body, ctx, heading, body.kind().speed(), dt);
        } else {
            face_towards(body, ctx.player.position, dt);
        }
    }

    fn on_removed(&mut self, _body: &AgentBody, _cause: RemovalCause, commands: &mut CommandBuffer) {
        self.nodes.release_all(commands);
    }

    fn incoming_damage_scale(&self, _body: &AgentBody, _is_head: bool) -> f32 {
        if self.shielded {
            0.0
        } else {
            1.0
        }
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match (self.sweep, self.cycle.telegraphing()) {
            (Some(_), _) => ("sweep", 1),
            (None, Some((Ability::Sweep, _))) => ("sweep_windup", 1),
            (None, Some((Ability::Pulse, _))) => ("pulse_windup", 1),
            (None, None) if self.shielded => ("shielded", 0),
            (None, None) => ("watch", 0),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            invulnerable: self.shielded,
            boss_phase: Some(self.gate.phase()),
            ..BehaviorStatus::default()
        }
    }
}
