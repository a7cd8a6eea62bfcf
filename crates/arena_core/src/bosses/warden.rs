//! Warden: marks the ground under the player and judges the mark.
//!
//! A verdict that catches the player hits hard. A verdict the player escapes
//! leaves the warden exposed for a few seconds. Between verdicts it fires a
//! line beam and calls in shooter adds on a fixed cadence.

use tracing::debug;

use crate::agent::{AgentBody, AgentKind, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::{face_towards, strafe_direction, walk};
use crate::bosses::shared::{
    in_line, in_radius, AbilityCycle, CycleEvent, OwnedAdds, PhaseGate, WeakpointWindow,
};
use crate::context::{CommandBuffer, TickContext};
use crate::fx::colors;
use crate::math::{flat_direction, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;
use crate::spawn::{ring_point, SpawnOptions, SpawnRole};

const VERDICT_WINDUP: f32 = 2.5;
const VERDICT_RADIUS: f32 = 3.0;
const VERDICT_DAMAGE: f32 = 30.0;
const EXPOSED_TIME: f32 = 4.0;
const EXPOSED_MULTIPLIER: f32 = 2.0;

const BEAM_WINDUP: f32 = 1.0;
const BEAM_LENGTH: f32 = 20.0;
const BEAM_HALF_WIDTH: f32 = 0.6;
const BEAM_DAMAGE: f32 = 22.0;

const COOLDOWN: f32 = 2.0;
const ADD_INTERVAL: f32 = 12.0;
const ADD_CAP: usize = 3;
const KEEP_MIN: f32 = 10.0;
const KEEP_MAX: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ability {
    Verdict,
    Beam,
}

/// Judge boss.
#[derive(Debug, Clone)]
pub struct Warden {
    gate: PhaseGate,
    cycle: AbilityCycle<Ability>,
    weakpoint: WeakpointWindow,
    adds: OwnedAdds,
    add_timer: f32,
    strafe_sign: f32,
    verdicts_missed: u32,
}

impl Warden {
    /// New warden.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            gate: PhaseGate::default(),
            cycle: AbilityCycle::new(rng.range(1.0, 2.0)),
            weakpoint: WeakpointWindow::default(),
            adds: OwnedAdds::new(ADD_CAP),
            add_timer: ADD_INTERVAL * 0.5,
            strafe_sign: rng.sign(),
            verdicts_missed: 0,
        }
    }

    /// Verdicts the player escaped.
    #[must_use]
    pub fn verdicts_missed(&self) -> u32 {
        self.verdicts_missed
    }

    fn choose(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        let sees = ctx.sees_player(body);
        // Verdicts need no sight line; they mark the ground
        if !sees || ctx.rng.chance(0.5) {
            let mut mark = ctx.player.position;
            mark.y = ctx.ground_height(mark.x, mark.z);
            let windup = if self.gate.phase_two() {
                VERDICT_WINDUP * 0.8
            } else {
                VERDICT_WINDUP
            };
            self.cycle.begin(Ability::Verdict, windup, mark, COOLDOWN);
            ctx.ring(mark, VERDICT_RADIUS, colors::WARNING);
        } else {
            self.cycle
                .begin(Ability::Beam, BEAM_WINDUP, ctx.player.position, COOLDOWN);
            body.rig.set_emissive(AttachPoint::Muzzle, 2.5);
        }
    }

    fn resolve(&mut self, ability: Ability, target: Vec3, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        match ability {
            Ability::Verdict => {
                if in_radius(target, VERDICT_RADIUS, ctx.player) {
                    ctx.hit_player(body, VERDICT_DAMAGE, Vec3::Y * 4.0);
                } else {
                    self.verdicts_missed += 1;
                    self.weakpoint.open(EXPOSED_TIME, EXPOSED_MULTIPLIER);
                    body.rig.set_emissive(AttachPoint::Weakpoint, 3.0);
                    debug!(agent = %body.id, "warden verdict missed, weakpoint exposed");
                }
                ctx.ground_slam(target, VERDICT_RADIUS);
            }
            Ability::Beam => {
                body.rig.set_emissive(AttachPoint::Muzzle, 0.0);
                let muzzle = body.rig.world_point(AttachPoint::Muzzle, &body.transform);
                let Some(direction) = flat_direction(muzzle, target) else {
                    return;
                };
                if ctx.has_line_of_sight(muzzle, ctx.player.eye())
                    && in_line(muzzle, direction, BEAM_LENGTH, BEAM_HALF_WIDTH, ctx.player)
                {
                    ctx.hit_player(body, BEAM_DAMAGE, direction * 2.0);
                }
            }
        }
    }

    fn call_adds(&mut self, body: &AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        self.add_timer -= dt;
        if self.add_timer > 0.0 {
            return;
        }
        self.add_timer = ADD_INTERVAL;
        let count = if self.gate.phase_two() { 2 } else { 1 };
        for _ in 0..count {
            let angle = ctx.rng.angle();
            let mut at = ring_point(body.position(), 4.0, angle);
            at.y = ctx.ground_height(at.x, at.z);
            if self
                .adds
                .try_spawn(ctx, body.id, AgentKind::Shooter, SpawnRole::BossAdd, at, SpawnOptions::default())
                .is_some()
            {
                ctx.ring(at, 1.2, colors::SPAWN);
            }
        }
    }
}

impl Behavior for Warden {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.gate.check(body.meta.health_fraction()) {
            debug!(agent = %body.id, "warden enters phase two");
            ctx.vocal(body.kind());
        }
        self.adds.prune(ctx);
        self.weakpoint.tick(dt);
        if !self.weakpoint.is_open() {
            body.rig.set_emissive(AttachPoint::Weakpoint, 0.0);
        }
        self.call_adds(body, ctx, dt);

        match self.cycle.tick(dt) {
            CycleEvent::Ready => self.choose(body, ctx),
            CycleEvent::Resolve(ability, target) => self.resolve(ability, target, body, ctx),
            CycleEvent::Idle => {}
        }

        if let Some((Ability::Beam, target)) = self.cycle.telegraphing() {
            face_towards(body, target, dt);
            return;
        }
        let speed = body.kind().speed();
        let distance = ctx.player_distance(body.position());
        let desire = if distance > KEEP_MAX {
            ctx.player_direction(body.position()).unwrap_or(Vec3::ZERO)
        } else if distance < KEEP_MIN {
            ctx.player_direction(body.position()).map_or(Vec3::ZERO, |d| -d)
        } else {
            strafe_direction(ctx, body, self.strafe_sign) * 0.5
        };
        let heading = ctx.steer(body, desire);
        let outcome = walk(body, ctx, heading, speed, dt);
        if heading != Vec3::ZERO && outcome.obstructed(heading) {
            self.strafe_sign = -self.strafe_sign;
        }
        face_towards(body, ctx.player.position, dt);
    }

    fn on_removed(&mut self, _body: &AgentBody, _cause: RemovalCause, commands: &mut CommandBuffer) {
        self.adds.release_all(commands);
    }

    fn incoming_damage_scale(&self, _body: &AgentBody, _is_head: bool) -> f32 {
        self.weakpoint.scale()
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.cycle.telegraphing() {
            Some((Ability::Verdict, _)) => ("verdict", 1),
            Some((Ability::Beam, _)) => ("beam_windup", 1),
            None if self.weakpoint.is_open() => ("exposed", 0),
            None => ("judge", 0),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            boss_phase: Some(self.gate.phase()),
            ..BehaviorStatus::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::testing::{body, player_at, run, world};

    #[test]
    fn test_verdict_hits_player_standing_in_mark() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Warden, Vec3::new(0.0, 0.0, -12.0));
        let mut boss = Warden::new(&mut SimRng::new(1));
        boss.cycle = AbilityCycle::new(0.0);
        boss.cycle.begin(Ability::Verdict, 0.5, Vec3::ZERO, COOLDOWN);
        run(&mut world, &player, &mut boss, &mut me, &[], 40);
        assert_eq!(world.commands.player_hits.len(), 1);
        assert_eq!(boss.verdicts_missed(), 0);
        assert_eq!(boss.incoming_damage_scale(&me, false), 1.0);
    }

    #[test]
    fn test_missed_verdict_exposes_weakpoint() {
        let mut world = world();
        let player = player_at(8.0, 0.0);
        let mut me = body(1, AgentKind::Warden, Vec3::new(0.0, 0.0, -12.0));
        let mut boss = Warden::new(&mut SimRng::new(2));
        boss.cycle = AbilityCycle::new(0.0);
        boss.cycle.begin(Ability::Verdict, 0.5, Vec3::ZERO, 10.0);
        run(&mut world, &player, &mut boss, &mut me, &[], 40);
        assert!(world.commands.player_hits.is_empty());
        assert_eq!(boss.verdicts_missed(), 1);
        assert_eq!(boss.incoming_damage_scale(&me, false), EXPOSED_MULTIPLIER);
        assert_eq!(boss.status().phase, "exposed");
    }

    #[test]
    fn test_calls_shooter_adds_up_to_cap() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Warden, Vec3::new(0.0, 0.0, -12.0));
        let mut boss = Warden::new(&mut SimRng::new(3));
        boss.add_timer = 0.0;
        run(&mut world, &player, &mut boss, &mut me, &[], 1);
        let shooters = world
            .commands
            .spawns
            .iter()
            .filter(|s| s.kind == AgentKind::Shooter && s.options.role == SpawnRole::BossAdd)
            .count();
        assert_eq!(shooters, 1);
        assert!(boss.adds.len() <= ADD_CAP);
    }
}
