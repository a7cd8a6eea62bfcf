//! Broodmother: lays brood pods and spits acid.
//!
//! Every lay exposes her weakpoint for a few seconds. Phase two lays two
//! pods at a time. Her pods are tracked as owned adds with their own cap and
//! are released when she dies.

use tracing::debug;

use crate::agent::{AgentBody, AgentKind, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::hazard::{POD_INCUBATION, PUDDLE_RADIUS};
use crate::behaviors::{face_towards, strafe_direction, walk};
use crate::bosses::shared::{in_cone, AbilityCycle, CycleEvent, OwnedAdds, PhaseGate, WeakpointWindow};
use crate::context::{CommandBuffer, TickContext};
use crate::fx::colors;
use crate::math::{rotate_y, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;
use crate::spawn::{SpawnOptions, SpawnRole};

const POD_CAP: usize = 6;
const LAY_WINDUP: f32 = 1.2;
const WEAKPOINT_TIME: f32 = 3.0;
const WEAKPOINT_MULTIPLIER: f32 = 2.0;
const SPIT_WINDUP: f32 = 0.8;
const SPIT_RANGE: f32 = 16.0;
const BITE_WINDUP: f32 = 0.6;
const BITE_RANGE: f32 = 3.5;
const BITE_DAMAGE: f32 = 24.0;
const COOLDOWN: f32 = 2.2;
const KEEP_MIN: f32 = 7.0;
const KEEP_MAX: f32 = 13.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ability {
    Lay,
    Spit,
    Bite,
}

/// Egg-laying boss.
#[derive(Debug, Clone)]
pub struct Broodmother {
    gate: PhaseGate,
    cycle: AbilityCycle<Ability>,
    weakpoint: WeakpointWindow,
    pods: OwnedAdds,
    puddles: OwnedAdds,
    strafe_sign: f32,
    lays: u32,
}

impl Broodmother {
    /// New broodmother.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            gate: PhaseGate::default(),
            cycle: AbilityCycle::new(rng.range(1.0, 2.0)),
            weakpoint: WeakpointWindow::default(),
            pods: OwnedAdds::new(POD_CAP),
            puddles: OwnedAdds::new(4),
            strafe_sign: rng.sign(),
            lays: 0,
        }
    }

    /// Completed lay cycles.
    #[must_use]
    pub fn lays(&self) -> u32 {
        self.lays
    }

    /// Whether the weakpoint is exposed.
    #[must_use]
    pub fn exposed(&self) -> bool {
        self.weakpoint.is_open()
    }

    fn choose(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        let distance = ctx.player_distance(body.position());
        let target = ctx.player.position;
        if distance <= BITE_RANGE {
            self.cycle.begin(Ability::Bite, BITE_WINDUP, target, COOLDOWN * 0.6);
            body.rig.set_emissive(AttachPoint::Jaw, 2.0);
        } else if self.pods.has_room() && ctx.rng.chance(0.5) {
            self.cycle.begin(Ability::Lay, LAY_WINDUP, body.position(), COOLDOWN);
            body.rig.set_emissive(AttachPoint::Core, 2.0);
        } else if distance <= SPIT_RANGE && ctx.sees_player(body) {
            let mut landing = target;
            landing.y = ctx.ground_height(target.x, target.z);
            self.cycle.begin(Ability::Spit, SPIT_WINDUP, landing, COOLDOWN);
            ctx.ring(landing, PUDDLE_RADIUS, colors::WARNING);
        } else {
            self.cycle.begin(Ability::Lay, LAY_WINDUP, body.position(), COOLDOWN);
        }
    }

    fn resolve(&mut self, ability: Ability, target: Vec3, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        body.rig.set_emissive(AttachPoint::Jaw, 0.0);
        body.rig.set_emissive(AttachPoint::Core, 0.0);
        match ability {
            Ability::Lay => {
                let count = if self.gate.phase_two() { 2 } else { 1 };
                let behind = -body.transform.forward();
                for i in 0..count {
                    let spread = if i == 0 { -0.4 } else { 0.4 };
                    let mut at = body.position() + rotate_y(behind, spread) * 2.0;
                    at.y = ctx.ground_height(at.x, at.z);
                    let options = SpawnOptions {
                        lifetime: Some(POD_INCUBATION),
                        ..SpawnOptions::default()
                    };
                    self.pods
                        .try_spawn(ctx, body.id, AgentKind::BroodPod, SpawnRole::BossAdd, at, options);
                }
                self.weakpoint.open(WEAKPOINT_TIME, WEAKPOINT_MULTIPLIER);
                body.rig.set_emissive(AttachPoint::Weakpoint, 3.0);
                self.lays += 1;
                debug!(agent = %body.id, pods = self.pods.len(), "broodmother laid");
            }
            Ability::Spit => {
                self.puddles.try_spawn(
                    ctx,
                    body.id,
                    AgentKind::AcidPuddle,
                    SpawnRole::Hazard,
                    target,
                    SpawnOptions::default(),
                );
            }
            Ability::Bite => {
                if in_cone(body.position(), body.transform.forward(), 0.8, BITE_RANGE, ctx.player) {
                    let push = ctx.knockback_from(body.position(), 5.0);
                    ctx.hit_player(body, BITE_DAMAGE, push);
                }
            }
        }
    }

    fn reposition(&mut self, body: &mut AgentBody, ctx: &TickContext<'_>, dt: f32) {
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
}

impl Behavior for Broodmother {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.gate.check(body.meta.health_fraction()) {
            debug!(agent = %body.id, "broodmother enters phase two");
            ctx.vocal(body.kind());
        }
        self.pods.prune(ctx);
        self.puddles.prune(ctx);
        self.weakpoint.tick(dt);
        if !self.weakpoint.is_open() {
            body.rig.set_emissive(AttachPoint::Weakpoint, 0.0);
        }

        match self.cycle.tick(dt) {
            CycleEvent::Ready => self.choose(body, ctx),
            CycleEvent::Resolve(ability, target) => self.resolve(ability, target, body, ctx),
            CycleEvent::Idle => {}
        }
        match self.cycle.telegraphing() {
            Some((Ability::Lay, _)) => {}
            Some(_) => face_towards(body, ctx.player.position, dt),
            None => self.reposition(body, ctx, dt),
        }
    }

    fn on_removed(&mut self, _body: &AgentBody, _cause: RemovalCause, commands: &mut CommandBuffer) {
        self.pods.release_all(commands);
    }

    fn incoming_damage_scale(&self, _body: &AgentBody, _is_head: bool) -> f32 {
        self.weakpoint.scale()
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.cycle.telegraphing() {
            Some((Ability::Lay, _)) => ("laying", 1),
            Some((Ability::Spit, _)) => ("spit_windup", 1),
            Some((Ability::Bite, _)) => ("bite_windup", 1),
            None => ("prowl", 0),
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
    use crate::agent::AgentId;
    use crate::behaviors::testing::{body, player_at, run, world};

    #[test]
    fn test_lay_opens_weakpoint_and_spawns_pods() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Broodmother, Vec3::new(0.0, 0.0, -10.0));
        let mut boss = Broodmother::new(&mut SimRng::new(1));
        boss.cycle = AbilityCycle::new(0.0);
        run(&mut world, &player, &mut boss, &mut me, &[], 1);
        // Force a lay regardless of the roll
        boss.cycle = AbilityCycle::new(0.0);
        boss.cycle.begin(Ability::Lay, 0.1, me.position(), COOLDOWN);
        run(&mut world, &player, &mut boss, &mut me, &[], 10);
        assert!(boss.lays() >= 1);
        assert!(boss.exposed());
        assert_eq!(boss.incoming_damage_scale(&me, false), WEAKPOINT_MULTIPLIER);
        assert!(world
            .commands
            .spawns
            .iter()
            .any(|s| s.kind == AgentKind::BroodPod && s.options.owner == Some(AgentId(1))));
    }

    #[test]
    fn test_phase_two_lays_two_pods() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Broodmother, Vec3::new(0.0, 0.0, -10.0));
        me.meta.current_health = me.meta.max_health * 0.5;
        let mut boss = Broodmother::new(&mut SimRng::new(2));
        boss.cycle = AbilityCycle::new(0.0);
        boss.cycle.begin(Ability::Lay, 0.0, me.position(), 10.0);
        run(&mut world, &player, &mut boss, &mut me, &[], 1);
        let pods = world.commands.spawns.iter().filter(|s| s.kind == AgentKind::BroodPod).count();
        assert_eq!(pods, 2);
    }

    #[test]
    fn test_removal_releases_pods() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Broodmother, Vec3::new(0.0, 0.0, -10.0));
        let mut boss = Broodmother::new(&mut SimRng::new(3));
        boss.cycle = AbilityCycle::new(0.0);
        boss.cycle.begin(Ability::Lay, 0.0, me.position(), 10.0);
        run(&mut world, &player, &mut boss, &mut me, &[], 1);
        let mut commands = CommandBuffer::default();
        boss.on_removed(&me, RemovalCause::Killed, &mut commands);
        assert_eq!(commands.removals.len(), 1);
    }
}
