//! Burrower: relocates underground and erupts next to the player.
//!
//! While hidden it cannot be damaged. On the surface it throws spine volleys
//! along a line. Phase two leaves an acid puddle where it dives.

use tracing::debug;

use crate::agent::{AgentBody, AgentKind, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::{face_towards, walk};
use crate::bosses::shared::{
    in_line, in_radius, AbilityCycle, BurrowCycle, BurrowEvent, BurrowPhase, CycleEvent, OwnedAdds,
    PhaseGate,
};
use crate::context::{CommandBuffer, TickContext};
use crate::fx::colors;
use crate::math::{flat_direction, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;
use crate::spawn::{ring_point, SpawnOptions, SpawnRole};

const SINK_TIME: f32 = 0.8;
const HIDDEN_TIME: f32 = 1.2;
const RISE_TIME: f32 = 0.6;
const BURROW_INTERVAL: f32 = 7.0;
const BURROW_INTERVAL_ENRAGED: f32 = 5.0;
const FAR_TRIGGER: f32 = 14.0;
const EMERGE_RING: (f32, f32) = (2.5, 3.5);
const ERUPTION_RADIUS: f32 = 4.0;
const ERUPTION_DAMAGE: f32 = 28.0;
const ERUPTION_KNOCKBACK: f32 = 8.0;

const SPINE_WINDUP: f32 = 0.9;
const SPINE_LENGTH: f32 = 12.0;
const SPINE_HALF_WIDTH: f32 = 0.8;
const SPINE_DAMAGE: f32 = 18.0;
const SPINE_COOLDOWN: f32 = 2.0;

/// Burrowing boss.
#[derive(Debug, Clone)]
pub struct Burrower {
    gate: PhaseGate,
    burrow: BurrowCycle,
    burrow_timer: f32,
    spines: AbilityCycle<()>,
    puddles: OwnedAdds,
    eruptions: u32,
}

impl Burrower {
    /// New burrower.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            gate: PhaseGate::default(),
            burrow: BurrowCycle::new(SINK_TIME, HIDDEN_TIME, RISE_TIME),
            burrow_timer: rng.range(3.0, BURROW_INTERVAL),
            spines: AbilityCycle::new(rng.range(1.0, 2.0)),
            puddles: OwnedAdds::new(5),
            eruptions: 0,
        }
    }

    /// Whether underground right now.
    #[must_use]
    pub fn hidden(&self) -> bool {
        self.burrow.is_hidden()
    }

    /// Eruptions performed.
    #[must_use]
    pub fn eruptions(&self) -> u32 {
        self.eruptions
    }

    fn emerge_point(ctx: &mut TickContext<'_>) -> Vec3 {
        let radius = ctx.rng.range(EMERGE_RING.0, EMERGE_RING.1);
        let angle = ctx.rng.angle();
        ring_point(ctx.player.position, radius, angle)
    }

    fn run_burrow(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        match self.burrow.tick(dt) {
            BurrowEvent::Submerged => {
                body.rig.root.visible = false;
                if self.gate.phase_two() {
                    let mut at = body.position();
                    at.y = body.feet();
                    self.puddles.try_spawn(
                        ctx,
                        body.id,
                        AgentKind::AcidPuddle,
                        SpawnRole::Hazard,
                        at,
                        SpawnOptions::default(),
                    );
                }
            }
            BurrowEvent::Emerge => {
                let point = Self::emerge_point(ctx);
                let ground = ctx.ground_height(point.x, point.z);
                body.transform.position = Vec3::new(point.x, ground + body.shape.half_height, point.z);
                body.rig.root.visible = true;
                ctx.ring(Vec3::new(point.x, ground, point.z), ERUPTION_RADIUS, colors::DANGER);
            }
            BurrowEvent::Surfaced => {
                self.eruptions += 1;
                ctx.ground_slam(body.position(), ERUPTION_RADIUS);
                if in_radius(body.position(), ERUPTION_RADIUS, ctx.player) {
                    let push = ctx.knockback_from(body.position(), ERUPTION_KNOCKBACK);
                    ctx.hit_player(body, ERUPTION_DAMAGE, push);
                }
                self.burrow_timer = if self.gate.phase_two() {
                    BURROW_INTERVAL_ENRAGED
                } else {
                    BURROW_INTERVAL
                };
            }
            BurrowEvent::None => {}
        }
        let depth = self.burrow.depth();
        body.rig.root.scale = body.scale * (1.0 - depth * 0.8);
    }
}

impl Behavior for Burrower {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.gate.check(body.meta.health_fraction()) {
            debug!(agent = %body.id, "burrower enters phase two");
            ctx.vocal(body.kind());
        }
        self.puddles.prune(ctx);

        if self.burrow.is_active() {
            self.run_burrow(body, ctx, dt);
            return;
        }

        self.burrow_timer -= dt;
        let far = ctx.player_distance(body.position()) > FAR_TRIGGER;
        if (self.burrow_timer <= 0.0 || far) && self.spines.telegraphing().is_none() {
            self.burrow.start();
            ctx.vocal(body.kind());
            return;
        }

        match self.spines.tick(dt) {
            CycleEvent::Ready => {
                if ctx.sees_player(body) {
                    self.spines
                        .begin((), SPINE_WINDUP, ctx.player.position, SPINE_COOLDOWN);
                    body.rig.set_emissive(AttachPoint::Jaw, 2.0);
                }
            }
            CycleEvent::Resolve((), target) => {
                body.rig.set_emissive(AttachPoint::Jaw, 0.0);
                if let Some(direction) = flat_direction(body.position(), target) {
                    if in_line(body.position(), direction, SPINE_LENGTH, SPINE_HALF_WIDTH, ctx.player) {
                        ctx.hit_player(body, SPINE_DAMAGE, direction * 3.0);
                    }
                }
            }
            CycleEvent::Idle => {}
        }

        if self.spines.telegraphing().is_some() {
            face_towards(body, ctx.player.position, dt);
        } else if ctx.player_distance(body.position()) > 4.0 {
            let heading = ctx.steer_towards(body, ctx.player.position);
            walk(body, ctx, heading, body.kind().speed(), dt);
        }
    }

    fn on_removed(&mut self, _body: &AgentBody, _cause: RemovalCause, commands: &mut CommandBuffer) {
        self.puddles.release_all(commands);
    }

    fn incoming_damage_scale(&self, _body: &AgentBody, _is_head: bool) -> f32 {
        if self.burrow.is_hidden() {
            0.0
        } else {
            1.0
        }
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.burrow.phase() {
            BurrowPhase::Sinking(_) => ("sinking", 0),
            BurrowPhase::Hidden(_) => ("hidden", 0),
            BurrowPhase::Rising(_) => ("rising", 1),
            BurrowPhase::Surface if self.spines.telegraphing().is_some() => ("spine_windup", 1),
            BurrowPhase::Surface => ("hunt", 0),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            invulnerable: self.burrow.is_hidden(),
            boss_phase: Some(self.gate.phase()),
            ..BehaviorStatus::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::testing::{body, player_at, run, world};
    use crate::math::flat_distance;

    #[test]
    fn test_burrow_relocates_near_player_and_erupts() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Burrower, Vec3::new(0.0, 0.0, -20.0));
        let mut boss = Burrower::new(&mut SimRng::new(1));
        let mut saw_hidden = false;
        for _ in 0..(60 * 3) {
            run(&mut world, &player, &mut boss, &mut me, &[], 1);
            if boss.hidden() {
                saw_hidden = true;
                assert_eq!(boss.incoming_damage_scale(&me, true), 0.0);
                assert!(boss.status().invulnerable);
            }
        }
        assert!(saw_hidden);
        assert_eq!(boss.eruptions(), 1);
        assert!(flat_distance(me.position(), player.position) <= EMERGE_RING.1 + 1.0);
        assert!(!world.commands.player_hits.is_empty());
    }

    #[test]
    fn test_phase_two_leaves_puddle() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Burrower, Vec3::new(0.0, 0.0, -20.0));
        me.meta.current_health = me.meta.max_health * 0.4;
        let mut boss = Burrower::new(&mut SimRng::new(2));
        run(&mut world, &player, &mut boss, &mut me, &[], 60);
        assert!(world
            .commands
            .spawns
            .iter()
            .any(|s| s.kind == AgentKind::AcidPuddle && s.options.role == SpawnRole::Hazard));
    }
}
