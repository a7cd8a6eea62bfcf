//! Lightweight timed entities registered alongside combatants.

use crate::agent::{AgentBody, AgentId, AgentKind, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::tick_down;
use crate::context::TickContext;
use crate::fx::colors;
use crate::math::{flat_distance, Vec3};
use crate::rig::AttachPoint;
use crate::spawn::{SpawnOptions, SpawnRole};

/// Default puddle lifetime in seconds.
pub const PUDDLE_LIFETIME: f32 = 6.0;
/// Puddle damage radius.
pub const PUDDLE_RADIUS: f32 = 2.2;
const PUDDLE_TICK: f32 = 0.5;
const PUDDLE_DAMAGE: f32 = 3.0;

/// Default incubation time of a brood pod.
pub const POD_INCUBATION: f32 = 6.0;
const POD_HATCH_MIN: u32 = 2;
const POD_HATCH_MAX: u32 = 3;

/// Area-denial acid pool. Damages the player standing in it on a fixed
/// tick and expires on its own. Cannot be damaged.
#[derive(Debug, Clone)]
pub struct AcidPuddle {
    remaining: f32,
    tick: f32,
}

impl AcidPuddle {
    /// New puddle, `lifetime` overriding the default.
    #[must_use]
    pub fn new(lifetime: Option<f32>) -> Self {
        Self {
            remaining: lifetime.unwrap_or(PUDDLE_LIFETIME),
            tick: 0.0,
        }
    }

    /// Seconds left.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }
}

impl Behavior for AcidPuddle {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        self.remaining -= dt;
        let inside = flat_distance(body.position(), ctx.player.position) <= PUDDLE_RADIUS
            && ctx.player.feet() <= body.position().y + 0.5;
        if inside {
            if tick_down(&mut self.tick, dt) {
                ctx.hit_player(body, PUDDLE_DAMAGE, Vec3::ZERO);
                self.tick = PUDDLE_TICK;
            }
        } else {
            self.tick = 0.0;
        }
        let fade = self.remaining.clamp(0.0, 1.0);
        body.rig.set_emissive(AttachPoint::Core, fade);
    }

    fn incoming_damage_scale(&self, _body: &AgentBody, _is_head: bool) -> f32 {
        0.0
    }

    fn should_remove(&self, _body: &AgentBody) -> bool {
        self.remaining <= 0.0
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus {
            invulnerable: true,
            ..BehaviorStatus::phase("burning")
        }
    }
}

/// Destructible egg laid by a boss. Hatches rushers when its incubation
/// runs out, unless destroyed first.
#[derive(Debug, Clone)]
pub struct BroodPod {
    owner: Option<AgentId>,
    incubation: f32,
    hatched: bool,
}

impl BroodPod {
    /// New pod.
    #[must_use]
    pub fn new(owner: Option<AgentId>, incubation: Option<f32>) -> Self {
        Self {
            owner,
            incubation: incubation.unwrap_or(POD_INCUBATION),
            hatched: false,
        }
    }

    /// Whether the pod has hatched.
    #[must_use]
    pub fn hatched(&self) -> bool {
        self.hatched
    }
}

impl Behavior for BroodPod {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.hatched {
            return;
        }
        body.rig.set_emissive(AttachPoint::Core, 1.0 + (ctx.time * 5.0).sin().abs());
        if !tick_down(&mut self.incubation, dt) {
            return;
        }
        self.hatched = true;
        let count = ctx.rng.range_inclusive(POD_HATCH_MIN, POD_HATCH_MAX);
        for _ in 0..count {
            let offset = Vec3::new(ctx.rng.range(-1.0, 1.0), 0.0, ctx.rng.range(-1.0, 1.0));
            let mut options = SpawnOptions::role(SpawnRole::BossAdd);
            options.owner = self.owner;
            options.counts_toward_wave = Some(false);
            let at = Vec3::new(body.position().x, body.feet(), body.position().z) + offset;
            if ctx.spawn(AgentKind::Rusher, at, options).is_none() {
                break;
            }
        }
        ctx.vocal(body.kind());
    }

    fn should_remove(&self, _body: &AgentBody) -> bool {
        self.hatched
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus::phase(if self.hatched { "hatched" } else { "incubating" })
    }
}

/// Stationary node that keeps its owner shielded while alive.
#[derive(Debug, Clone)]
pub struct ShieldNode {
    owner: Option<AgentId>,
    pulse: f32,
}

impl ShieldNode {
    /// New node linked to `owner`.
    #[must_use]
    pub fn new(owner: Option<AgentId>) -> Self {
        Self { owner, pulse: 0.0 }
    }

    /// Linked boss.
    #[must_use]
    pub fn owner(&self) -> Option<AgentId> {
        self.owner
    }
}

impl Behavior for ShieldNode {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        self.pulse += dt;
        body.rig.set_emissive(AttachPoint::Core, 1.5 + (self.pulse * 3.0).sin());
        // Orphaned nodes fizzle out
        if let Some(owner) = self.owner {
            if !ctx.is_alive(owner) {
                self.owner = None;
                ctx.remove(body.id, RemovalCause::Released);
            }
        }
        if self.pulse >= 2.0 {
            self.pulse = 0.0;
            ctx.ring(body.position(), 1.5, colors::WARNING);
        }
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus::phase("shielding")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::testing::{body, player_at, run, world};

    #[test]
    fn test_puddle_ticks_damage_and_expires() {
        let mut world = world();
        let player = player_at(0.5, 0.0);
        let mut me = body(1, AgentKind::AcidPuddle, Vec3::ZERO);
        let mut puddle = AcidPuddle::new(Some(1.2));
        run(&mut world, &player, &mut puddle, &mut me, &[], 60);
        // Immediately, then every half second
        assert_eq!(world.commands.player_hits.len(), 2);
        assert!(!puddle.should_remove(&me));
        run(&mut world, &player, &mut puddle, &mut me, &[], 13);
        assert!(puddle.should_remove(&me));
        assert_eq!(puddle.incoming_damage_scale(&me, true), 0.0);
    }

    #[test]
    fn test_puddle_ignores_player_outside() {
        let mut world = world();
        let player = player_at(5.0, 0.0);
        let mut me = body(1, AgentKind::AcidPuddle, Vec3::ZERO);
        let mut puddle = AcidPuddle::new(None);
        run(&mut world, &player, &mut puddle, &mut me, &[], 60);
        assert!(world.commands.player_hits.is_empty());
    }

    #[test]
    fn test_pod_hatches_owned_adds() {
        let mut world = world();
        let player = player_at(0.0, 10.0);
        let mut me = body(5, AgentKind::BroodPod, Vec3::ZERO);
        let mut pod = BroodPod::new(Some(AgentId(1)), Some(0.5));
        run(&mut world, &player, &mut pod, &mut me, &[], 40);
        assert!(pod.hatched());
        assert!(pod.should_remove(&me));
        let spawns = &world.commands.spawns;
        assert!((2..=3).contains(&spawns.len()));
        assert!(spawns.iter().all(|s| s.kind == AgentKind::Rusher
            && s.options.owner == Some(AgentId(1))
            && s.options.role == SpawnRole::BossAdd));
    }

    #[test]
    fn test_orphaned_node_is_released() {
        let mut world = world();
        let player = player_at(0.0, 10.0);
        let mut me = body(3, AgentKind::ShieldNode, Vec3::ZERO);
        let mut node = ShieldNode::new(Some(AgentId(99)));
        run(&mut world, &player, &mut node, &mut me, &[], 1);
        assert_eq!(node.owner(), None);
        assert_eq!(world.commands.removals.len(), 1);
    }
}
