//! Splitter: a brawler that splits into smaller copies when killed.
//!
//! Copies join the parent's lineage and go through the manager's rate-limited
//! split queue, which enforces the lineage population cap. Descendants that
//! lose track of the player for too long despawn on their own.

use tracing::debug;

use crate::agent::{AgentBody, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::{face_towards, walk};
use crate::bosses::shared::{in_line, in_radius, AbilityCycle, CycleEvent, PhaseGate};
use crate::context::{CommandBuffer, TickContext};
use crate::fx::colors;
use crate::lineage::SplitRequest;
use crate::math::{flat_direction, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;

/// Deepest generation that still splits.
pub const MAX_GENERATION: u8 = 3;
/// Copies spawned per death.
pub const COPIES_PER_SPLIT: usize = 2;
/// Scale factor applied per generation.
pub const SCALE_PER_GENERATION: f32 = 0.7;
/// Health factor applied per generation.
pub const HEALTH_PER_GENERATION: f32 = 0.5;

const STRAY_DISTANCE: f32 = 40.0;
const STRAY_TIME: f32 = 8.0;

const SLAM_WINDUP: f32 = 0.9;
const SLAM_RADIUS: f32 = 3.5;
const SLAM_DAMAGE: f32 = 22.0;

const LUNGE_WINDUP: f32 = 0.7;
const LUNGE_RANGE: f32 = 9.0;
const LUNGE_HALF_WIDTH: f32 = 1.0;
const LUNGE_DAMAGE: f32 = 18.0;

const COOLDOWN: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ability {
    Slam,
    Lunge,
}

/// Self-replicating boss.
#[derive(Debug, Clone)]
pub struct Splitter {
    gate: PhaseGate,
    cycle: AbilityCycle<Ability>,
    stray: f32,
}

impl Splitter {
    /// New splitter.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            gate: PhaseGate::default(),
            cycle: AbilityCycle::new(rng.range(0.8, 1.6)),
            stray: 0.0,
        }
    }

    /// Seconds spent far from the player.
    #[must_use]
    pub fn stray_time(&self) -> f32 {
        self.stray
    }

    /// Copies queued when `body` dies.
    #[must_use]
    pub fn split_requests(body: &AgentBody) -> Vec<SplitRequest> {
        let Some(tag) = body.lineage else {
            return Vec::new();
        };
        if tag.generation >= MAX_GENERATION {
            return Vec::new();
        }
        let generation = tag.generation + 1;
        let exponent = i32::from(generation);
        (0..COPIES_PER_SPLIT)
            .map(|_| SplitRequest {
                lineage: tag.lineage,
                generation,
                position: body.position(),
                scale: SCALE_PER_GENERATION.powi(exponent),
                health_scale: HEALTH_PER_GENERATION.powi(exponent),
            })
            .collect()
    }

    fn resolve(&mut self, ability: Ability, target: Vec3, body: &mut AgentBody, ctx: &mut TickContext<'_>) {
        body.rig.set_emissive(AttachPoint::LeftArm, 0.0);
        body.rig.set_emissive(AttachPoint::RightArm, 0.0);
        let reach = body.scale.max(0.3);
        match ability {
            Ability::Slam => {
                let radius = SLAM_RADIUS * reach;
                ctx.ground_slam(body.position(), radius);
                if in_radius(body.position(), radius, ctx.player) {
                    let push = ctx.knockback_from(body.position(), 6.0);
                    ctx.hit_player(body, SLAM_DAMAGE, push);
                }
            }
            Ability::Lunge => {
                let Some(direction) = flat_direction(body.position(), target) else {
                    return;
                };
                let start = body.position();
                let length = LUNGE_RANGE * reach;
                ctx.move_body(body, direction * length * 0.5);
                if in_line(start, direction, length, LUNGE_HALF_WIDTH * reach, ctx.player) {
                    ctx.hit_player(body, LUNGE_DAMAGE, direction * 4.0);
                }
            }
        }
    }
}

impl Behavior for Splitter {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if self.gate.check(body.meta.health_fraction()) {
            debug!(agent = %body.id, "splitter enters phase two");
            ctx.vocal(body.kind());
        }
        let distance = ctx.player_distance(body.position());
        let descendant = body.lineage.is_some_and(|tag| tag.generation > 0);
        if descendant && distance > STRAY_DISTANCE {
            self.stray += dt;
        } else {
            self.stray = 0.0;
        }

        let reach = body.scale.max(0.3);
        match self.cycle.tick(dt) {
            CycleEvent::Ready => {
                let cooldown = if self.gate.phase_two() { COOLDOWN * 0.7 } else { COOLDOWN };
                if distance <= SLAM_RADIUS * reach {
                    self.cycle.begin(Ability::Slam, SLAM_WINDUP, body.position(), cooldown);
                    ctx.ring(body.position(), SLAM_RADIUS * reach, colors::DANGER);
                    body.rig.set_emissive(AttachPoint::LeftArm, 2.0);
                } else if distance <= LUNGE_RANGE * reach && ctx.sees_player(body) {
                    self.cycle
                        .begin(Ability::Lunge, LUNGE_WINDUP, ctx.player.position, cooldown);
                    body.rig.set_emissive(AttachPoint::RightArm, 2.0);
                }
            }
            CycleEvent::Resolve(ability, target) => self.resolve(ability, target, body, ctx),
            CycleEvent::Idle => {}
        }

        if self.cycle.telegraphing().is_some() {
            face_towards(body, ctx.player.position, dt);
            return;
        }
        if distance > 2.0 * reach {
            let speed = if self.gate.phase_two() {
                body.kind().speed() * 1.2
            } else {
                body.kind().speed()
            };
            let heading = ctx.steer_towards(body, ctx.player.position);
            walk(body, ctx, heading, speed, dt);
        } else {
            face_towards(body, ctx.player.position, dt);
        }
    }

    fn on_removed(&mut self, body: &AgentBody, cause: RemovalCause, commands: &mut CommandBuffer) {
        if cause != RemovalCause::Killed {
            return;
        }
        let copies = Self::split_requests(body);
        if !copies.is_empty() {
            debug!(agent = %body.id, copies = copies.len(), "splitter split");
        }
        commands.splits.extend(copies);
    }

    fn should_remove(&self, _body: &AgentBody) -> bool {
        self.stray >= STRAY_TIME
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.cycle.telegraphing() {
            Some((Ability::Slam, _)) => ("slam_windup", 1),
            Some((Ability::Lunge, _)) => ("lunge_windup", 1),
            None => ("pursue", 0),
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
    use crate::agent::{AgentKind, LineageTag};
    use crate::behaviors::testing::{body, player_at, run, world};
    use crate::lineage::LineageId;

    fn tagged(generation: u8, z: f32) -> AgentBody {
        let mut me = body(1, AgentKind::Splitter, Vec3::new(0.0, 0.0, z));
        me.lineage = Some(LineageTag {
            lineage: LineageId(7),
            generation,
        });
        me
    }

    #[test]
    fn test_killed_root_queues_two_smaller_copies() {
        let me = tagged(0, -5.0);
        let mut boss = Splitter::new(&mut SimRng::new(1));
        let mut commands = CommandBuffer::default();
        boss.on_removed(&me, RemovalCause::Killed, &mut commands);
        assert_eq!(commands.splits.len(), COPIES_PER_SPLIT);
        for copy in &commands.splits {
            assert_eq!(copy.generation, 1);
            assert_eq!(copy.lineage, LineageId(7));
            assert!((copy.scale - 0.7).abs() < 1e-6);
            assert!((copy.health_scale - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_last_generation_does_not_split() {
        let me = tagged(MAX_GENERATION, -5.0);
        let mut boss = Splitter::new(&mut SimRng::new(2));
        let mut commands = CommandBuffer::default();
        boss.on_removed(&me, RemovalCause::Killed, &mut commands);
        assert!(commands.splits.is_empty());
    }

    #[test]
    fn test_released_splitter_does_not_split() {
        let me = tagged(0, -5.0);
        let mut boss = Splitter::new(&mut SimRng::new(3));
        let mut commands = CommandBuffer::default();
        boss.on_removed(&me, RemovalCause::Released, &mut commands);
        assert!(commands.splits.is_empty());
    }

    #[test]
    fn test_stray_descendant_despawns() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = tagged(1, -200.0);
        let mut boss = Splitter::new(&mut SimRng::new(4));
        run(&mut world, &player, &mut boss, &mut me, &[], 60 * 9);
        assert!(boss.should_remove(&me));
    }

    #[test]
    fn test_root_never_strays() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = tagged(0, -200.0);
        let mut boss = Splitter::new(&mut SimRng::new(5));
        run(&mut world, &player, &mut boss, &mut me, &[], 60 * 9);
        assert!(!boss.should_remove(&me));
        assert_eq!(boss.stray_time(), 0.0);
    }
}
