//! Melee brawler and its heavy (tank) variant.
//!
//! A brawler owns a small table of attacks. At most one attack runs at a
//! time (`current` is a single slot), and the active window lands at most
//! one hit per swing. Attack choice is weighted random among the attacks
//! whose reach the projected closing distance will meet before the windup
//! ends, so retreating targets still get swung at.

use crate::agent::{AgentBody, Behavior, BehaviorStatus};
use crate::behaviors::{face_towards, player_in_arc, strafe_direction, walk};
use crate::context::TickContext;
use crate::fx::colors;
use crate::math::Vec3;
use crate::rng::SimRng;

/// Movement speed multiplier while winding up.
const WINDUP_MOVE_FACTOR: f32 = 0.5;

/// One entry of an attack table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackDef {
    /// Label used in status output.
    pub name: &'static str,
    /// Telegraph seconds.
    pub windup: f32,
    /// Seconds during which contact deals damage.
    pub active: f32,
    /// Seconds before the next action.
    pub recover: f32,
    /// Base damage.
    pub damage: f32,
    /// Reach from the body centre.
    pub reach: f32,
    /// Knockback strength.
    pub knockback: f32,
    /// Half-angle of the hit arc, radians.
    pub half_arc: f32,
    /// Selection weight.
    pub weight: f32,
}

/// Area slam for heavy brawlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlamDef {
    /// Telegraph seconds.
    pub windup: f32,
    /// Seconds before the next action.
    pub recover: f32,
    /// Seconds between slams.
    pub cooldown: f32,
    /// Hit radius around the body.
    pub radius: f32,
    /// Base damage.
    pub damage: f32,
    /// Knockback strength.
    pub knockback: f32,
    /// Free space required above the head.
    pub overhead_clearance: f32,
}

/// Which attack is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackSource {
    /// Index into the attack table.
    Table(usize),
    /// The heavy slam.
    Slam,
}

/// Phase of the running attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingPhase {
    /// Telegraph.
    Windup,
    /// Damage window.
    Active,
    /// Follow-through.
    Recover,
}

/// The single running attack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    /// Which attack.
    pub source: AttackSource,
    /// Phase.
    pub phase: SwingPhase,
    /// Seconds left in the phase.
    pub timer: f32,
    /// The active window already landed its hit.
    pub did_hit_this_swing: bool,
}

/// Melee brawler.
#[derive(Debug, Clone)]
pub struct MeleeBrawler {
    attacks: Vec<AttackDef>,
    slam: Option<SlamDef>,
    slam_cooldown: f32,
    current: Option<Swing>,
    rest: f32,
    strafe_sign: f32,
    strafe_timer: f32,
    hits_landed: u32,
}

impl MeleeBrawler {
    /// Build from an attack table and optional slam.
    #[must_use]
    pub fn new(attacks: Vec<AttackDef>, slam: Option<SlamDef>, rng: &mut SimRng) -> Self {
        Self {
            attacks,
            slam,
            slam_cooldown: slam.map_or(0.0, |s| s.cooldown * 0.5),
            current: None,
            rest: rng.range(0.2, 0.6),
            strafe_sign: rng.sign(),
            strafe_timer: rng.range(1.0, 2.5),
            hits_landed: 0,
        }
    }

    /// Standard brawler: jab, hook and overhead.
    #[must_use]
    pub fn brawler(rng: &mut SimRng) -> Self {
        Self::new(
            vec![
                AttackDef {
                    name: "jab",
                    windup: 0.35,
                    active: 0.12,
                    recover: 0.35,
                    damage: 8.0,
                    reach: 1.6,
                    knockback: 1.5,
                    half_arc: 0.7,
                    weight: 3.0,
                },
                AttackDef {
                    name: "hook",
                    windup: 0.5,
                    active: 0.15,
                    recover: 0.5,
                    damage: 12.0,
                    reach: 1.8,
                    knockback: 3.0,
                    half_arc: 1.1,
                    weight: 2.0,
                },
                AttackDef {
                    name: "overhead",
                    windup: 0.8,
                    active: 0.15,
                    recover: 0.7,
                    damage: 18.0,
                    reach: 2.0,
                    knockback: 4.0,
                    half_arc: 0.5,
                    weight: 1.0,
                },
            ],
            None,
            rng,
        )
    }

    /// Heavy brawler with a slam.
    #[must_use]
    pub fn tank(rng: &mut SimRng) -> Self {
        Self::new(
            vec![
                AttackDef {
                    name: "swipe",
                    windup: 0.6,
                    active: 0.2,
                    recover: 0.6,
                    damage: 16.0,
                    reach: 2.4,
                    knockback: 5.0,
                    half_arc: 1.2,
                    weight: 2.0,
                },
                AttackDef {
                    name: "crush",
                    windup: 1.0,
                    active: 0.2,
                    recover: 0.9,
                    damage: 28.0,
                    reach: 2.2,
                    knockback: 7.0,
                    half_arc: 0.6,
                    weight: 1.0,
                },
            ],
            Some(SlamDef {
                windup: 0.9,
                recover: 1.0,
                cooldown: 6.0,
                radius: 4.0,
                damage: 22.0,
                knockback: 9.0,
                overhead_clearance: 1.5,
            }),
            rng,
        )
    }

    /// The running attack, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Swing> {
        self.current.as_ref()
    }

    /// Hits landed over the agent's life.
    #[must_use]
    pub fn hits_landed(&self) -> u32 {
        self.hits_landed
    }

    /// Attacks whose reach the projected distance will meet by the end of
    /// their windup.
    fn reachable(&self, distance: f32, radial_speed: f32, speed: f32) -> Vec<f32> {
        self.attacks
            .iter()
            .map(|a| {
                let projected = distance + (radial_speed - speed * WINDUP_MOVE_FACTOR) * a.windup;
                if projected <= a.reach {
                    a.weight
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn slam_ready(&self, body: &AgentBody, ctx: &TickContext<'_>, distance: f32) -> bool {
        let Some(slam) = self.slam else {
            return false;
        };
        if self.slam_cooldown > 0.0 || distance > slam.radius * 0.85 {
            return false;
        }
        if !ctx.sees_player(body) {
            return false;
        }
        let head = body.position() + Vec3::Y * body.shape.half_height;
        ctx.colliders
            .raycast(head, Vec3::Y, slam.overhead_clearance)
            .is_none()
    }

    fn begin(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, source: AttackSource) {
        let windup = match source {
            AttackSource::Table(i) => self.attacks[i].windup,
            AttackSource::Slam => {
                let slam = self.slam.map_or(0.0, |s| s.windup);
                if let Some(s) = self.slam {
                    ctx.ring(body.position(), s.radius, colors::DANGER);
                }
                slam
            }
        };
        body.rig.head.emissive = 1.5;
        self.current = Some(Swing {
            source,
            phase: SwingPhase::Windup,
            timer: windup,
            did_hit_this_swing: false,
        });
    }

    fn advance(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        let Some(mut swing) = self.current else {
            return;
        };
        swing.timer -= dt;

        match swing.phase {
            SwingPhase::Windup => {
                face_towards(body, ctx.player.position, dt);
                if let AttackSource::Table(i) = swing.source {
                    let attack = self.attacks[i];
                    if ctx.player_distance(body.position()) > attack.reach * 0.9 {
                        let heading = ctx.steer_towards(body, ctx.player.position);
                        walk(body, ctx, heading, body.kind().speed() * WINDUP_MOVE_FACTOR, dt);
                    }
                }
                if swing.timer <= 0.0 {
                    body.rig.head.emissive = 0.0;
                    swing.phase = SwingPhase::Active;
                    swing.timer = match swing.source {
                        AttackSource::Table(i) => self.attacks[i].active,
                        AttackSource::Slam => 0.1,
                    };
                    if swing.source == AttackSource::Slam {
                        if let Some(slam) = self.slam {
                            ctx.ground_slam(body.position(), slam.radius);
                        }
                    }
                }
            }
            SwingPhase::Active => {
                if !swing.did_hit_this_swing && self.contact(body, ctx, swing.source) {
                    swing.did_hit_this_swing = true;
                    self.hits_landed += 1;
                }
                if swing.timer <= 0.0 {
                    swing.phase = SwingPhase::Recover;
                    swing.timer = match swing.source {
                        AttackSource::Table(i) => self.attacks[i].recover,
                        AttackSource::Slam => self.slam.map_or(0.0, |s| s.recover),
                    };
                }
            }
            SwingPhase::Recover => {
                if swing.timer <= 0.0 {
                    if swing.source == AttackSource::Slam {
                        self.slam_cooldown = self.slam.map_or(0.0, |s| s.cooldown);
                    }
                    self.current = None;
                    self.rest = ctx.rng.range(0.15, 0.5);
                    return;
                }
            }
        }
        self.current = Some(swing);
    }

    /// Apply damage if the player is inside the attack's shape.
    fn contact(&self, body: &AgentBody, ctx: &mut TickContext<'_>, source: AttackSource) -> bool {
        let distance = ctx.player_distance(body.position());
        let (hit, damage, knockback) = match source {
            AttackSource::Table(i) => {
                let a = self.attacks[i];
                (
                    distance <= a.reach + ctx.player.radius && player_in_arc(ctx, body, a.half_arc),
                    a.damage,
                    a.knockback,
                )
            }
            AttackSource::Slam => match self.slam {
                Some(s) => (
                    distance <= s.radius && (ctx.player.feet() - body.feet()).abs() < 1.5,
                    s.damage,
                    s.knockback,
                ),
                None => (false, 0.0, 0.0),
            },
        };
        if hit {
            let push = ctx.knockback_from(body.position(), knockback);
            ctx.hit_player(body, damage, push);
        }
        hit
    }

    fn pursue(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        let distance = ctx.player_distance(body.position());
        let mut speed = body.kind().speed();
        if ctx.blackboard.regroup {
            speed *= 1.15;
        }

        self.strafe_timer -= dt;
        if self.strafe_timer <= 0.0 {
            self.strafe_sign = -self.strafe_sign;
            self.strafe_timer = ctx.rng.range(1.0, 2.5);
        }

        let close = self.attacks.iter().map(|a| a.reach).fold(0.0, f32::max) * 0.8;
        if distance > close {
            let mut heading = ctx.steer_towards(body, ctx.player.position);
            if distance < 6.0 {
                heading = (heading + strafe_direction(ctx, body, self.strafe_sign) * 0.25).normalize_or_zero();
            }
            walk(body, ctx, heading, speed, dt);
        } else {
            face_towards(body, ctx.player.position, dt);
        }
    }
}

impl Behavior for MeleeBrawler {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        self.slam_cooldown = (self.slam_cooldown - dt).max(0.0);

        if self.current.is_some() {
            self.advance(body, ctx, dt);
            return;
        }

        self.rest -= dt;
        let distance = ctx.player_distance(body.position());
        if self.rest <= 0.0 {
            if self.slam_ready(body, ctx, distance) {
                self.begin(body, ctx, AttackSource::Slam);
                return;
            }
            let weights = self.reachable(
                distance,
                ctx.player_radial_speed(body.position()),
                body.kind().speed(),
            );
            if let Some(i) = ctx.rng.weighted_index(&weights) {
                self.begin(body, ctx, AttackSource::Table(i));
                return;
            }
        }
        self.pursue(body, ctx, dt);
    }

    fn status(&self) -> BehaviorStatus {
        let phase = match self.current {
            None => "pursue",
            Some(s) => match (s.source, s.phase) {
                (AttackSource::Slam, SwingPhase::Windup) => "slam_windup",
                (AttackSource::Slam, _) => "slam",
                (_, SwingPhase::Windup) => "windup",
                (_, SwingPhase::Active) => "active",
                (_, SwingPhase::Recover) => "recover",
            },
        };
        BehaviorStatus {
            phase,
            active_attacks: u8::from(self.current.is_some()),
            ..BehaviorStatus::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::behaviors::testing::{body, player_at, run, world};
    use crate::math::Vec3;
    use crate::rng::SimRng;

    #[test]
    fn test_brawler_closes_distance() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Melee, Vec3::new(0.0, 0.0, -12.0));
        let mut brain = MeleeBrawler::brawler(&mut SimRng::new(1));
        run(&mut world, &player, &mut brain, &mut me, &[], 60);
        assert!(me.position().z > -12.0 + 2.0);
    }

    #[test]
    fn test_one_attack_at_a_time_and_one_hit_per_swing() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Melee, Vec3::new(0.0, 0.0, -1.4));
        let mut brain = MeleeBrawler::brawler(&mut SimRng::new(2));
        let mut swings = 0;
        let mut last_phase = None;
        for _ in 0..600 {
            run(&mut world, &player, &mut brain, &mut me, &[], 1);
            assert!(brain.status().active_attacks <= 1);
            let phase = brain.current().map(|s| s.phase);
            if phase == Some(SwingPhase::Active) && last_phase != Some(SwingPhase::Active) {
                swings += 1;
            }
            last_phase = phase;
        }
        assert!(swings >= 2, "expected several swings, got {swings}");
        assert!(world.commands.player_hits.len() <= swings);
        assert_eq!(world.commands.player_hits.len() as u32, brain.hits_landed());
    }

    #[test]
    fn test_predictive_gate_waits_for_retreating_target() {
        let brain = MeleeBrawler::brawler(&mut SimRng::new(3));
        // Player backing off faster than the brawler closes: nothing is reachable
        let weights = brain.reachable(2.2, 6.0, 3.6);
        assert!(weights.iter().all(|w| *w == 0.0));
        // Stationary target slightly out of reach: the gate opens early
        let weights = brain.reachable(2.2, 0.0, 3.6);
        assert!(weights.iter().any(|w| *w > 0.0));
    }

    #[test]
    fn test_tank_slams_in_open_ground() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Tank, Vec3::new(0.0, 0.0, -2.5));
        let mut brain = MeleeBrawler::tank(&mut SimRng::new(4));
        let mut saw_slam = false;
        for _ in 0..600 {
            run(&mut world, &player, &mut brain, &mut me, &[], 1);
            if brain.status().phase.starts_with("slam") {
                saw_slam = true;
            }
        }
        assert!(saw_slam);
    }

    #[test]
    fn test_tank_never_slams_under_low_ceiling() {
        use crate::spatial::{Aabb, ColliderSet};
        let mut world = world();
        world.colliders = ColliderSet::with_boxes(vec![Aabb::block(-3.0, 3.0, -6.0, 0.5, 2.6, 0.5)]);
        let player = player_at(0.0, 3.0);
        let mut me = body(1, AgentKind::Tank, Vec3::new(0.0, 0.0, -1.0));
        let mut brain = MeleeBrawler::tank(&mut SimRng::new(5));
        for _ in 0..600 {
            run(&mut world, &player, &mut brain, &mut me, &[], 1);
            me.transform.position.z = -1.0;
            assert!(!brain.status().phase.starts_with("slam"));
        }
    }
}
