//! Rusher: crouch, dash in a straight line, recover.

use crate::agent::{AgentBody, Behavior, BehaviorStatus};
use crate::behaviors::{face_towards, tick_down, walk};
use crate::context::TickContext;
use crate::math::{flat_direction, Vec3};
use crate::rng::SimRng;

const CROUCH_TIME: f32 = 0.45;
const DASH_TIME: f32 = 0.5;
const RECOVER_TIME: f32 = 0.8;
const DASH_SPEED_MULTIPLIER: f32 = 3.0;
const DASH_COOLDOWN: f32 = 2.5;
const TRIGGER_MIN: f32 = 3.0;
const TRIGGER_MAX: f32 = 10.0;
const DASH_DAMAGE: f32 = 14.0;
const DASH_KNOCKBACK: f32 = 6.0;
const CONTACT_RADIUS: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Stalk,
    Crouch { timer: f32, heading: Vec3 },
    Dash { timer: f32, heading: Vec3, hit: bool },
    Recover { timer: f32 },
}

/// Fast dasher.
#[derive(Debug, Clone)]
pub struct Rusher {
    phase: Phase,
    cooldown: f32,
}

impl Rusher {
    /// New rusher with a jittered first cooldown.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            phase: Phase::Stalk,
            cooldown: rng.range(0.3, 1.2),
        }
    }
}

impl Behavior for Rusher {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
        let speed = body.kind().speed();

        self.phase = match self.phase {
            Phase::Stalk => {
                let distance = ctx.player_distance(body.position());
                if self.cooldown <= 0.0
                    && (TRIGGER_MIN..=TRIGGER_MAX).contains(&distance)
                    && ctx.sees_player(body)
                {
                    let heading = flat_direction(body.position(), ctx.player.position)
                        .unwrap_or_else(|| body.transform.forward());
                    body.rig.head.emissive = 1.0;
                    Phase::Crouch {
                        timer: CROUCH_TIME,
                        heading,
                    }
                } else {
                    let heading = ctx.steer_towards(body, ctx.player.position);
                    if distance > TRIGGER_MIN * 0.5 {
                        walk(body, ctx, heading, speed, dt);
                    } else {
                        face_towards(body, ctx.player.position, dt);
                    }
                    Phase::Stalk
                }
            }
            Phase::Crouch { mut timer, heading } => {
                face_towards(body, body.position() + heading, dt);
                if tick_down(&mut timer, dt) {
                    body.rig.head.emissive = 0.0;
                    ctx.vocal(body.kind());
                    Phase::Dash {
                        timer: DASH_TIME,
                        heading,
                        hit: false,
                    }
                } else {
                    Phase::Crouch { timer, heading }
                }
            }
            Phase::Dash {
                mut timer,
                heading,
                mut hit,
            } => {
                let outcome = ctx.move_body(body, heading * speed * DASH_SPEED_MULTIPLIER * dt);
                if !hit && ctx.player_distance(body.position()) <= CONTACT_RADIUS + ctx.player.radius {
                    let push = heading * DASH_KNOCKBACK;
                    ctx.hit_player(body, DASH_DAMAGE, push);
                    hit = true;
                }
                if tick_down(&mut timer, dt) || outcome.obstructed(heading) {
                    Phase::Recover { timer: RECOVER_TIME }
                } else {
                    Phase::Dash { timer, heading, hit }
                }
            }
            Phase::Recover { mut timer } => {
                if tick_down(&mut timer, dt) {
                    self.cooldown = DASH_COOLDOWN;
                    Phase::Stalk
                } else {
                    Phase::Recover { timer }
                }
            }
        };
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.phase {
            Phase::Stalk => ("stalk", 0),
            Phase::Crouch { .. } => ("crouch", 1),
            Phase::Dash { .. } => ("dash", 1),
            Phase::Recover { .. } => ("recover", 1),
        };
        BehaviorStatus {
            phase,
            active_attacks: active,
            ..BehaviorStatus::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::behaviors::testing::{body, player_at, run, world};
    use crate::spatial::{Aabb, ColliderSet};

    #[test]
    fn test_dash_hits_once() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Rusher, Vec3::new(0.0, 0.0, -6.0));
        let mut brain = Rusher::new(&mut SimRng::new(1));
        brain.cooldown = 0.0;
        let mut saw_dash = false;
        for _ in 0..70 {
            run(&mut world, &player, &mut brain, &mut me, &[], 1);
            saw_dash |= brain.status().phase == "dash";
        }
        assert!(saw_dash);
        assert_eq!(world.commands.player_hits.len(), 1);
    }

    #[test]
    fn test_wall_cuts_dash_short() {
        let mut world = world();
        world.colliders = ColliderSet::with_boxes(vec![Aabb::block(-3.0, 3.0, -4.0, -3.5, 0.0, 0.9)]);
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Rusher, Vec3::new(0.0, 0.0, -6.0));
        let mut brain = Rusher::new(&mut SimRng::new(1));
        brain.cooldown = 0.0;
        for _ in 0..70 {
            run(&mut world, &player, &mut brain, &mut me, &[], 1);
        }
        assert!(me.position().z < -3.5);
        assert!(world.commands.player_hits.is_empty());
    }
}
