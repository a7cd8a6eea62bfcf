//! Swarm carrier and its minions.
//!
//! The carrier never attacks. It keeps a roster of small flyers topped up,
//! launching replacements from its hard-points at a limited rate while the
//! player is outside a no-spawn radius and the global minion cap allows it.
//! Each minion orbits a home slot around its carrier, darts at the player
//! when close, and is tugged back when it strays. Killing the carrier
//! releases its minions.

use std::f32::consts::TAU;

use crate::agent::{AgentBody, AgentId, AgentKind, Behavior, BehaviorStatus, RemovalCause};
use crate::behaviors::{face_towards, strafe_direction, tick_down, walk};
use crate::context::{CommandBuffer, TickContext};
use crate::math::{flat_distance, safe_normalize, yaw_of, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;
use crate::spawn::{SpawnOptions, SpawnRole};

const ROSTER_SIZE: usize = 6;
const SPAWN_INTERVAL: f32 = 1.5;
const NO_SPAWN_RADIUS: f32 = 6.0;
const HARDPOINTS: u8 = 4;
const KEEP_MIN: f32 = 12.0;
const KEEP_MAX: f32 = 18.0;

const ORBIT_RADIUS: f32 = 4.0;
const ORBIT_RATE: f32 = 0.4;
const ORBIT_LIFT: f32 = 1.5;
const DART_RANGE: f32 = 9.0;
const TUG_DISTANCE: f32 = 12.0;
const DART_TIME: f32 = 0.7;
const DART_COOLDOWN: f32 = 2.0;
const DART_SPEED_MULTIPLIER: f32 = 1.8;
const MINION_DAMAGE: f32 = 4.0;
const MINION_MIN_ALTITUDE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Launched {
    id: AgentId,
    slot: u8,
    spawned_at: f32,
}

/// Minion-launching carrier.
#[derive(Debug, Clone)]
pub struct SwarmCarrier {
    minions: Vec<Launched>,
    spawn_timer: f32,
    next_hardpoint: u8,
    strafe_sign: f32,
}

impl SwarmCarrier {
    /// New carrier.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            minions: Vec::with_capacity(ROSTER_SIZE),
            spawn_timer: rng.range(0.2, SPAWN_INTERVAL),
            next_hardpoint: 0,
            strafe_sign: rng.sign(),
        }
    }

    /// Ids of minions believed alive.
    pub fn minions(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.minions.iter().map(|m| m.id)
    }

    /// First orbit slot not held by a live minion.
    fn free_slot(&self) -> u8 {
        (0..ROSTER_SIZE as u8)
            .find(|slot| self.minions.iter().all(|m| m.slot != *slot))
            .unwrap_or(0)
    }

    fn keep_distance(&mut self, body: &mut AgentBody, ctx: &TickContext<'_>, dt: f32) {
        let speed = body.kind().speed();
        let distance = ctx.player_distance(body.position());
        let heading = if distance < KEEP_MIN {
            let away = ctx.player_direction(body.position()).map_or(Vec3::ZERO, |d| -d);
            ctx.steer(body, away)
        } else if distance > KEEP_MAX {
            ctx.steer_towards(body, ctx.player.position)
        } else {
            let lateral = strafe_direction(ctx, body, self.strafe_sign);
            ctx.steer(body, lateral * 0.5)
        };
        let outcome = walk(body, ctx, heading, speed, dt);
        if heading != Vec3::ZERO && outcome.obstructed(heading) {
            self.strafe_sign = -self.strafe_sign;
        }
        face_towards(body, ctx.player.position, dt);
    }
}

impl Behavior for SwarmCarrier {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        // Spawned ids join the snapshot one tick after the request.
        self.minions
            .retain(|m| ctx.is_alive(m.id) || ctx.time <= m.spawned_at);
        self.keep_distance(body, ctx, dt);

        for i in 0..HARDPOINTS {
            body.rig.set_emissive(AttachPoint::Hardpoint(i), 0.0);
        }
        let below_roster = self.minions.len() < ROSTER_SIZE;
        let ready = tick_down(&mut self.spawn_timer, dt);
        if !(below_roster && ready) {
            if !below_roster {
                self.spawn_timer = self.spawn_timer.max(0.0);
            }
            return;
        }
        self.spawn_timer = SPAWN_INTERVAL;

        if ctx.player_distance(body.position()) < NO_SPAWN_RADIUS || !ctx.can_spawn(SpawnRole::Minion) {
            return;
        }
        let point = AttachPoint::Hardpoint(self.next_hardpoint);
        self.next_hardpoint = (self.next_hardpoint + 1) % HARDPOINTS;
        let origin = body.rig.world_point(point, &body.transform);
        let slot = self.free_slot();
        let mut options = SpawnOptions::role(SpawnRole::Minion).owned_by(body.id);
        options.slot = Some(slot);
        options.counts_toward_wave = Some(false);
        if let Some(id) = ctx.spawn(AgentKind::SwarmMinion, origin, options) {
            body.rig.set_emissive(point, 2.5);
            self.minions.push(Launched {
                id,
                slot,
                spawned_at: ctx.time,
            });
        }
    }

    fn on_removed(&mut self, _body: &AgentBody, _cause: RemovalCause, commands: &mut CommandBuffer) {
        for minion in self.minions.drain(..) {
            commands.remove(minion.id, RemovalCause::Released);
        }
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus::phase("carry")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MinionPhase {
    Orbit,
    Dart { timer: f32, hit: bool },
}

/// Small orbiting flyer launched by a carrier.
#[derive(Debug, Clone)]
pub struct SwarmMinion {
    owner: Option<AgentId>,
    slot: u8,
    phase: MinionPhase,
    cooldown: f32,
}

impl SwarmMinion {
    /// New minion bound to an owner and orbit slot.
    #[must_use]
    pub fn new(owner: Option<AgentId>, slot: u8, rng: &mut SimRng) -> Self {
        Self {
            owner,
            slot,
            phase: MinionPhase::Orbit,
            cooldown: rng.range(0.5, DART_COOLDOWN),
        }
    }

    /// Owning carrier, cleared once it is gone.
    #[must_use]
    pub fn owner(&self) -> Option<AgentId> {
        self.owner
    }

    /// Orbit anchor around the owner at the current time.
    fn home(&self, owner_position: Vec3, time: f32) -> Vec3 {
        let angle = f32::from(self.slot) * TAU / ROSTER_SIZE as f32 + time * ORBIT_RATE;
        Vec3::new(
            owner_position.x + angle.sin() * ORBIT_RADIUS,
            owner_position.y + ORBIT_LIFT,
            owner_position.z + angle.cos() * ORBIT_RADIUS,
        )
    }

    fn fly_towards(body: &mut AgentBody, ctx: &TickContext<'_>, goal: Vec3, speed: f32, dt: f32) {
        let delta = goal - body.position();
        let step = speed * dt;
        let motion = match safe_normalize(delta) {
            Some(dir) if delta.length() > step => dir * step,
            _ => delta,
        };
        body.transform.yaw = yaw_of(motion, body.transform.yaw);
        ctx.fly_body(body, motion, MINION_MIN_ALTITUDE);
    }
}

impl Behavior for SwarmMinion {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        if let Some(owner) = self.owner {
            if !ctx.is_alive(owner) {
                self.owner = None;
            }
        }
        self.cooldown = (self.cooldown - dt).max(0.0);
        let speed = body.kind().speed();
        let home = self
            .owner
            .and_then(|id| ctx.agent(id))
            .map(|owner| self.home(owner.position, ctx.time));

        self.phase = match self.phase {
            MinionPhase::Orbit => {
                let near_player = ctx.player_distance(body.position()) <= DART_RANGE;
                if self.cooldown <= 0.0 && (near_player || home.is_none()) {
                    MinionPhase::Dart {
                        timer: DART_TIME,
                        hit: false,
                    }
                } else {
                    match home {
                        Some(anchor) => {
                            let strayed = flat_distance(anchor, body.position()) > TUG_DISTANCE;
                            let pace = if strayed { speed * 1.5 } else { speed * 0.6 };
                            Self::fly_towards(body, ctx, anchor, pace, dt);
                        }
                        None => {
                            let target = ctx.player.eye();
                            Self::fly_towards(body, ctx, target, speed * 0.7, dt);
                        }
                    }
                    MinionPhase::Orbit
                }
            }
            MinionPhase::Dart { mut timer, mut hit } => {
                let target = ctx.player.position;
                Self::fly_towards(body, ctx, target, speed * DART_SPEED_MULTIPLIER, dt);
                let contact = body.position().distance(target) <= ctx.player.radius + body.shape.footprint + 0.3;
                if contact && !hit {
                    let push = ctx.knockback_from(body.position(), 1.0);
                    ctx.hit_player(body, MINION_DAMAGE, push);
                    hit = true;
                }
                if tick_down(&mut timer, dt) || hit {
                    self.cooldown = DART_COOLDOWN;
                    MinionPhase::Orbit
                } else {
                    MinionPhase::Dart { timer, hit }
                }
            }
        };
    }

    fn status(&self) -> BehaviorStatus {
        let (phase, active) = match self.phase {
            MinionPhase::Orbit => ("orbit", 0),
            MinionPhase::Dart { .. } => ("dart", 1),
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
    use crate::behaviors::testing::{body, player_at, run, world};

    #[test]
    fn test_trickle_spawns_at_rate() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::SwarmCarrier, Vec3::new(0.0, 0.0, -15.0));
        let mut brain = SwarmCarrier::new(&mut SimRng::new(1));
        brain.spawn_timer = 0.0;
        run(&mut world, &player, &mut brain, &mut me, &[], 60);
        // One immediately, the next after a full interval
        assert_eq!(world.commands.spawns.len(), 1);
        run(&mut world, &player, &mut brain, &mut me, &[], 40);
        assert_eq!(world.commands.spawns.len(), 2);
        let spawn = &world.commands.spawns[0];
        assert_eq!(spawn.kind, AgentKind::SwarmMinion);
        assert_eq!(spawn.options.owner, Some(AgentId(1)));
        assert_eq!(spawn.options.role, SpawnRole::Minion);
    }

    #[test]
    fn test_no_spawn_near_player() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::SwarmCarrier, Vec3::new(0.0, 0.0, -3.0));
        let mut brain = SwarmCarrier::new(&mut SimRng::new(2));
        brain.spawn_timer = 0.0;
        run(&mut world, &player, &mut brain, &mut me, &[], 1);
        assert!(world.commands.spawns.is_empty());
    }

    #[test]
    fn test_respects_minion_cap() {
        let mut world = world();
        world.config.caps.max_swarm_minions = 1;
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::SwarmCarrier, Vec3::new(0.0, 0.0, -15.0));
        let mut brain = SwarmCarrier::new(&mut SimRng::new(3));
        brain.spawn_timer = 0.0;
        run(&mut world, &player, &mut brain, &mut me, &[], 200);
        assert_eq!(world.commands.spawns.len(), 1);
    }

    #[test]
    fn test_removal_releases_minions() {
        let mut brain = SwarmCarrier::new(&mut SimRng::new(4));
        brain.minions.push(Launched {
            id: AgentId(7),
            slot: 0,
            spawned_at: 0.0,
        });
        let me = body(1, AgentKind::SwarmCarrier, Vec3::ZERO);
        let mut commands = CommandBuffer::default();
        brain.on_removed(&me, RemovalCause::Killed, &mut commands);
        assert_eq!(commands.removals, vec![(AgentId(7), RemovalCause::Released)]);
    }

    #[test]
    fn test_minion_darts_and_hits_once() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(2, AgentKind::SwarmMinion, Vec3::new(0.0, 1.0, -5.0));
        let mut brain = SwarmMinion::new(None, 0, &mut SimRng::new(5));
        brain.cooldown = 0.0;
        run(&mut world, &player, &mut brain, &mut me, &[], 30);
        assert_eq!(world.commands.player_hits.len(), 1);
    }

    #[test]
    fn test_minion_tugged_home() {
        let mut world = world();
        let player = player_at(0.0, 40.0);
        let carrier = body(1, AgentKind::SwarmCarrier, Vec3::ZERO);
        let mut me = body(2, AgentKind::SwarmMinion, Vec3::new(20.0, 1.0, 0.0));
        let mut brain = SwarmMinion::new(Some(AgentId(1)), 0, &mut SimRng::new(6));
        let start = flat_distance(me.position(), carrier.position());
        run(&mut world, &player, &mut brain, &mut me, &[carrier.clone()], 60);
        assert!(flat_distance(me.position(), carrier.position()) < start - 5.0);
        assert_eq!(brain.owner(), Some(AgentId(1)));
    }
}
