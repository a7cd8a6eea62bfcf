//! Per-archetype behaviour state machines.
//!
//! Every combatant loops through the same shape: pursue or position,
//! telegraph, act, recover. Timers are plain accumulated seconds; nothing
//! suspends.

pub mod carrier;
pub mod flyer;
pub mod hazard;
pub mod healer;
pub mod melee;
pub mod rusher;
pub mod shooter;
pub mod sniper;

use crate::agent::{AgentBody, AgentKind, Behavior};
use crate::bosses;
use crate::context::TickContext;
use crate::math::{flat_angle_between, flat_direction, flat_perpendicular, turn_towards, yaw_of, Vec3};
use crate::movement::MoveOutcome;
use crate::rng::SimRng;
use crate::spawn::SpawnOptions;

/// Default turn rate for ground agents, radians per second.
pub const TURN_RATE: f32 = 6.0;

/// Build the behaviour for an archetype.
#[must_use]
pub fn create(kind: AgentKind, options: &SpawnOptions, rng: &mut SimRng) -> Box<dyn Behavior> {
    match kind {
        AgentKind::Melee => Box::new(melee::MeleeBrawler::brawler(rng)),
        AgentKind::Tank => Box::new(melee::MeleeBrawler::tank(rng)),
        AgentKind::Rusher => Box::new(rusher::Rusher::new(rng)),
        AgentKind::Shooter => Box::new(shooter::Shooter::new(rng)),
        AgentKind::Sniper => Box::new(sniper::Sniper::new(rng)),
        AgentKind::Flyer => Box::new(flyer::Flyer::new(rng)),
        AgentKind::Healer => Box::new(healer::Healer::new(rng)),
        AgentKind::SwarmCarrier => Box::new(carrier::SwarmCarrier::new(rng)),
        AgentKind::SwarmMinion => Box::new(carrier::SwarmMinion::new(options.owner, options.slot.unwrap_or(0), rng)),
        AgentKind::AcidPuddle => Box::new(hazard::AcidPuddle::new(options.lifetime)),
        AgentKind::BroodPod => Box::new(hazard::BroodPod::new(options.owner, options.lifetime)),
        AgentKind::ShieldNode => Box::new(hazard::ShieldNode::new(options.owner)),
        boss => bosses::create(boss, rng),
    }
}

/// Turn the body toward a point.
pub fn face_towards(body: &mut AgentBody, target: Vec3, dt: f32) {
    if let Some(dir) = flat_direction(body.position(), target) {
        let yaw = yaw_of(dir, body.transform.yaw);
        body.transform.yaw = turn_towards(body.transform.yaw, yaw, TURN_RATE * dt);
    }
}

/// Walk along a heading at `speed`, facing the direction of travel.
pub fn walk(body: &mut AgentBody, ctx: &TickContext<'_>, heading: Vec3, speed: f32, dt: f32) -> MoveOutcome {
    if heading != Vec3::ZERO {
        let yaw = yaw_of(heading, body.transform.yaw);
        body.transform.yaw = turn_towards(body.transform.yaw, yaw, TURN_RATE * dt);
    }
    ctx.move_body(body, heading * speed * dt)
}

/// Sideways unit vector relative to the line toward the player.
#[must_use]
pub fn strafe_direction(ctx: &TickContext<'_>, body: &AgentBody, sign: f32) -> Vec3 {
    ctx.player_direction(body.position())
        .map_or(Vec3::ZERO, |dir| flat_perpendicular(dir) * sign)
}

/// Whether the player stands within `half_arc` radians of the body's facing.
#[must_use]
pub fn player_in_arc(ctx: &TickContext<'_>, body: &AgentBody, half_arc: f32) -> bool {
    let to_player = ctx.player.position - body.position();
    flat_angle_between(body.transform.forward(), to_player) <= half_arc
}

/// Countdown helper: subtract `dt`, return whether the timer expired.
pub fn tick_down(timer: &mut f32, dt: f32) -> bool {
    *timer -= dt;
    *timer <= 0.0
}
