//! Support healer.
//!
//! Never attacks. Scores damaged allies by missing health minus distance,
//! drifts toward the best one while keeping clear of the player, and opens a
//! periodic heal window that proposes healing to every ally in range. The
//! manager applies only the largest proposal per target.

use crate::agent::{AgentBody, AgentId, Behavior, BehaviorStatus, KindCategory};
use crate::behaviors::{face_towards, tick_down, walk};
use crate::context::TickContext;
use crate::fx::colors;
use crate::math::{flat_direction, flat_distance, Vec3};
use crate::rig::AttachPoint;
use crate::rng::SimRng;

const SCAN_RADIUS: f32 = 20.0;
const APPROACH_DISTANCE: f32 = 4.0;
const PLAYER_CLEARANCE: f32 = 9.0;
const WINDOW_INTERVAL: f32 = 5.0;
const WINDOW_DURATION: f32 = 2.5;
/// Radius of the heal window.
pub const HEAL_RADIUS: f32 = 6.0;
/// Health per second offered to each ally inside the window.
pub const HEAL_RATE: f32 = 8.0;
const PULSE_RATE: f32 = 6.0;

/// Support healer.
#[derive(Debug, Clone)]
pub struct Healer {
    cooldown: f32,
    window: Option<f32>,
    target: Option<AgentId>,
    pulse: f32,
    windows_opened: u32,
}

impl Healer {
    /// New healer with a jittered first window.
    #[must_use]
    pub fn new(rng: &mut SimRng) -> Self {
        Self {
            cooldown: rng.range(1.0, WINDOW_INTERVAL),
            window: None,
            target: None,
            pulse: 0.0,
            windows_opened: 0,
        }
    }

    /// Ally currently favoured.
    #[must_use]
    pub fn target(&self) -> Option<AgentId> {
        self.target
    }

    /// Whether the heal window is open.
    #[must_use]
    pub fn window_open(&self) -> bool {
        self.window.is_some()
    }

    /// Score the damaged allies in range and pick the best.
    fn pick_target(&self, body: &AgentBody, ctx: &TickContext<'_>) -> Option<AgentId> {
        ctx.agents_within(body.position(), SCAN_RADIUS, body.id)
            .filter(|a| a.kind.category() != KindCategory::Hazard && a.missing_health() > 0.0)
            .map(|a| {
                let score = a.missing_health() - flat_distance(a.position, body.position());
                (a.id, score)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(id, _)| id)
    }

    fn reposition(&self, body: &mut AgentBody, ctx: &TickContext<'_>, dt: f32) {
        let speed = body.kind().speed();
        let here = body.position();
        let away = ctx.player_direction(here).map_or(Vec3::ZERO, |d| -d);
        let too_close = ctx.player_distance(here) < PLAYER_CLEARANCE;

        let toward_ally = self
            .target
            .and_then(|id| ctx.agent(id))
            .filter(|a| flat_distance(a.position, here) > APPROACH_DISTANCE)
            .and_then(|a| flat_direction(here, a.position));

        let desire = match (toward_ally, too_close) {
            (Some(dir), true) => (dir + away * 1.5).normalize_or_zero(),
            (Some(dir), false) => dir,
            (None, true) => away,
            (None, false) => Vec3::ZERO,
        };
        if desire != Vec3::ZERO {
            let heading = ctx.steer(body, desire);
            walk(body, ctx, heading, speed, dt);
        } else {
            face_towards(body, ctx.player.position, dt);
        }
    }
}

impl Behavior for Healer {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32) {
        self.target = self.pick_target(body, ctx);
        self.reposition(body, ctx, dt);

        match self.window {
            Some(mut remaining) => {
                self.pulse += PULSE_RATE * dt;
                body.rig.set_emissive(AttachPoint::Core, 1.0 + self.pulse.sin().abs() * 2.0);
                let allies: Vec<AgentId> = ctx
                    .agents_within(body.position(), HEAL_RADIUS, body.id)
                    .filter(|a| a.kind.category() != KindCategory::Hazard && a.missing_health() > 0.0)
                    .map(|a| a.id)
                    .collect();
                for ally in allies {
                    ctx.propose_heal(body.id, ally, HEAL_RATE * dt);
                }
                if tick_down(&mut remaining, dt) {
                    body.rig.set_emissive(AttachPoint::Core, 0.0);
                    self.window = None;
                    self.cooldown = WINDOW_INTERVAL;
                } else {
                    self.window = Some(remaining);
                }
            }
            None => {
                if tick_down(&mut self.cooldown, dt) {
                    self.window = Some(WINDOW_DURATION);
                    self.windows_opened += 1;
                    self.pulse = 0.0;
                    ctx.ring(body.position(), HEAL_RADIUS, colors::HEAL);
                }
            }
        }
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus::phase(if self.window.is_some() { "healing" } else { "support" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::behaviors::testing::{body, player_at, run, world};

    #[test]
    fn test_prefers_most_damaged_nearby_ally() {
        let mut world = world();
        let player = player_at(0.0, 30.0);
        let mut me = body(1, AgentKind::Healer, Vec3::new(0.0, 0.0, 0.0));
        let mut slightly = body(2, AgentKind::Melee, Vec3::new(2.0, 0.0, 0.0));
        slightly.take_damage(5.0);
        let mut badly = body(3, AgentKind::Melee, Vec3::new(-6.0, 0.0, 0.0));
        badly.take_damage(40.0);
        let mut brain = Healer::new(&mut SimRng::new(1));
        run(&mut world, &player, &mut brain, &mut me, &[slightly, badly], 1);
        assert_eq!(brain.target(), Some(AgentId(3)));
    }

    #[test]
    fn test_window_proposes_heals_in_radius() {
        let mut world = world();
        let player = player_at(0.0, 30.0);
        let mut me = body(1, AgentKind::Healer, Vec3::ZERO);
        let mut near = body(2, AgentKind::Melee, Vec3::new(3.0, 0.0, 0.0));
        near.take_damage(20.0);
        let mut far = body(3, AgentKind::Melee, Vec3::new(15.0, 0.0, 0.0));
        far.take_damage(20.0);
        let mut brain = Healer::new(&mut SimRng::new(2));
        brain.cooldown = 0.0;
        run(&mut world, &player, &mut brain, &mut me, &[near, far], 5);
        assert!(brain.window_open());
        assert!(!world.commands.heals.is_empty());
        assert!(world.commands.heals.iter().all(|h| h.target == AgentId(2)));
        assert!(world.commands.player_hits.is_empty());
    }

    #[test]
    fn test_keeps_clear_of_player() {
        let mut world = world();
        let player = player_at(0.0, 0.0);
        let mut me = body(1, AgentKind::Healer, Vec3::new(0.0, 0.0, -4.0));
        let mut brain = Healer::new(&mut SimRng::new(3));
        run(&mut world, &player, &mut brain, &mut me, &[], 90);
        assert!(me.position().z < -6.0);
    }
}
