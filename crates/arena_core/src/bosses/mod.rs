//! Multi-phase boss machines.
//!
//! Each boss is a [`Behavior`] built from the pieces in [`shared`]. Bosses
//! that leave their add cadence to the manager (`self_manages_cadence`
//! returns `false`) are paired with a [`BossDirector`], which telegraphs and
//! spawns generic adds around them.

pub mod broodmother;
pub mod burrower;
pub mod juggernaut;
pub mod overseer;
pub mod shared;
pub mod splitter;
pub mod stormcaller;
pub mod warden;

use tracing::{debug, warn};

use crate::agent::{AgentId, AgentKind, Behavior, RemovalCause};
use crate::behaviors::melee::MeleeBrawler;
use crate::context::{AgentSnapshot, CommandBuffer, TickContext};
use crate::fx::colors;
use crate::math::Vec3;
use crate::rng::SimRng;
use crate::spawn::{ring_point, SpawnOptions, SpawnRole};

/// Build the behaviour for a boss archetype.
#[must_use]
pub fn create(kind: AgentKind, rng: &mut SimRng) -> Box<dyn Behavior> {
    match kind {
        AgentKind::Juggernaut => Box::new(juggernaut::Juggernaut::new(rng)),
        AgentKind::Broodmother => Box::new(broodmother::Broodmother::new(rng)),
        AgentKind::Burrower => Box::new(burrower::Burrower::new(rng)),
        AgentKind::Warden => Box::new(warden::Warden::new(rng)),
        AgentKind::Overseer => Box::new(overseer::Overseer::new(rng)),
        AgentKind::Splitter => Box::new(splitter::Splitter::new(rng)),
        AgentKind::Stormcaller => Box::new(stormcaller::Stormcaller::new(rng)),
        other => {
            warn!(kind = %other, "not a boss archetype, using melee behaviour");
            Box::new(MeleeBrawler::brawler(rng))
        }
    }
}

const DIRECTOR_INTERVAL: f32 = 10.0;
const DIRECTOR_INTERVAL_ENRAGED: f32 = 7.0;
const DIRECTOR_TELEGRAPH: f32 = 1.0;
const DIRECTOR_ADDS_PER_BOSS: usize = 4;
const DIRECTOR_RING: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingAdd {
    kind: AgentKind,
    position: Vec3,
    remaining: f32,
}

/// Generic add cadence for bosses that do not run their own.
#[derive(Debug, Clone, PartialEq)]
pub struct BossDirector {
    boss: AgentId,
    timer: f32,
    pending: Vec<PendingAdd>,
    adds: Vec<(AgentId, f32)>,
}

impl BossDirector {
    /// Director for `boss`.
    #[must_use]
    pub fn new(boss: AgentId) -> Self {
        Self {
            boss,
            timer: DIRECTOR_INTERVAL * 0.5,
            pending: Vec::new(),
            adds: Vec::new(),
        }
    }

    /// Boss this director serves.
    #[must_use]
    pub fn boss(&self) -> AgentId {
        self.boss
    }

    /// Adds alive or telegraphed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.adds.len() + self.pending.len()
    }

    /// One director step after the agent pass.
    pub fn update(&mut self, boss: &AgentSnapshot, ctx: &mut TickContext<'_>, dt: f32) {
        self.adds
            .retain(|(id, at)| ctx.is_alive(*id) || ctx.time <= *at);

        let mut ready = Vec::new();
        self.pending.retain_mut(|p| {
            p.remaining -= dt;
            if p.remaining <= 0.0 {
                ready.push(*p);
                false
            } else {
                true
            }
        });
        for add in ready {
            let mut options = SpawnOptions::role(SpawnRole::BossAdd).owned_by(self.boss);
            options.counts_toward_wave = Some(false);
            if let Some(id) = ctx.spawn(add.kind, add.position, options) {
                debug!(boss = %self.boss, add = %id, kind = %add.kind, "boss add spawned");
                self.adds.push((id, ctx.time));
            }
        }

        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }
        let enraged = boss.current_health <= boss.max_health * shared::PHASE_TWO_THRESHOLD;
        self.timer = if enraged {
            DIRECTOR_INTERVAL_ENRAGED
        } else {
            DIRECTOR_INTERVAL
        };
        let batch = if enraged { 2 } else { 1 };
        for _ in 0..batch {
            if self.outstanding() >= DIRECTOR_ADDS_PER_BOSS || !ctx.can_spawn(SpawnRole::BossAdd) {
                break;
            }
            let angle = ctx.rng.angle();
            let mut position = ring_point(boss.position, DIRECTOR_RING, angle);
            position.y = ctx.ground_height(position.x, position.z);
            let kind = if ctx.rng.chance(0.5) {
                AgentKind::Melee
            } else {
                AgentKind::Rusher
            };
            ctx.ring(position, 1.2, colors::SPAWN);
            self.pending.push(PendingAdd {
                kind,
                position,
                remaining: DIRECTOR_TELEGRAPH,
            });
        }
    }

    /// Release every add when the boss goes away.
    pub fn release(&mut self, commands: &mut CommandBuffer) {
        self.pending.clear();
        for (id, _) in self.adds.drain(..) {
            commands.remove(id, RemovalCause::Released);
        }
    }
}
