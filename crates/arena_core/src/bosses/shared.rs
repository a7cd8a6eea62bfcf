//! Building blocks shared by the boss machines.
//!
//! Bosses layer a phase gate, a telegraph → resolve ability cycle, optional
//! weakpoint windows, a burrow relocation cycle and a capped add roster on
//! top of the regular steering helpers. Hit shapes resolve an ability
//! against the player at the moment the telegraph ends.

use crate::agent::{AgentId, AgentKind, RemovalCause};
use crate::context::{CommandBuffer, PlayerState, TickContext};
use crate::math::{flat, flat_angle_between, flat_direction, flat_distance, segment_distance, wrap_angle, yaw_of, Vec3};
use crate::spawn::{SpawnOptions, SpawnRole};

/// Health fraction at which most bosses enter phase two.
pub const PHASE_TWO_THRESHOLD: f32 = 0.6;
/// How far above an area centre the player can stand and still be caught.
pub const VERTICAL_REACH: f32 = 2.0;

/// One-way health gate into phase two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseGate {
    threshold: f32,
    entered: bool,
}

impl PhaseGate {
    /// Gate at `threshold` of max health.
    #[must_use]
    pub const fn new(threshold: f32) -> Self {
        Self {
            threshold,
            entered: false,
        }
    }

    /// Returns `true` on the single call where the gate opens.
    pub fn check(&mut self, health_fraction: f32) -> bool {
        if !self.entered && health_fraction <= self.threshold {
            self.entered = true;
            return true;
        }
        false
    }

    /// Whether phase two is active.
    #[must_use]
    pub const fn phase_two(&self) -> bool {
        self.entered
    }

    /// 1 or 2.
    #[must_use]
    pub const fn phase(&self) -> u8 {
        if self.entered {
            2
        } else {
            1
        }
    }
}

impl Default for PhaseGate {
    fn default() -> Self {
        Self::new(PHASE_TWO_THRESHOLD)
    }
}

/// State of an ability cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleState<A> {
    /// Waiting for the next roll.
    Cooldown {
        /// Seconds left.
        remaining: f32,
    },
    /// Winding up an ability.
    Telegraph {
        /// Chosen ability.
        ability: A,
        /// Seconds until it resolves.
        remaining: f32,
        /// Locked target point.
        target: Vec3,
        /// Cooldown applied after resolution.
        cooldown: f32,
    },
}

/// What a cycle tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleEvent<A> {
    /// Nothing to do.
    Idle,
    /// Cooldown over; the caller may `begin` an ability.
    Ready,
    /// A telegraph ended; resolve `ability` at `target`.
    Resolve(A, Vec3),
}

/// Telegraph → resolve → cooldown loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityCycle<A> {
    state: CycleState<A>,
}

impl<A: Copy> AbilityCycle<A> {
    /// Cycle starting with a cooldown.
    #[must_use]
    pub const fn new(initial_cooldown: f32) -> Self {
        Self {
            state: CycleState::Cooldown {
                remaining: initial_cooldown,
            },
        }
    }

    /// Advance the cycle.
    pub fn tick(&mut self, dt: f32) -> CycleEvent<A> {
        match &mut self.state {
            CycleState::Cooldown { remaining } => {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    *remaining = 0.0;
                    CycleEvent::Ready
                } else {
                    CycleEvent::Idle
                }
            }
            CycleState::Telegraph {
                ability,
                remaining,
                target,
                cooldown,
            } => {
                *remaining -= dt;
                if *remaining > 0.0 {
                    return CycleEvent::Idle;
                }
                let event = CycleEvent::Resolve(*ability, *target);
                let rest = *cooldown;
                self.state = CycleState::Cooldown { remaining: rest };
                event
            }
        }
    }

    /// Start a telegraph. Ignored unless the cycle is ready.
    pub fn begin(&mut self, ability: A, windup: f32, target: Vec3, cooldown: f32) -> bool {
        match self.state {
            CycleState::Cooldown { remaining } if remaining <= 0.0 => {
                self.state = CycleState::Telegraph {
                    ability,
                    remaining: windup,
                    target,
                    cooldown,
                };
                true
            }
            _ => false,
        }
    }

    /// Move the locked target of a running telegraph.
    pub fn retarget(&mut self, point: Vec3) {
        if let CycleState::Telegraph { target, .. } = &mut self.state {
            *target = point;
        }
    }

    /// Drop a running telegraph and wait `cooldown`.
    pub fn cancel(&mut self, cooldown: f32) {
        self.state = CycleState::Cooldown { remaining: cooldown };
    }

    /// Running telegraph, if any.
    #[must_use]
    pub fn telegraphing(&self) -> Option<(A, Vec3)> {
        match self.state {
            CycleState::Telegraph { ability, target, .. } => Some((ability, target)),
            CycleState::Cooldown { .. } => None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CycleState<A> {
        self.state
    }
}

/// Temporary incoming-damage multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeakpointWindow {
    remaining: f32,
    multiplier: f32,
}

impl WeakpointWindow {
    /// Open (or extend) the window.
    pub fn open(&mut self, duration: f32, multiplier: f32) {
        self.remaining = self.remaining.max(duration);
        self.multiplier = multiplier;
    }

    /// Close early.
    pub fn close(&mut self) {
        self.remaining = 0.0;
    }

    /// Count down.
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// Whether exposed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.remaining > 0.0
    }

    /// Damage scale to apply right now.
    #[must_use]
    pub fn scale(&self) -> f32 {
        if self.is_open() {
            self.multiplier
        } else {
            1.0
        }
    }
}

/// Phase of a burrow relocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BurrowPhase {
    /// Above ground.
    Surface,
    /// Going under.
    Sinking(f32),
    /// Underground, untouchable.
    Hidden(f32),
    /// Coming back up at the new spot.
    Rising(f32),
}

/// What a burrow tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurrowEvent {
    /// Nothing new.
    None,
    /// Fully underground.
    Submerged,
    /// Time to teleport and start rising.
    Emerge,
    /// Back on the surface.
    Surfaced,
}

/// Sink → teleport → rise relocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurrowCycle {
    phase: BurrowPhase,
    sink: f32,
    hidden: f32,
    rise: f32,
}

impl BurrowCycle {
    /// Cycle with the given phase durations.
    #[must_use]
    pub const fn new(sink: f32, hidden: f32, rise: f32) -> Self {
        Self {
            phase: BurrowPhase::Surface,
            sink,
            hidden,
            rise,
        }
    }

    /// Begin sinking. Ignored unless surfaced.
    pub fn start(&mut self) -> bool {
        if self.phase == BurrowPhase::Surface {
            self.phase = BurrowPhase::Sinking(self.sink);
            true
        } else {
            false
        }
    }

    /// Advance.
    pub fn tick(&mut self, dt: f32) -> BurrowEvent {
        let (next, event) = match self.phase {
            BurrowPhase::Surface => (BurrowPhase::Surface, BurrowEvent::None),
            BurrowPhase::Sinking(t) if t - dt <= 0.0 => (BurrowPhase::Hidden(self.hidden), BurrowEvent::Submerged),
            BurrowPhase::Sinking(t) => (BurrowPhase::Sinking(t - dt), BurrowEvent::None),
            BurrowPhase::Hidden(t) if t - dt <= 0.0 => (BurrowPhase::Rising(self.rise), BurrowEvent::Emerge),
            BurrowPhase::Hidden(t) => (BurrowPhase::Hidden(t - dt), BurrowEvent::None),
            BurrowPhase::Rising(t) if t - dt <= 0.0 => (BurrowPhase::Surface, BurrowEvent::Surfaced),
            BurrowPhase::Rising(t) => (BurrowPhase::Rising(t - dt), BurrowEvent::None),
        };
        self.phase = next;
        event
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> BurrowPhase {
        self.phase
    }

    /// Whether mid-relocation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != BurrowPhase::Surface
    }

    /// Whether damage is ignored right now.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        matches!(self.phase, BurrowPhase::Hidden(_))
    }

    /// How far the body is sunk, 0 on the surface and 1 fully under.
    #[must_use]
    pub fn depth(&self) -> f32 {
        match self.phase {
            BurrowPhase::Surface => 0.0,
            BurrowPhase::Sinking(t) => 1.0 - (t / self.sink.max(f32::EPSILON)).clamp(0.0, 1.0),
            BurrowPhase::Hidden(_) => 1.0,
            BurrowPhase::Rising(t) => (t / self.rise.max(f32::EPSILON)).clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OwnedAdd {
    id: AgentId,
    spawned_at: f32,
}

/// Adds a boss keeps track of, capped per boss on top of the global cap.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedAdds {
    adds: Vec<OwnedAdd>,
    cap: usize,
}

impl OwnedAdds {
    /// Empty roster with a per-boss cap.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            adds: Vec::with_capacity(cap),
            cap,
        }
    }

    /// Forget adds that have died. Requests from this tick are kept until
    /// they show up in the snapshot.
    pub fn prune(&mut self, ctx: &TickContext<'_>) {
        self.adds
            .retain(|a| ctx.is_alive(a.id) || ctx.time <= a.spawned_at);
    }

    /// Live (or pending) adds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adds.len()
    }

    /// Whether no add is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty()
    }

    /// Whether the per-boss cap has room.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.adds.len() < self.cap
    }

    /// Ids of the tracked adds.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.adds.iter().map(|a| a.id)
    }

    /// Spawn an add owned by `owner` if both caps allow it.
    pub fn try_spawn(
        &mut self,
        ctx: &mut TickContext<'_>,
        owner: AgentId,
        kind: AgentKind,
        role: SpawnRole,
        position: Vec3,
        mut options: SpawnOptions,
    ) -> Option<AgentId> {
        if !self.has_room() {
            return None;
        }
        options.role = role;
        options.owner = Some(owner);
        options.counts_toward_wave = Some(false);
        let id = ctx.spawn(kind, position, options)?;
        self.adds.push(OwnedAdd {
            id,
            spawned_at: ctx.time,
        });
        Some(id)
    }

    /// Queue every tracked add for release.
    pub fn release_all(&mut self, commands: &mut CommandBuffer) {
        for add in self.adds.drain(..) {
            commands.remove(add.id, RemovalCause::Released);
        }
    }
}

/// Player inside a circle around `center`.
#[must_use]
pub fn in_radius(center: Vec3, radius: f32, player: &PlayerState) -> bool {
    flat_distance(center, player.position) <= radius + player.radius
        && player.feet() <= center.y + VERTICAL_REACH
}

/// Player inside a cone opening from `origin` along `facing`.
#[must_use]
pub fn in_cone(origin: Vec3, facing: Vec3, half_angle: f32, range: f32, player: &PlayerState) -> bool {
    let to_player = player.position - origin;
    if flat(to_player).length() > range + player.radius {
        return false;
    }
    if player.feet() > origin.y + VERTICAL_REACH {
        return false;
    }
    flat_angle_between(facing, to_player) <= half_angle
}

/// Player within `half_width` of the segment from `origin` along `direction`.
#[must_use]
pub fn in_line(origin: Vec3, direction: Vec3, length: f32, half_width: f32, player: &PlayerState) -> bool {
    let end = origin + flat(direction).normalize_or_zero() * length;
    segment_distance(flat(origin), flat(end), flat(player.position)) <= half_width + player.radius
}

/// Whether a beam rotating from `from_yaw` to `to_yaw` this tick crossed the
/// player's bearing from `origin`.
#[must_use]
pub fn swept_past(origin: Vec3, from_yaw: f32, to_yaw: f32, range: f32, player: &PlayerState) -> bool {
    if flat_distance(origin, player.position) > range + player.radius {
        return false;
    }
    let Some(dir) = flat_direction(origin, player.position) else {
        return true;
    };
    let bearing = yaw_of(dir, 0.0);
    let swept = wrap_angle(to_yaw - from_yaw);
    let offset = wrap_angle(bearing - from_yaw);
    if swept >= 0.0 {
        (0.0..=swept).contains(&offset)
    } else {
        (swept..=0.0).contains(&offset)
    }
}
