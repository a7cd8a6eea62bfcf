//! Agent data model.
//!
//! An agent is an [`AgentBody`] (transform, metadata bag, collision shape,
//! visual rig) driven by a boxed [`Behavior`]. The manager owns both halves;
//! a behaviour only ever mutates its own body and reaches everything else
//! through the [`TickContext`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::{CommandBuffer, TickContext};
use crate::error::ArenaError;
use crate::math::{forward_from_yaw, Vec3};
use crate::movement::{BodyShape, StepClass};
use crate::rig::{AttachPoint, Rig};
use crate::spawn::SpawnRole;

/// Stable agent identifier. Ids are handed out in increasing order, so
/// sorting by id is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out agent ids. Owned by the manager and lent to the context so
/// queued spawns can be referenced before they exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Start at id 1.
    #[must_use]
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Reserve the next id.
    pub fn reserve(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Broad grouping of archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KindCategory {
    /// Regular wave combatants.
    Combatant,
    /// Cheap helpers owned by another agent.
    Minion,
    /// Timed or destructible area entities.
    Hazard,
    /// Boss encounters.
    Boss,
}

/// Every archetype the kernel can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    /// Default melee brawler.
    Melee,
    /// Fast dasher.
    Rusher,
    /// Ranged skirmisher firing bursts.
    Shooter,
    /// Heavy brawler with a slam.
    Tank,
    /// Support healer.
    Healer,
    /// Long-range single-shot marksman.
    Sniper,
    /// Dive-bombing flyer.
    Flyer,
    /// Carrier that maintains a swarm of minions.
    SwarmCarrier,
    /// Cheap flyer launched by a carrier.
    SwarmMinion,
    /// Area-denial puddle.
    AcidPuddle,
    /// Destructible egg that hatches rushers.
    BroodPod,
    /// Destructible node shielding a boss.
    ShieldNode,
    /// Boss: charging heavyweight.
    Juggernaut,
    /// Boss: lays pods and spits acid.
    Broodmother,
    /// Boss: burrows and erupts under the player.
    Burrower,
    /// Boss: passes verdicts on the player's position.
    Warden,
    /// Boss: sweeping beam behind shield nodes.
    Overseer,
    /// Boss: splits into smaller copies on death.
    Splitter,
    /// Boss: airborne caster of lightning rings.
    Stormcaller,
}

impl AgentKind {
    /// All archetypes.
    pub const ALL: [Self; 19] = [
        Self::Melee,
        Self::Rusher,
        Self::Shooter,
        Self::Tank,
        Self::Healer,
        Self::Sniper,
        Self::Flyer,
        Self::SwarmCarrier,
        Self::SwarmMinion,
        Self::AcidPuddle,
        Self::BroodPod,
        Self::ShieldNode,
        Self::Juggernaut,
        Self::Broodmother,
        Self::Burrower,
        Self::Warden,
        Self::Overseer,
        Self::Splitter,
        Self::Stormcaller,
    ];

    /// Boss rotation, indexed by boss encounter number.
    pub const BOSS_ROTATION: [Self; 7] = [
        Self::Juggernaut,
        Self::Broodmother,
        Self::Burrower,
        Self::Warden,
        Self::Overseer,
        Self::Splitter,
        Self::Stormcaller,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Rusher => "rusher",
            Self::Shooter => "shooter",
            Self::Tank => "tank",
            Self::Healer => "healer",
            Self::Sniper => "sniper",
            Self::Flyer => "flyer",
            Self::SwarmCarrier => "swarm_carrier",
            Self::SwarmMinion => "swarm_minion",
            Self::AcidPuddle => "acid_puddle",
            Self::BroodPod => "brood_pod",
            Self::ShieldNode => "shield_node",
            Self::Juggernaut => "juggernaut",
            Self::Broodmother => "broodmother",
            Self::Burrower => "burrower",
            Self::Warden => "warden",
            Self::Overseer => "overseer",
            Self::Splitter => "splitter",
            Self::Stormcaller => "stormcaller",
        }
    }

    /// Category of this archetype.
    #[must_use]
    pub const fn category(self) -> KindCategory {
        match self {
            Self::Melee
            | Self::Rusher
            | Self::Shooter
            | Self::Tank
            | Self::Healer
            | Self::Sniper
            | Self::Flyer
            | Self::SwarmCarrier => KindCategory::Combatant,
            Self::SwarmMinion => KindCategory::Minion,
            Self::AcidPuddle | Self::BroodPod | Self::ShieldNode => KindCategory::Hazard,
            Self::Juggernaut
            | Self::Broodmother
            | Self::Burrower
            | Self::Warden
            | Self::Overseer
            | Self::Splitter
            | Self::Stormcaller => KindCategory::Boss,
        }
    }

    /// Whether this archetype is a boss.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self.category(), KindCategory::Boss)
    }

    /// Whether the body ignores ground following.
    #[must_use]
    pub const fn is_flying(self) -> bool {
        matches!(self, Self::Flyer | Self::SwarmMinion | Self::Stormcaller)
    }

    /// Base maximum health before wave scaling.
    #[must_use]
    pub const fn base_health(self) -> f32 {
        match self {
            Self::Melee => 60.0,
            Self::Rusher => 40.0,
            Self::Shooter => 50.0,
            Self::Tank => 220.0,
            Self::Healer => 55.0,
            Self::Sniper => 45.0,
            Self::Flyer => 35.0,
            Self::SwarmCarrier => 260.0,
            Self::SwarmMinion => 10.0,
            Self::AcidPuddle => 1.0,
            Self::BroodPod => 40.0,
            Self::ShieldNode => 80.0,
            Self::Juggernaut => 1800.0,
            Self::Broodmother => 1500.0,
            Self::Burrower => 1600.0,
            Self::Warden => 1700.0,
            Self::Overseer => 2000.0,
            Self::Splitter => 900.0,
            Self::Stormcaller => 1400.0,
        }
    }

    /// Cruising speed in units per second.
    #[must_use]
    pub const fn speed(self) -> f32 {
        match self {
            Self::Melee => 3.6,
            Self::Rusher => 5.2,
            Self::Shooter => 3.2,
            Self::Tank => 2.2,
            Self::Healer => 3.0,
            Self::Sniper => 3.0,
            Self::Flyer => 6.5,
            Self::SwarmCarrier => 1.6,
            Self::SwarmMinion => 7.0,
            Self::AcidPuddle | Self::BroodPod | Self::ShieldNode => 0.0,
            Self::Juggernaut => 2.6,
            Self::Broodmother => 2.0,
            Self::Burrower => 3.0,
            Self::Warden => 2.4,
            Self::Overseer => 1.8,
            Self::Splitter => 2.8,
            Self::Stormcaller => 4.0,
        }
    }

    /// Collision shape.
    #[must_use]
    pub const fn body_shape(self) -> BodyShape {
        match self {
            Self::Melee | Self::Shooter | Self::Healer | Self::Sniper => {
                BodyShape::new(0.8, 0.3, StepClass::Standard)
            }
            Self::Rusher => BodyShape::new(0.7, 0.28, StepClass::Light),
            Self::Tank => BodyShape::new(1.1, 0.5, StepClass::Heavy),
            Self::Flyer => BodyShape::new(0.4, 0.35, StepClass::Light),
            Self::SwarmCarrier => BodyShape::new(1.3, 0.7, StepClass::Heavy),
            Self::SwarmMinion => BodyShape::new(0.25, 0.2, StepClass::Light),
            Self::AcidPuddle => BodyShape::new(0.05, 1.0, StepClass::Light),
            Self::BroodPod => BodyShape::new(0.5, 0.5, StepClass::Heavy),
            Self::ShieldNode => BodyShape::new(0.9, 0.5, StepClass::Heavy),
            Self::Juggernaut => BodyShape::new(1.6, 0.9, StepClass::Heavy),
            Self::Broodmother => BodyShape::new(1.4, 1.0, StepClass::Heavy),
            Self::Burrower => BodyShape::new(1.2, 0.8, StepClass::Heavy),
            Self::Warden => BodyShape::new(1.5, 0.8, StepClass::Heavy),
            Self::Overseer => BodyShape::new(1.8, 1.0, StepClass::Heavy),
            Self::Splitter => BodyShape::new(1.3, 0.8, StepClass::Heavy),
            Self::Stormcaller => BodyShape::new(1.0, 0.8, StepClass::Heavy),
        }
    }

    /// Declared attachment points the asset factory must provide.
    #[must_use]
    pub const fn attachment_schema(self) -> &'static [AttachPoint] {
        match self {
            Self::Melee | Self::Rusher => &[AttachPoint::LeftArm, AttachPoint::RightArm],
            Self::Tank => &[
                AttachPoint::LeftArm,
                AttachPoint::RightArm,
                AttachPoint::Core,
            ],
            Self::Shooter | Self::Sniper => &[AttachPoint::RightArm, AttachPoint::Muzzle],
            Self::Healer => &[AttachPoint::Core],
            Self::Flyer | Self::SwarmMinion => &[AttachPoint::LeftWing, AttachPoint::RightWing],
            Self::SwarmCarrier => &[
                AttachPoint::Hardpoint(0),
                AttachPoint::Hardpoint(1),
                AttachPoint::Hardpoint(2),
                AttachPoint::Hardpoint(3),
                AttachPoint::Core,
            ],
            Self::AcidPuddle | Self::BroodPod | Self::ShieldNode => &[AttachPoint::Core],
            Self::Juggernaut | Self::Splitter => &[
                AttachPoint::LeftArm,
                AttachPoint::RightArm,
                AttachPoint::Weakpoint,
            ],
            Self::Broodmother => &[AttachPoint::Jaw, AttachPoint::Weakpoint, AttachPoint::Core],
            Self::Burrower => &[AttachPoint::Jaw, AttachPoint::Weakpoint],
            Self::Warden => &[AttachPoint::RightArm, AttachPoint::Muzzle, AttachPoint::Weakpoint],
            Self::Overseer => &[AttachPoint::Muzzle, AttachPoint::Core, AttachPoint::Weakpoint],
            Self::Stormcaller => &[
                AttachPoint::LeftWing,
                AttachPoint::RightWing,
                AttachPoint::Core,
            ],
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ArenaError::UnknownArchetype(s.to_string()))
    }
}

/// Loosely-typed metadata bag every agent carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentMeta {
    /// Archetype.
    pub kind: AgentKind,
    /// Current health; the agent is removed at or below zero.
    pub current_health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Multiplier on outgoing damage.
    pub damage_multiplier: f32,
}

impl AgentMeta {
    /// Full-health metadata.
    #[must_use]
    pub fn new(kind: AgentKind, max_health: f32, damage_multiplier: f32) -> Self {
        Self {
            kind,
            current_health: max_health,
            max_health,
            damage_multiplier,
        }
    }

    /// Health as a fraction of max.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.current_health / self.max_health).clamp(0.0, 1.0)
    }

    /// Missing health.
    #[must_use]
    pub fn missing_health(&self) -> f32 {
        (self.max_health - self.current_health).max(0.0)
    }

    /// Whether health is depleted.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current_health <= 0.0
    }
}

/// World transform. `position` is the body centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Transform {
    /// Body centre.
    pub position: Vec3,
    /// Rotation around +Y.
    pub yaw: f32,
    /// Nose up/down.
    pub pitch: f32,
    /// Bank.
    pub roll: f32,
}

impl Transform {
    /// Transform at `position` facing `yaw`.
    #[must_use]
    pub fn at(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Horizontal facing direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        forward_from_yaw(self.yaw)
    }
}

/// Record linking an agent to a self-replicating boss lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineageTag {
    /// Lineage identifier.
    pub lineage: crate::lineage::LineageId,
    /// Generation; the original boss is generation zero.
    pub generation: u8,
}

/// Why an agent left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Health reached zero.
    Killed,
    /// The behaviour asked to leave (expired, drifted away).
    Expired,
    /// Removed by the host or by its owner.
    Released,
}

/// Everything about an agent except its behaviour.
#[derive(Debug, Clone)]
pub struct AgentBody {
    /// Stable id.
    pub id: AgentId,
    /// Metadata bag.
    pub meta: AgentMeta,
    /// World transform.
    pub transform: Transform,
    /// Displacement per second over the last update.
    pub velocity: Vec3,
    /// Collision shape.
    pub shape: BodyShape,
    /// Visual handles (opaque to the simulation apart from transforms and knobs).
    pub rig: Rig,
    /// Agent that spawned and owns this one.
    pub owner: Option<AgentId>,
    /// Lineage membership for splitting bosses.
    pub lineage: Option<LineageTag>,
    /// Population bucket the agent was spawned into.
    pub role: SpawnRole,
    /// Whether this agent counts toward the wave's alive count.
    pub counts_toward_wave: bool,
    /// Uniform size multiplier.
    pub scale: f32,
}

impl AgentBody {
    /// Archetype.
    #[must_use]
    pub fn kind(&self) -> AgentKind {
        self.meta.kind
    }

    /// Body centre.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Eye point used for line-of-sight.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.transform.position + Vec3::Y * self.shape.half_height * 0.7
    }

    /// Feet height.
    #[must_use]
    pub fn feet(&self) -> f32 {
        self.shape.feet(self.transform.position)
    }

    /// Apply damage, returning the amount actually removed.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 || self.meta.is_dead() {
            return 0.0;
        }
        let before = self.meta.current_health;
        self.meta.current_health = (before - amount).max(0.0);
        before - self.meta.current_health
    }

    /// Heal up to max health, returning the amount restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 || self.meta.is_dead() {
            return 0.0;
        }
        let before = self.meta.current_health;
        self.meta.current_health = (before + amount).min(self.meta.max_health);
        self.meta.current_health - before
    }
}

/// Introspection snapshot of a behaviour, for tests and debug overlays.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BehaviorStatus {
    /// Current state label.
    pub phase: &'static str,
    /// Attack state machines currently past idle.
    pub active_attacks: u8,
    /// Projectiles the agent owns.
    pub projectiles: usize,
    /// Incoming damage is ignored.
    pub invulnerable: bool,
    /// Boss phase (1-based) for bosses.
    pub boss_phase: Option<u8>,
}

impl BehaviorStatus {
    /// Status with just a phase label.
    #[must_use]
    pub fn phase(phase: &'static str) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }
}

/// Per-archetype state machine driving one agent.
pub trait Behavior: fmt::Debug {
    /// Advance one frame. Called at most once per agent per frame.
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, dt: f32);

    /// Cleanup hook, called synchronously when the agent leaves the registry.
    /// Release owned sub-entities here.
    fn on_removed(&mut self, _body: &AgentBody, _cause: RemovalCause, _commands: &mut CommandBuffer) {}

    /// Multiplier applied to incoming hits (0 = invulnerable).
    fn incoming_damage_scale(&self, _body: &AgentBody, _is_head: bool) -> f32 {
        1.0
    }

    /// Custom removal condition checked after each update.
    fn should_remove(&self, _body: &AgentBody) -> bool {
        false
    }

    /// Bosses that return `false` get generic add spawns from the manager.
    fn self_manages_cadence(&self) -> bool {
        true
    }

    /// Introspection.
    fn status(&self) -> BehaviorStatus;
}

/// A registered agent.
#[derive(Debug)]
pub struct Agent {
    /// Body.
    pub body: AgentBody,
    /// Behaviour.
    pub behavior: Box<dyn Behavior>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_by_name() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.name().parse::<AgentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_parse_is_lenient_on_case() {
        assert_eq!("Swarm-Carrier".parse::<AgentKind>().unwrap(), AgentKind::SwarmCarrier);
    }

    #[test]
    fn test_unknown_kind_errors() {
        let err = "dragon".parse::<AgentKind>().unwrap_err();
        assert!(matches!(err, ArenaError::UnknownArchetype(_)));
    }

    #[test]
    fn test_boss_rotation_is_all_bosses() {
        for kind in AgentKind::BOSS_ROTATION {
            assert!(kind.is_boss());
        }
        let bosses = AgentKind::ALL.iter().filter(|k| k.is_boss()).count();
        assert_eq!(bosses, AgentKind::BOSS_ROTATION.len());
    }

    #[test]
    fn test_heavy_bodies_for_tank_and_bosses() {
        assert_eq!(AgentKind::Tank.body_shape().class, StepClass::Heavy);
        assert_eq!(AgentKind::Melee.body_shape().class, StepClass::Standard);
        assert_eq!(AgentKind::Juggernaut.body_shape().class, StepClass::Heavy);
    }

    #[test]
    fn test_meta_health_fraction() {
        let mut meta = AgentMeta::new(AgentKind::Melee, 80.0, 1.0);
        meta.current_health = 20.0;
        assert!((meta.health_fraction() - 0.25).abs() < 1e-6);
        assert!((meta.missing_health() - 60.0).abs() < 1e-6);
    }
}
