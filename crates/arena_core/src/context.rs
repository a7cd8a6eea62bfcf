//! The per-frame context every behaviour update receives.
//!
//! Behaviours read the world through [`TickContext`] (player pose, colliders,
//! a snapshot of every live agent, the blackboard) and request every
//! cross-agent effect through its [`CommandBuffer`]. The manager applies the
//! buffer after the agent pass, so no update ever mutates the registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentBody, AgentId, AgentKind, IdAllocator, RemovalCause};
use crate::config::ArenaConfig;
use crate::fx::{colors, FxRequest};
use crate::lineage::SplitRequest;
use crate::math::{flat, flat_direction, flat_distance, safe_normalize, Vec3};
use crate::movement::{move_flying, move_with_collisions, MoveOutcome};
use crate::navigation::NavGrid;
use crate::rng::SimRng;
use crate::spatial::ColliderSet;
use crate::spawn::{SpawnOptions, SpawnRole};
use crate::steering;

/// Height above the tallest collider that ground probes start from.
const GROUND_PROBE_MARGIN: f32 = 1.0;

/// The player as the simulation sees it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Body centre.
    pub position: Vec3,
    /// View direction (may include pitch).
    pub forward: Vec3,
    /// Collision radius.
    pub radius: f32,
    /// Half of the player's standing height.
    pub half_height: f32,
}

impl PlayerState {
    /// Player standing at `position` looking along `forward`.
    #[must_use]
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: safe_normalize(forward).unwrap_or(Vec3::Z),
            radius: 0.4,
            half_height: 0.9,
        }
    }

    /// Eye point.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.position + Vec3::Y * self.half_height * 0.8
    }

    /// Feet height.
    #[must_use]
    pub fn feet(&self) -> f32 {
        self.position.y - self.half_height
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.9, 0.0), Vec3::Z)
    }
}

/// Loose coordination signals rebuilt every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Blackboard {
    /// Horizontal player facing.
    pub player_forward: Vec3,
    /// Estimated player velocity from the last two frames.
    pub player_velocity: Vec3,
    /// Magnitude of `player_velocity`.
    pub player_speed: f32,
    /// Many enemies are alive; ranged units should hold fire less.
    pub suppression: bool,
    /// The wave is nearly cleared; survivors should close in together.
    pub regroup: bool,
    /// Current wave.
    pub wave_number: u32,
    /// Agents still counting toward the wave.
    pub alive_count: u32,
    /// A boss encounter is running.
    pub boss_active: bool,
}

/// Read-only view of one live agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    /// Id.
    pub id: AgentId,
    /// Archetype.
    pub kind: AgentKind,
    /// Body centre.
    pub position: Vec3,
    /// Last-frame velocity.
    pub velocity: Vec3,
    /// Current health.
    pub current_health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Footprint half-extent.
    pub footprint: f32,
    /// Owning agent.
    pub owner: Option<AgentId>,
}

impl AgentSnapshot {
    /// Snapshot a body.
    #[must_use]
    pub fn of(body: &AgentBody) -> Self {
        Self {
            id: body.id,
            kind: body.kind(),
            position: body.position(),
            velocity: body.velocity,
            current_health: body.meta.current_health,
            max_health: body.meta.max_health,
            footprint: body.shape.footprint,
            owner: body.owner,
        }
    }

    /// Missing health.
    #[must_use]
    pub fn missing_health(&self) -> f32 {
        (self.max_health - self.current_health).max(0.0)
    }
}

/// Damage dealt to the player, reported through the host callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerHit {
    /// Attacker.
    pub source: AgentId,
    /// Attacker archetype.
    pub kind: AgentKind,
    /// Damage after the attacker's multiplier.
    pub amount: f32,
    /// Knockback impulse.
    pub knockback: Vec3,
}

/// Heal offered to an ally; only the largest per target per frame lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealProposal {
    /// Healer.
    pub source: AgentId,
    /// Ally.
    pub target: AgentId,
    /// Amount.
    pub amount: f32,
}

/// Damage dealt by one agent to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentDamage {
    /// Attacker.
    pub source: AgentId,
    /// Victim.
    pub target: AgentId,
    /// Amount.
    pub amount: f32,
}

/// Spawn reserved during the pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// Pre-reserved id.
    pub id: AgentId,
    /// Archetype.
    pub kind: AgentKind,
    /// Body centre; `None` asks the manager to place it.
    pub position: Option<Vec3>,
    /// Options.
    pub options: SpawnOptions,
}

/// Everything queued during one agent pass.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    /// Damage to the player.
    pub player_hits: Vec<PlayerHit>,
    /// Heal proposals.
    pub heals: Vec<HealProposal>,
    /// Agent-on-agent damage.
    pub agent_damage: Vec<AgentDamage>,
    /// New agents.
    pub spawns: Vec<SpawnRequest>,
    /// Agents to remove.
    pub removals: Vec<(AgentId, RemovalCause)>,
    /// Lineage split requests.
    pub splits: Vec<SplitRequest>,
    /// Effects and audio.
    pub fx: Vec<FxRequest>,
}

impl CommandBuffer {
    /// Queue a removal.
    pub fn remove(&mut self, id: AgentId, cause: RemovalCause) {
        self.removals.push((id, cause));
    }

    /// Whether an agent is already queued for removal.
    #[must_use]
    pub fn removing(&self, id: AgentId) -> bool {
        self.removals.iter().any(|(r, _)| *r == id)
    }

    /// Queue an effect.
    pub fn fx(&mut self, request: FxRequest) {
        self.fx.push(request);
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.player_hits.is_empty()
            && self.heals.is_empty()
            && self.agent_damage.is_empty()
            && self.spawns.is_empty()
            && self.removals.is_empty()
            && self.splits.is_empty()
            && self.fx.is_empty()
    }
}

/// Live counts per role and kind, kept by the manager.
#[derive(Debug, Clone, Default)]
pub struct Population {
    by_role: HashMap<SpawnRole, u32>,
    by_kind: HashMap<AgentKind, u32>,
    total: u32,
}

impl Population {
    /// Record a registration.
    pub fn add(&mut self, kind: AgentKind, role: SpawnRole) {
        *self.by_role.entry(role).or_default() += 1;
        *self.by_kind.entry(kind).or_default() += 1;
        self.total += 1;
    }

    /// Record a removal.
    pub fn remove(&mut self, kind: AgentKind, role: SpawnRole) {
        if let Some(n) = self.by_role.get_mut(&role) {
            *n = n.saturating_sub(1);
        }
        if let Some(n) = self.by_kind.get_mut(&kind) {
            *n = n.saturating_sub(1);
        }
        self.total = self.total.saturating_sub(1);
    }

    /// Live agents with this role.
    #[must_use]
    pub fn role(&self, role: SpawnRole) -> u32 {
        self.by_role.get(&role).copied().unwrap_or(0)
    }

    /// Live agents of this kind.
    #[must_use]
    pub fn kind(&self, kind: AgentKind) -> u32 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// All live agents.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.by_role.clear();
        self.by_kind.clear();
        self.total = 0;
    }
}

/// Arena-wide coordination state shared by agents of one archetype.
#[derive(Debug, Clone, Default)]
pub struct Coordination {
    /// Earliest time the next sniper shot may fire.
    pub next_sniper_shot: Option<f32>,
}

/// Manager-owned state a [`TickContext`] borrows from.
#[derive(Debug, Clone)]
pub struct SimWorld {
    /// Tuning.
    pub config: ArenaConfig,
    /// Static geometry.
    pub colliders: ColliderSet,
    /// Optional navigation grid.
    pub nav: Option<NavGrid>,
    /// This frame's blackboard.
    pub blackboard: Blackboard,
    /// Snapshot of every live agent, sorted by id.
    pub snapshot: Vec<AgentSnapshot>,
    /// Live counts.
    pub population: Population,
    /// Random source.
    pub rng: SimRng,
    /// Queued effects for this frame.
    pub commands: CommandBuffer,
    /// Coordination counters.
    pub coordination: Coordination,
    /// Id allocator.
    pub ids: IdAllocator,
    /// Simulated seconds since reset.
    pub time: f32,
}

impl SimWorld {
    /// Fresh world.
    #[must_use]
    pub fn new(config: ArenaConfig, colliders: ColliderSet, seed: u64) -> Self {
        Self {
            config,
            colliders,
            nav: None,
            blackboard: Blackboard::default(),
            snapshot: Vec::new(),
            population: Population::default(),
            rng: SimRng::new(seed),
            commands: CommandBuffer::default(),
            coordination: Coordination::default(),
            ids: IdAllocator::new(),
            time: 0.0,
        }
    }

    /// Borrow a context for one agent update.
    pub fn context<'a>(&'a mut self, player: &'a PlayerState) -> TickContext<'a> {
        TickContext {
            player,
            blackboard: &self.blackboard,
            colliders: &self.colliders,
            agents: &self.snapshot,
            config: &self.config,
            nav: self.nav.as_ref(),
            population: &self.population,
            time: self.time,
            rng: &mut self.rng,
            commands: &mut self.commands,
            coordination: &mut self.coordination,
            ids: &mut self.ids,
        }
    }
}

/// Everything an agent may read or request during its update.
#[derive(Debug)]
pub struct TickContext<'a> {
    /// Player pose.
    pub player: &'a PlayerState,
    /// Coordination signals.
    pub blackboard: &'a Blackboard,
    /// Static geometry.
    pub colliders: &'a ColliderSet,
    /// Live agents at the start of the pass, sorted by id.
    pub agents: &'a [AgentSnapshot],
    /// Tuning.
    pub config: &'a ArenaConfig,
    /// Navigation grid, when installed.
    pub nav: Option<&'a NavGrid>,
    /// Live counts at the start of the pass.
    pub population: &'a Population,
    /// Simulated seconds since reset.
    pub time: f32,
    /// Shared random source.
    pub rng: &'a mut SimRng,
    /// Deferred effects.
    pub commands: &'a mut CommandBuffer,
    /// Arena-wide coordination counters.
    pub coordination: &'a mut Coordination,
    ids: &'a mut IdAllocator,
}

impl TickContext<'_> {
    // --- queries ---

    /// Snapshot of a live agent.
    #[must_use]
    pub fn agent(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.agents
            .binary_search_by_key(&id, |a| a.id)
            .ok()
            .map(|i| &self.agents[i])
    }

    /// Whether the agent was alive at the start of the pass and has not been
    /// queued for removal since.
    #[must_use]
    pub fn is_alive(&self, id: AgentId) -> bool {
        self.agent(id).is_some() && !self.commands.removing(id)
    }

    /// Horizontal distance from `position` to the player.
    #[must_use]
    pub fn player_distance(&self, position: Vec3) -> f32 {
        flat_distance(position, self.player.position)
    }

    /// Horizontal unit direction from `position` to the player.
    #[must_use]
    pub fn player_direction(&self, position: Vec3) -> Option<Vec3> {
        flat_direction(position, self.player.position)
    }

    /// Cosine between the player's view and the direction from the player's
    /// eye to `point`; 1 means dead centre.
    #[must_use]
    pub fn player_view_alignment(&self, point: Vec3) -> f32 {
        match safe_normalize(point - self.player.eye()) {
            Some(dir) => dir.dot(self.player.forward),
            None => 1.0,
        }
    }

    /// Player speed along the line from `position` to the player; positive
    /// when the player moves away.
    #[must_use]
    pub fn player_radial_speed(&self, position: Vec3) -> f32 {
        self.player_direction(position)
            .map_or(0.0, |dir| self.blackboard.player_velocity.dot(dir))
    }

    /// Line-of-sight with the configured height offsets.
    #[must_use]
    pub fn has_line_of_sight(&self, from: Vec3, to: Vec3) -> bool {
        steering::line_of_sight(self.colliders, from, to, &self.config.steering.los_offsets)
    }

    /// Whether the agent's eye sees the player's eye.
    #[must_use]
    pub fn sees_player(&self, body: &AgentBody) -> bool {
        self.has_line_of_sight(body.eye(), self.player.eye())
    }

    /// Ground under a point, topmost surface first.
    #[must_use]
    pub fn ground_height(&self, x: f32, z: f32) -> f32 {
        let top = self.colliders.ceiling() + GROUND_PROBE_MARGIN;
        self.colliders.ground_height(x, z, top, 0.25)
    }

    /// Live agents within `radius` of `position`, excluding `except`.
    pub fn agents_within(
        &self,
        position: Vec3,
        radius: f32,
        except: AgentId,
    ) -> impl Iterator<Item = &AgentSnapshot> + '_ {
        self.agents
            .iter()
            .filter(move |a| a.id != except && flat_distance(a.position, position) <= radius)
    }

    /// Live agents of a kind.
    #[must_use]
    pub fn live_count(&self, kind: AgentKind) -> u32 {
        self.population.kind(kind)
    }

    // --- movement ---

    /// Direction to walk from `from` toward `to`: along the navigation path
    /// when a grid is installed and a path exists, otherwise straight.
    #[must_use]
    pub fn path_direction(&self, from: Vec3, to: Vec3) -> Option<Vec3> {
        if let Some(nav) = self.nav {
            if let Ok(path) = nav.find_path(from, to) {
                if let Some(dir) = path
                    .iter()
                    .find(|p| flat_distance(**p, from) > nav.cell_size() * 0.5)
                    .and_then(|p| flat_direction(from, *p))
                {
                    return Some(dir);
                }
            }
        }
        flat_direction(from, to)
    }

    /// Bend a desire direction around obstacles and away from neighbours.
    #[must_use]
    pub fn steer(&self, body: &AgentBody, desire: Vec3) -> Vec3 {
        let cfg = &self.config.steering;
        let avoided = steering::avoid_obstacles(
            self.colliders,
            body.position(),
            desire,
            cfg.avoidance_probe,
        );
        let push = steering::separation(body.position(), cfg.separation_radius, body.id, self.agents);
        steering::blend(avoided, push, cfg.separation_weight)
    }

    /// Steered heading toward a point.
    #[must_use]
    pub fn steer_towards(&self, body: &AgentBody, target: Vec3) -> Vec3 {
        match self.path_direction(body.position(), target) {
            Some(dir) => self.steer(body, dir),
            None => Vec3::ZERO,
        }
    }

    /// Move a grounded body with collisions and step following.
    pub fn move_body(&self, body: &mut AgentBody, delta: Vec3) -> MoveOutcome {
        let profile = self.config.movement.profile(body.shape.class);
        move_with_collisions(
            &mut body.transform.position,
            &body.shape,
            profile,
            flat(delta),
            self.colliders,
            self.config.movement.probe_epsilon,
        )
    }

    /// Move an airborne body keeping `min_altitude` above the ground.
    pub fn fly_body(&self, body: &mut AgentBody, delta: Vec3, min_altitude: f32) -> MoveOutcome {
        move_flying(
            &mut body.transform.position,
            body.shape.footprint,
            delta,
            self.colliders,
            min_altitude,
        )
    }

    // --- requests ---

    /// Damage the player. `base_damage` is scaled by the attacker's multiplier.
    pub fn hit_player(&mut self, body: &AgentBody, base_damage: f32, knockback: Vec3) {
        if base_damage <= 0.0 {
            return;
        }
        self.commands.player_hits.push(PlayerHit {
            source: body.id,
            kind: body.kind(),
            amount: base_damage * body.meta.damage_multiplier,
            knockback,
        });
    }

    /// Knockback pushing the player away from `origin`.
    #[must_use]
    pub fn knockback_from(&self, origin: Vec3, strength: f32) -> Vec3 {
        flat_direction(origin, self.player.position).map_or(Vec3::ZERO, |d| d * strength)
    }

    /// Offer a heal to an ally.
    pub fn propose_heal(&mut self, source: AgentId, target: AgentId, amount: f32) {
        if amount > 0.0 {
            self.commands.heals.push(HealProposal {
                source,
                target,
                amount,
            });
        }
    }

    /// Damage another agent.
    pub fn damage_agent(&mut self, source: AgentId, target: AgentId, amount: f32) {
        if amount > 0.0 {
            self.commands.agent_damage.push(AgentDamage {
                source,
                target,
                amount,
            });
        }
    }

    /// Queue a removal.
    pub fn remove(&mut self, id: AgentId, cause: RemovalCause) {
        self.commands.remove(id, cause);
    }

    /// Queue a lineage split.
    pub fn split(&mut self, request: SplitRequest) {
        self.commands.splits.push(request);
    }

    /// Queued spawns with this role.
    fn pending_role(&self, role: SpawnRole) -> u32 {
        let n = self.commands.spawns.iter().filter(|s| s.options.role == role).count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    /// Whether a spawn with this role fits under the global caps right now.
    #[must_use]
    pub fn can_spawn(&self, role: SpawnRole) -> bool {
        let caps = &self.config.caps;
        let queued = u32::try_from(self.commands.spawns.len()).unwrap_or(u32::MAX);
        if self.population.total().saturating_add(queued) >= caps.max_live_agents {
            return false;
        }
        let cap = match role {
            SpawnRole::Minion => caps.max_swarm_minions,
            SpawnRole::BossAdd => caps.max_boss_adds,
            SpawnRole::Hazard => caps.max_hazards,
            SpawnRole::Wave | SpawnRole::Boss | SpawnRole::Lineage | SpawnRole::External => return true,
        };
        self.population.role(role).saturating_add(self.pending_role(role)) < cap
    }

    /// Request a new agent. Returns its reserved id, or `None` when a cap
    /// refuses it.
    pub fn spawn(&mut self, kind: AgentKind, position: Vec3, options: SpawnOptions) -> Option<AgentId> {
        if !self.can_spawn(options.role) {
            return None;
        }
        let id = self.ids.reserve();
        self.commands.spawns.push(SpawnRequest {
            id,
            kind,
            position: Some(position),
            options,
        });
        Some(id)
    }

    /// Claim the arena-wide sniper shot slot.
    pub fn try_claim_sniper_shot(&mut self) -> bool {
        let free = self
            .coordination
            .next_sniper_shot
            .map_or(true, |next| self.time >= next);
        if free {
            self.coordination.next_sniper_shot =
                Some(self.time + self.config.caps.sniper_volley_interval);
        }
        free
    }

    /// Telegraph ring.
    pub fn ring(&mut self, position: Vec3, radius: f32, color: u32) {
        self.commands.fx(FxRequest::Ring {
            position,
            radius,
            color,
        });
    }

    /// Aim line from `from` to `to`.
    pub fn aim_line(&mut self, from: Vec3, to: Vec3) {
        self.commands.fx(FxRequest::Line {
            from,
            to,
            color: colors::AIM,
        });
    }

    /// Ground-slam effect.
    pub fn ground_slam(&mut self, position: Vec3, radius: f32) {
        self.commands.fx(FxRequest::GroundSlam { position, radius });
    }

    /// Archetype vocal cue.
    pub fn vocal(&mut self, kind: AgentKind) {
        self.commands.fx(FxRequest::Vocal(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use crate::spatial::Aabb;

    fn world() -> SimWorld {
        SimWorld::new(ArenaConfig::default(), ColliderSet::new(0.0), 1)
    }

    #[test]
    fn test_minion_cap_counts_queued_spawns() {
        let mut world = world();
        world.config.caps.max_swarm_minions = 2;
        let player = PlayerState::default();
        let mut ctx = world.context(&player);
        let opts = SpawnOptions::role(SpawnRole::Minion);
        assert!(ctx.spawn(AgentKind::SwarmMinion, Vec3::ZERO, opts.clone()).is_some());
        assert!(ctx.spawn(AgentKind::SwarmMinion, Vec3::ZERO, opts.clone()).is_some());
        assert!(ctx.spawn(AgentKind::SwarmMinion, Vec3::ZERO, opts).is_none());
    }

    #[test]
    fn test_spawn_ids_are_increasing() {
        let mut world = world();
        let player = PlayerState::default();
        let mut ctx = world.context(&player);
        let a = ctx.spawn(AgentKind::Melee, Vec3::ZERO, SpawnOptions::default()).unwrap();
        let b = ctx.spawn(AgentKind::Melee, Vec3::ZERO, SpawnOptions::default()).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_sniper_slot_is_rate_limited() {
        let mut world = world();
        world.time = 10.0;
        let player = PlayerState::default();
        {
            let mut ctx = world.context(&player);
            assert!(ctx.try_claim_sniper_shot());
            assert!(!ctx.try_claim_sniper_shot());
        }
        world.time = 10.0 + world.config.caps.sniper_volley_interval - 0.01;
        {
            let mut ctx = world.context(&player);
            assert!(!ctx.try_claim_sniper_shot());
        }
        world.time = 10.0 + world.config.caps.sniper_volley_interval;
        let mut ctx = world.context(&player);
        assert!(ctx.try_claim_sniper_shot());
    }

    #[test]
    fn test_ground_height_sees_platform() {
        let colliders = ColliderSet::with_boxes(vec![Aabb::block(-2.0, 2.0, -2.0, 2.0, 0.0, 2.0)]);
        let mut world = SimWorld::new(ArenaConfig::default(), colliders, 1);
        let player = PlayerState::default();
        let ctx = world.context(&player);
        assert!((ctx.ground_height(0.0, 0.0) - 2.0).abs() < 1e-4);
        assert!(ctx.ground_height(5.0, 0.0).abs() < 1e-4);
    }

    #[test]
    fn test_ground_height_picks_top_of_stack() {
        let colliders = ColliderSet::with_boxes(vec![
            Aabb::block(-2.0, 2.0, -2.0, 2.0, 0.0, 1.0),
            Aabb::block(-1.0, 1.0, -1.0, 1.0, 1.0, 2.5),
        ]);
        let mut world = SimWorld::new(ArenaConfig::default(), colliders, 1);
        let player = PlayerState::default();
        let ctx = world.context(&player);
        assert!((ctx.ground_height(0.0, 0.0) - 3.5).abs() < 1e-4);
        assert!((ctx.ground_height(1.5, 0.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_boss_role_ignores_add_caps() {
        let mut world = world();
        world.config.caps.max_boss_adds = 0;
        let player = PlayerState::default();
        let ctx = world.context(&player);
        assert!(ctx.can_spawn(SpawnRole::Boss));
        assert!(!ctx.can_spawn(SpawnRole::BossAdd));
    }

    #[test]
    fn test_view_alignment() {
        let mut world = world();
        let player = PlayerState::new(Vec3::new(0.0, 0.9, 0.0), Vec3::Z);
        let ctx = world.context(&player);
        assert!(ctx.player_view_alignment(player.eye() + Vec3::Z * 10.0) > 0.99);
        assert!(ctx.player_view_alignment(player.eye() - Vec3::Z * 10.0) < -0.99);
    }

    #[test]
    fn test_population_counts() {
        let mut pop = Population::default();
        pop.add(AgentKind::Melee, SpawnRole::Wave);
        pop.add(AgentKind::SwarmMinion, SpawnRole::Minion);
        pop.remove(AgentKind::Melee, SpawnRole::Wave);
        assert_eq!(pop.total(), 1);
        assert_eq!(pop.role(SpawnRole::Minion), 1);
        assert_eq!(pop.kind(AgentKind::Melee), 0);
    }
}
