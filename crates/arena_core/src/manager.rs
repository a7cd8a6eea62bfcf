//! The enemy manager: registry, per-frame loop and wave lifecycle.
//!
//! The manager owns every agent and every shared counter. Each frame runs
//! the same fixed order:
//!
//! 1. **Blackboard** - rebuild the coordination signals from the player
//!    pose and wave state
//! 2. **Staggered spawns** - place due trickle spawns and released lineage
//!    splits
//! 3. **Snapshot** - copy every live agent into the read-only view
//! 4. **Agent pass** - update agents in id order; effects are queued
//! 5. **Commit** - land the largest heal per target, agent damage and
//!    player hits
//! 6. **Removals** - dead or expired agents leave, `on_removed` runs
//!    synchronously and may release more agents or queue splits
//! 7. **Boss directors** - generic add cadence for bosses that want it
//! 8. **Spawns** - register everything queued this frame
//! 9. **Effects** - dispatch queued rings, slams and vocals
//! 10. **Wave advance** - only when nothing counts toward the wave, no
//!     staggered spawn is pending and no boss encounter is active

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, info, warn};

use crate::agent::{
    Agent, AgentBody, AgentId, AgentKind, AgentMeta, Behavior, BehaviorStatus, LineageTag,
    RemovalCause, Transform,
};
use crate::behaviors;
use crate::bosses::BossDirector;
use crate::config::ArenaConfig;
use crate::context::{AgentSnapshot, Blackboard, PlayerHit, PlayerState, Population, SimWorld};
use crate::error::{ArenaError, Result};
use crate::fx::{self, Audio, Effects};
use crate::lineage::{LineageTable, SplitRequest};
use crate::math::{flat, flat_direction, safe_normalize, yaw_of, Vec3};
use crate::movement::{BodyShape, StepClass};
use crate::navigation::NavGrid;
use crate::rig::{AssetFactory, AssetOptions, SceneRoster, SceneSink, SchemaAssetFactory};
use crate::spatial::ColliderSet;
use crate::spawn::{place_spawn, SpawnOptions, SpawnRole};
use crate::wave::{self, WavePlan, WaveState};

type WaveCallback = Box<dyn FnMut(u32)>;
type RemainingCallback = Box<dyn FnMut(u32, u32)>;

/// Storage for all live agents.
///
/// Uses a `HashMap` for O(1) lookup by id, with deterministic iteration via
/// sorted keys when running the frame.
#[derive(Debug, Default)]
pub struct AgentStorage {
    agents: HashMap<AgentId, Agent>,
}

impl AgentStorage {
    /// Get an agent by id.
    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// Get a mutable agent by id.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// Check if an agent exists.
    #[must_use]
    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    /// Number of live agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agent is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Sorted ids, i.e. registration order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<_> = self.agents.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all agents (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, &Agent)> {
        self.agents.iter()
    }

    fn insert(&mut self, agent: Agent) {
        self.agents.insert(agent.body.id, agent);
    }

    fn remove(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    fn clear(&mut self) {
        self.agents.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingSpawn {
    kind: AgentKind,
    delay: f32,
}

/// Owns the arena's agents and runs the simulation frame by frame.
pub struct EnemyManager {
    world: SimWorld,
    agents: AgentStorage,
    lineages: LineageTable,
    wave: WaveState,
    wave_in_progress: bool,
    pending: VecDeque<PendingSpawn>,
    directors: BTreeMap<AgentId, BossDirector>,
    factory: Box<dyn AssetFactory>,
    scene: Box<dyn SceneSink>,
    effects: Option<Box<dyn Effects>>,
    audio: Option<Box<dyn Audio>>,
    on_wave: Vec<WaveCallback>,
    on_remaining: Vec<RemainingCallback>,
    last_player: Option<PlayerState>,
    seed: u64,
}

impl fmt::Debug for EnemyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnemyManager")
            .field("wave", &self.wave)
            .field("agents", &self.agents.len())
            .field("pending", &self.pending.len())
            .field("time", &self.world.time)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl EnemyManager {
    /// Manager with validated tuning, an empty arena and the default
    /// headless collaborators.
    pub fn new(config: ArenaConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, seed))
    }

    /// Manager with the shipped tuning.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::build(ArenaConfig::default(), seed)
    }

    fn build(config: ArenaConfig, seed: u64) -> Self {
        let floor = 0.0;
        Self {
            world: SimWorld::new(config, ColliderSet::new(floor), seed),
            agents: AgentStorage::default(),
            lineages: LineageTable::new(),
            wave: WaveState::default(),
            wave_in_progress: false,
            pending: VecDeque::new(),
            directors: BTreeMap::new(),
            factory: Box::new(SchemaAssetFactory),
            scene: Box::new(SceneRoster::default()),
            effects: None,
            audio: None,
            on_wave: Vec::new(),
            on_remaining: Vec::new(),
            last_player: None,
            seed,
        }
    }

    // --- collaborators ---

    /// Install static geometry, rebuilding the nav grid when enabled.
    pub fn set_colliders(&mut self, colliders: ColliderSet) -> Result<()> {
        let nav = &self.world.config.navigation;
        self.world.nav = if nav.enabled {
            let standard = self.world.config.movement.profile(StepClass::Standard);
            let height = AgentKind::Melee.body_shape().height();
            Some(NavGrid::from_colliders(
                &colliders,
                self.world.config.spawn.arena_half_size,
                nav.cell_size,
                standard.step_fraction * height,
                standard.assist_fraction * height,
            )?)
        } else {
            None
        };
        self.world.colliders = colliders;
        Ok(())
    }

    /// Install or remove the visual effects collaborator.
    pub fn set_effects(&mut self, effects: Option<Box<dyn Effects>>) {
        self.effects = effects;
    }

    /// Install or remove the audio collaborator.
    pub fn set_audio(&mut self, audio: Option<Box<dyn Audio>>) {
        self.audio = audio;
    }

    /// Replace the asset factory used for new agents.
    pub fn set_asset_factory(&mut self, factory: Box<dyn AssetFactory>) {
        self.factory = factory;
    }

    /// Replace the scene the display roots are attached to.
    pub fn set_scene(&mut self, scene: Box<dyn SceneSink>) {
        self.scene = scene;
    }

    /// Called with the wave number whenever a wave starts.
    pub fn on_wave(&mut self, callback: impl FnMut(u32) + 'static) {
        self.on_wave.push(Box::new(callback));
    }

    /// Called with `(alive, starting)` whenever the wave's alive count changes.
    pub fn on_remaining(&mut self, callback: impl FnMut(u32, u32) + 'static) {
        self.on_remaining.push(Box::new(callback));
    }

    // --- queries ---

    /// Wave counters.
    #[must_use]
    pub fn wave(&self) -> &WaveState {
        &self.wave
    }

    /// Tuning.
    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        &self.world.config
    }

    /// Live agents.
    #[must_use]
    pub fn agents(&self) -> &AgentStorage {
        &self.agents
    }

    /// Body of a live agent.
    #[must_use]
    pub fn body(&self, id: AgentId) -> Option<&AgentBody> {
        self.agents.get(id).map(|a| &a.body)
    }

    /// Behaviour status of a live agent.
    #[must_use]
    pub fn status(&self, id: AgentId) -> Option<BehaviorStatus> {
        self.agents.get(id).map(|a| a.behavior.status())
    }

    /// Live agents of one archetype, in registration order.
    #[must_use]
    pub fn ids_of(&self, kind: AgentKind) -> Vec<AgentId> {
        self.agents
            .sorted_ids()
            .into_iter()
            .filter(|id| self.agents.get(*id).is_some_and(|a| a.body.kind() == kind))
            .collect()
    }

    /// Live counts per role and kind.
    #[must_use]
    pub fn population(&self) -> &Population {
        &self.world.population
    }

    /// Boss lineages.
    #[must_use]
    pub fn lineages(&self) -> &LineageTable {
        &self.lineages
    }

    /// Staggered spawns not yet placed.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }

    /// Whether a boss encounter is running: a boss is alive or a lineage
    /// still has live members or queued copies.
    #[must_use]
    pub fn boss_active(&self) -> bool {
        self.world.population.role(SpawnRole::Boss) > 0 || self.lineages.is_active()
    }

    /// Last blackboard.
    #[must_use]
    pub fn blackboard(&self) -> &Blackboard {
        &self.world.blackboard
    }

    /// Simulated seconds since reset.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.world.time
    }

    /// The scene the display roots live in.
    #[must_use]
    pub fn scene(&self) -> &dyn SceneSink {
        self.scene.as_ref()
    }

    /// Hash of the simulation state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.wave.hash(&mut hasher);
        self.world.time.to_bits().hash(&mut hasher);
        self.pending.len().hash(&mut hasher);
        self.lineages.alive_total().hash(&mut hasher);

        let ids = self.agents.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(agent) = self.agents.get(id) {
                let body = &agent.body;
                id.hash(&mut hasher);
                body.kind().hash(&mut hasher);
                for v in [body.transform.position.x, body.transform.position.y, body.transform.position.z] {
                    v.to_bits().hash(&mut hasher);
                }
                body.transform.yaw.to_bits().hash(&mut hasher);
                body.meta.current_health.to_bits().hash(&mut hasher);
                body.meta.max_health.to_bits().hash(&mut hasher);
            }
        }
        hasher.finish()
    }

    // --- lifecycle ---

    /// Forget every agent and return to wave 1.
    pub fn reset(&mut self) {
        for id in self.agents.sorted_ids() {
            self.scene.detach(id);
        }
        self.agents.clear();
        self.directors.clear();
        self.pending.clear();
        self.lineages.clear();
        self.wave = WaveState::default();
        self.wave_in_progress = false;
        self.last_player = None;

        let config = self.world.config.clone();
        let colliders = std::mem::take(&mut self.world.colliders);
        let nav = self.world.nav.take();
        self.world = SimWorld::new(config, colliders, self.seed);
        self.world.nav = nav;
        info!(seed = self.seed, "Arena reset");
    }

    /// Override the wave counter, e.g. to start a run at a later wave.
    pub fn set_wave_number(&mut self, wave: u32) {
        self.wave.wave_number = wave.max(1);
    }

    /// Start the current wave: a staggered trickle, or a single boss on
    /// boss waves.
    pub fn start_wave(&mut self) {
        let wave_number = self.wave.wave_number;
        let plan = wave::plan(&self.world.config.waves, wave_number);
        let count = u32::try_from(plan.len()).unwrap_or(u32::MAX);
        self.wave.alive_count = self.wave.alive_count.saturating_add(count);
        self.wave.starting_alive_count = self.wave.alive_count;
        self.wave_in_progress = true;

        match plan {
            WavePlan::Trickle(kinds) => {
                info!(wave = wave_number, count, "Wave started");
                let (min, max) = (self.world.config.waves.stagger_min, self.world.config.waves.stagger_max);
                for kind in kinds {
                    let delay = self.world.rng.range(min, max);
                    self.pending.push_back(PendingSpawn { kind, delay });
                }
            }
            WavePlan::Boss(kind) => {
                info!(wave = wave_number, boss = %kind, "Boss encounter started");
                let id = self.world.ids.reserve();
                let behavior = behaviors::create(kind, &SpawnOptions::role(SpawnRole::Boss), &mut self.world.rng);
                self.insert_agent(id, kind, None, SpawnOptions::role(SpawnRole::Boss), behavior, true);
            }
        }

        for callback in &mut self.on_wave {
            callback(wave_number);
        }
        self.notify_remaining();
    }

    // --- host requests ---

    /// Spawn an archetype with its built-in behaviour. `position` is the
    /// point under the body; `None` picks a placement around the player.
    pub fn spawn_at(&mut self, kind: AgentKind, position: Option<Vec3>, options: SpawnOptions) -> AgentId {
        let id = self.world.ids.reserve();
        let behavior = behaviors::create(kind, &options, &mut self.world.rng);
        self.insert_agent(id, kind, position, options, behavior, false)
    }

    /// Spawn by archetype name. Unknown names fall back to melee.
    pub fn spawn_named(&mut self, name: &str, position: Option<Vec3>, options: SpawnOptions) -> AgentId {
        let kind = name.parse::<AgentKind>().unwrap_or_else(|err| {
            warn!(%err, "Falling back to melee archetype");
            AgentKind::Melee
        });
        self.spawn_at(kind, position, options)
    }

    /// Register an agent whose behaviour the host built.
    pub fn register_external_enemy(
        &mut self,
        kind: AgentKind,
        position: Option<Vec3>,
        behavior: Box<dyn Behavior>,
        options: SpawnOptions,
    ) -> AgentId {
        let id = self.world.ids.reserve();
        self.insert_agent(id, kind, position, options, behavior, false)
    }

    /// Apply a hit from the player. Returns the damage actually dealt; the
    /// agent is removed at once when the hit kills it.
    pub fn apply_hit(&mut self, id: AgentId, is_head: bool, damage: f32) -> Result<f32> {
        let head = self.world.config.combat.head_multiplier;
        let agent = self.agents.get_mut(id).ok_or(ArenaError::AgentNotFound(id))?;
        let scale = agent.behavior.incoming_damage_scale(&agent.body, is_head);
        let multiplier = if is_head { head } else { 1.0 };
        let dealt = agent.body.take_damage(damage * multiplier * scale);
        if agent.body.meta.is_dead() {
            self.world.commands.remove(id, RemovalCause::Killed);
            self.flush_removals();
            self.notify_remaining();
        }
        Ok(dealt)
    }

    /// Remove an agent at the host's request. Owned sub-entities go with it.
    pub fn remove(&mut self, id: AgentId) -> Result<()> {
        if !self.agents.contains(id) {
            return Err(ArenaError::AgentNotFound(id));
        }
        self.world.commands.remove(id, RemovalCause::Released);
        self.flush_removals();
        self.notify_remaining();
        Ok(())
    }

    // --- frame ---

    /// Advance the arena by `dt` seconds. Every hit on the player this frame
    /// is reported through `on_player_damage`.
    pub fn tick_ai(&mut self, player: &PlayerState, dt: f32, mut on_player_damage: impl FnMut(&PlayerHit)) {
        let alive_before = self.wave.alive_count;
        self.world.time += dt;
        self.update_blackboard(player, dt);
        self.release_staggered(player, dt);

        let ids = self.agents.sorted_ids();
        self.world.snapshot = ids
            .iter()
            .filter_map(|id| self.agents.get(*id))
            .map(|a| AgentSnapshot::of(&a.body))
            .collect();

        for &id in &ids {
            if self.world.commands.removing(id) {
                continue;
            }
            let Some(agent) = self.agents.get_mut(id) else {
                continue;
            };
            let before = agent.body.position();
            let mut ctx = self.world.context(player);
            agent.behavior.update(&mut agent.body, &mut ctx, dt);
            if dt > 0.0 {
                agent.body.velocity = (agent.body.position() - before) / dt;
            }
            agent.body.rig.sync_root(&agent.body.transform);
            if agent.behavior.should_remove(&agent.body) {
                self.world.commands.remove(id, RemovalCause::Expired);
            }
        }

        self.commit_heals();
        self.commit_agent_damage();
        for hit in std::mem::take(&mut self.world.commands.player_hits) {
            on_player_damage(&hit);
        }

        for id in self.agents.sorted_ids() {
            let dead = self.agents.get(id).is_some_and(|a| a.body.meta.is_dead());
            if dead && !self.world.commands.removing(id) {
                self.world.commands.remove(id, RemovalCause::Killed);
            }
        }
        self.flush_removals();

        self.run_directors(player, dt);
        self.register_spawns();

        let requests = std::mem::take(&mut self.world.commands.fx);
        fx::dispatch(requests, self.effects.as_deref_mut(), self.audio.as_deref_mut());

        #[cfg(feature = "debug-validation")]
        self.validate_scene();

        self.last_player = Some(*player);
        if self.wave.alive_count != alive_before {
            self.notify_remaining();
        }
        self.maybe_advance_wave();
    }

    fn update_blackboard(&mut self, player: &PlayerState, dt: f32) {
        let velocity = match self.last_player {
            Some(last) if dt > 0.0 => (player.position - last.position) / dt,
            _ => Vec3::ZERO,
        };
        let waves = &self.world.config.waves;
        let starting = self.wave.starting_alive_count;
        self.world.blackboard = Blackboard {
            player_forward: safe_normalize(flat(player.forward)).unwrap_or(Vec3::Z),
            player_velocity: velocity,
            player_speed: velocity.length(),
            suppression: self.wave.alive_count >= waves.suppression_count,
            regroup: starting > 0
                && self.wave.alive_count > 0
                && self.wave.remaining_fraction() <= waves.regroup_fraction,
            wave_number: self.wave.wave_number,
            alive_count: self.wave.alive_count,
            boss_active: self.boss_active(),
        };
    }

    fn release_staggered(&mut self, player: &PlayerState, dt: f32) {
        self.last_player.get_or_insert(*player);
        let mut budget = dt;
        while let Some(front) = self.pending.front_mut() {
            if front.delay > budget {
                front.delay -= budget;
                break;
            }
            budget -= front.delay;
            let kind = front.kind;
            self.pending.pop_front();
            let id = self.world.ids.reserve();
            let options = SpawnOptions::role(SpawnRole::Wave);
            let behavior = behaviors::create(kind, &options, &mut self.world.rng);
            self.insert_agent(id, kind, None, options, behavior, true);
        }

        let caps = &self.world.config.caps;
        let released = self
            .lineages
            .release(dt, caps.split_spawns_per_tick, caps.split_spawn_interval);
        for request in released {
            self.spawn_split(request);
        }
    }

    fn spawn_split(&mut self, request: SplitRequest) {
        let p = request.position;
        let ground = self.world.colliders.ground_height(p.x, p.z, p.y, 0.25);
        let jitter = Vec3::new(self.world.rng.range(-1.0, 1.0), 0.0, self.world.rng.range(-1.0, 1.0));
        let options = SpawnOptions {
            role: SpawnRole::Lineage,
            scale: request.scale,
            health_scale: Some(request.health_scale),
            lineage: Some(LineageTag {
                lineage: request.lineage,
                generation: request.generation,
            }),
            counts_toward_wave: Some(false),
            ..SpawnOptions::default()
        };
        let id = self.world.ids.reserve();
        let behavior = behaviors::create(AgentKind::Splitter, &options, &mut self.world.rng);
        self.insert_agent(id, AgentKind::Splitter, Some(Vec3::new(p.x, ground, p.z) + jitter), options, behavior, false);
        debug!(agent = %id, lineage = request.lineage.0, generation = request.generation, "Split copy spawned");
    }

    fn commit_heals(&mut self) {
        let heals = std::mem::take(&mut self.world.commands.heals);
        let mut best: BTreeMap<AgentId, f32> = BTreeMap::new();
        for heal in heals {
            let entry = best.entry(heal.target).or_insert(0.0);
            *entry = entry.max(heal.amount);
        }
        for (target, amount) in best {
            if let Some(agent) = self.agents.get_mut(target) {
                agent.body.heal(amount);
            }
        }
    }

    fn commit_agent_damage(&mut self) {
        for damage in std::mem::take(&mut self.world.commands.agent_damage) {
            if let Some(agent) = self.agents.get_mut(damage.target) {
                let scale = agent.behavior.incoming_damage_scale(&agent.body, false);
                agent.body.take_damage(damage.amount * scale);
            }
        }
    }

    /// Remove queued agents until no removal is left; cleanup hooks may
    /// queue more.
    fn flush_removals(&mut self) {
        loop {
            let removals = std::mem::take(&mut self.world.commands.removals);
            if removals.is_empty() {
                break;
            }
            for (id, cause) in removals {
                self.remove_agent(id, cause);
            }
        }
        self.queue_splits();
    }

    fn queue_splits(&mut self) {
        for split in std::mem::take(&mut self.world.commands.splits) {
            debug!(lineage = split.lineage.0, generation = split.generation, "Split queued");
            self.lineages.enqueue(split);
        }
    }

    fn remove_agent(&mut self, id: AgentId, cause: RemovalCause) {
        let Some(mut agent) = self.agents.remove(id) else {
            return;
        };
        agent
            .behavior
            .on_removed(&agent.body, cause, &mut self.world.commands);
        // Copies must be queued before the lineage loses this member
        self.queue_splits();
        if let Some(mut director) = self.directors.remove(&id) {
            director.release(&mut self.world.commands);
        }
        self.scene.detach(id);
        self.world.population.remove(agent.body.kind(), agent.body.role);
        if let Some(tag) = agent.body.lineage {
            self.lineages.member_removed(tag.lineage);
        }
        if agent.body.counts_toward_wave {
            self.wave.alive_count = self.wave.alive_count.saturating_sub(1);
        }
        debug!(agent = %id, kind = %agent.body.kind(), ?cause, "Agent removed");
    }

    fn run_directors(&mut self, player: &PlayerState, dt: f32) {
        let ids: Vec<AgentId> = self.directors.keys().copied().collect();
        for id in ids {
            let Some(boss) = self.agents.get(id).map(|a| AgentSnapshot::of(&a.body)) else {
                continue;
            };
            let Some(director) = self.directors.get_mut(&id) else {
                continue;
            };
            let mut ctx = self.world.context(player);
            director.update(&boss, &mut ctx, dt);
        }
    }

    fn register_spawns(&mut self) {
        let spawns = std::mem::take(&mut self.world.commands.spawns);
        for request in spawns {
            let behavior = behaviors::create(request.kind, &request.options, &mut self.world.rng);
            self.insert_agent(request.id, request.kind, request.position, request.options, behavior, false);
        }
    }

    /// Build the body, attach the rig and register the agent. `feet` is the
    /// point under the body. `precounted` spawns were already added to the
    /// wave's alive count when the wave started.
    fn insert_agent(
        &mut self,
        id: AgentId,
        kind: AgentKind,
        feet: Option<Vec3>,
        mut options: SpawnOptions,
        behavior: Box<dyn Behavior>,
        precounted: bool,
    ) -> AgentId {
        let base = kind.body_shape();
        let scale = if options.scale > 0.0 { options.scale } else { 1.0 };
        let shape = BodyShape::new(base.half_height * scale, base.footprint * scale, base.class);
        let player = self.last_player.unwrap_or_default();

        let position = match feet {
            Some(p) => Vec3::new(p.x, p.y + shape.half_height, p.z),
            None => {
                let placement = place_spawn(
                    &self.world.colliders,
                    &self.world.config.spawn,
                    &player,
                    &shape,
                    &mut self.world.rng,
                );
                placement.position
            }
        };
        let yaw = options.yaw.unwrap_or_else(|| {
            flat_direction(position, player.position).map_or(0.0, |d| yaw_of(d, 0.0))
        });

        if kind == AgentKind::Splitter && options.lineage.is_none() {
            let cap = self.world.config.caps.lineage_population_cap;
            options.lineage = Some(LineageTag {
                lineage: self.lineages.create(kind, cap),
                generation: 0,
            });
        }

        let waves = &self.world.config.waves;
        let wave_number = self.wave.wave_number;
        let health = kind.base_health()
            * options
                .health_scale
                .unwrap_or_else(|| wave::health_scale(waves, wave_number));
        let damage = options
            .damage_multiplier
            .unwrap_or_else(|| wave::damage_scale(waves, wave_number));
        let mut asset_options = AssetOptions {
            scale,
            ..AssetOptions::default()
        };
        if let Some(palette) = options.palette {
            asset_options.palette = palette;
        }
        let mut rig = self.factory.create(kind, &asset_options);
        let transform = Transform::at(position, yaw);
        rig.sync_root(&transform);

        let counts = options.counts();
        let body = AgentBody {
            id,
            meta: AgentMeta::new(kind, health, damage),
            transform,
            velocity: Vec3::ZERO,
            shape,
            rig,
            owner: options.owner,
            lineage: options.lineage,
            role: options.role,
            counts_toward_wave: counts,
            scale,
        };

        if kind.is_boss() && !behavior.self_manages_cadence() {
            self.directors.insert(id, BossDirector::new(id));
        }
        self.scene.attach(id, &body.rig);
        self.world.population.add(kind, options.role);
        if counts && !precounted {
            self.wave.alive_count += 1;
            self.wave.starting_alive_count = self.wave.starting_alive_count.max(self.wave.alive_count);
        }
        debug!(agent = %id, kind = %kind, role = ?options.role, x = position.x, z = position.z, "Agent spawned");
        self.agents.insert(Agent { body, behavior });
        id
    }

    fn notify_remaining(&mut self) {
        let (alive, starting) = (self.wave.alive_count, self.wave.starting_alive_count);
        for callback in &mut self.on_remaining {
            callback(alive, starting);
        }
    }

    fn maybe_advance_wave(&mut self) {
        if !self.wave_in_progress
            || self.wave.alive_count > 0
            || !self.pending.is_empty()
            || self.boss_active()
        {
            return;
        }
        info!(wave = self.wave.wave_number, "Wave cleared");
        self.wave.wave_number += 1;
        self.wave.starting_alive_count = 0;
        self.start_wave();
    }

    #[cfg(feature = "debug-validation")]
    fn validate_scene(&self) {
        for (id, _) in self.agents.iter() {
            debug_assert!(self.scene.contains(*id), "agent {id} missing from scene");
        }
        debug_assert_eq!(self.scene.len(), self.agents.len(), "scene and registry out of step");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::context::TickContext;
    use crate::fx::RecordingEffects;

    const DT: f32 = 1.0 / 60.0;

    fn player() -> PlayerState {
        PlayerState::default()
    }

    fn run(manager: &mut EnemyManager, frames: usize) -> Vec<PlayerHit> {
        let mut hits = Vec::new();
        let player = player();
        for _ in 0..frames {
            manager.tick_ai(&player, DT, |hit| hits.push(*hit));
        }
        hits
    }

    #[derive(Debug)]
    struct Idle;

    impl Behavior for Idle {
        fn update(&mut self, _body: &mut AgentBody, _ctx: &mut TickContext<'_>, _dt: f32) {}

        fn status(&self) -> BehaviorStatus {
            BehaviorStatus::phase("idle")
        }
    }

    #[derive(Debug)]
    struct Healer {
        target: AgentId,
        amount: f32,
    }

    impl Behavior for Healer {
        fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, _dt: f32) {
            ctx.propose_heal(body.id, self.target, self.amount);
        }

        fn status(&self) -> BehaviorStatus {
            BehaviorStatus::phase("heal")
        }
    }

    #[derive(Debug)]
    struct Striker {
        target: AgentId,
    }

    impl Behavior for Striker {
        fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, _dt: f32) {
            ctx.damage_agent(body.id, self.target, 5.0);
        }

        fn status(&self) -> BehaviorStatus {
            BehaviorStatus::phase("strike")
        }
    }

    fn idle(manager: &mut EnemyManager, x: f32, z: f32) -> AgentId {
        manager.register_external_enemy(
            AgentKind::Melee,
            Some(Vec3::new(x, 0.0, z)),
            Box::new(Idle),
            SpawnOptions::default(),
        )
    }

    #[test]
    fn test_trickle_wave_counts_pending_spawns() {
        let mut manager = EnemyManager::with_seed(1);
        manager.start_wave();
        assert_eq!(manager.wave().alive_count, 11);
        assert_eq!(manager.pending_spawns(), 11);
        assert!(manager.agents().is_empty());
        run(&mut manager, 60 * 6);
        assert_eq!(manager.pending_spawns(), 0);
        assert_eq!(manager.agents().len(), 11);
        assert_eq!(manager.wave().alive_count, 11);
    }

    #[test]
    fn test_wave_advances_only_when_cleared() {
        let mut manager = EnemyManager::with_seed(2);
        manager.start_wave();
        run(&mut manager, 60 * 6);
        let ids = manager.agents().sorted_ids();
        for id in &ids[..ids.len() - 1] {
            manager.remove(*id).unwrap();
        }
        run(&mut manager, 1);
        assert_eq!(manager.wave().wave_number, 1);
        manager.remove(ids[ids.len() - 1]).unwrap();
        run(&mut manager, 1);
        assert_eq!(manager.wave().wave_number, 2);
        assert_eq!(manager.wave().alive_count, 12);
    }

    #[test]
    fn test_no_advance_before_first_wave() {
        let mut manager = EnemyManager::with_seed(3);
        run(&mut manager, 10);
        assert_eq!(manager.wave().wave_number, 1);
        assert!(manager.agents().is_empty());
    }

    #[test]
    fn test_apply_hit_head_multiplier_and_kill() {
        let mut manager = EnemyManager::with_seed(4);
        let id = idle(&mut manager, 0.0, -10.0);
        assert_eq!(manager.wave().alive_count, 1);
        let body_dealt = manager.apply_hit(id, false, 10.0).unwrap();
        assert!((body_dealt - 10.0).abs() < 1e-4);
        let head_dealt = manager.apply_hit(id, true, 10.0).unwrap();
        assert!((head_dealt - 17.5).abs() < 1e-4);
        manager.apply_hit(id, false, 10_000.0).unwrap();
        assert!(manager.body(id).is_none());
        assert!(!manager.scene().contains(id));
        assert_eq!(manager.wave().alive_count, 0);
        assert!(matches!(manager.apply_hit(id, false, 1.0), Err(ArenaError::AgentNotFound(_))));
    }

    #[test]
    fn test_largest_heal_wins_and_clamps() {
        let mut manager = EnemyManager::with_seed(5);
        let target = idle(&mut manager, 0.0, -10.0);
        manager.apply_hit(target, false, 20.0).unwrap();
        let max = manager.body(target).unwrap().meta.max_health;
        for amount in [4.0, 9.0, 6.0] {
            manager.register_external_enemy(
                AgentKind::Healer,
                Some(Vec3::new(amount, 0.0, -12.0)),
                Box::new(Healer { target, amount }),
                SpawnOptions::default(),
            );
        }
        run(&mut manager, 1);
        let health = manager.body(target).unwrap().meta.current_health;
        assert!((health - (max - 11.0)).abs() < 1e-3);
        run(&mut manager, 5);
        assert_eq!(manager.body(target).unwrap().meta.current_health, max);
    }

    #[test]
    fn test_agent_damage_lands_after_pass() {
        let mut manager = EnemyManager::with_seed(6);
        let target = idle(&mut manager, 0.0, -10.0);
        let max = manager.body(target).unwrap().meta.max_health;
        manager.register_external_enemy(
            AgentKind::Melee,
            Some(Vec3::new(2.0, 0.0, -10.0)),
            Box::new(Striker { target }),
            SpawnOptions::default(),
        );
        run(&mut manager, 2);
        assert!((manager.body(target).unwrap().meta.current_health - (max - 10.0)).abs() < 1e-3);
    }

    #[test]
    fn test_spawn_named_falls_back_to_melee() {
        let mut manager = EnemyManager::with_seed(7);
        let id = manager.spawn_named("dragon", Some(Vec3::new(0.0, 0.0, -8.0)), SpawnOptions::default());
        assert_eq!(manager.body(id).unwrap().kind(), AgentKind::Melee);
        let id = manager.spawn_named("Sniper", None, SpawnOptions::default());
        assert_eq!(manager.body(id).unwrap().kind(), AgentKind::Sniper);
    }

    #[test]
    fn test_callbacks_fire() {
        let mut manager = EnemyManager::with_seed(8);
        let waves = Rc::new(RefCell::new(Vec::new()));
        let remaining = Rc::new(RefCell::new(Vec::new()));
        let w = Rc::clone(&waves);
        manager.on_wave(move |n| w.borrow_mut().push(n));
        let r = Rc::clone(&remaining);
        manager.on_remaining(move |alive, _| r.borrow_mut().push(alive));
        manager.start_wave();
        assert_eq!(*waves.borrow(), vec![1]);
        assert_eq!(remaining.borrow().last().copied(), Some(11));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut manager = EnemyManager::with_seed(9);
        manager.start_wave();
        run(&mut manager, 60);
        manager.reset();
        assert!(manager.agents().is_empty());
        assert!(manager.scene().is_empty());
        assert_eq!(*manager.wave(), WaveState::default());
        assert_eq!(manager.time(), 0.0);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let hash = |seed| {
            let mut manager = EnemyManager::with_seed(seed);
            manager.start_wave();
            run(&mut manager, 120);
            manager.state_hash()
        };
        assert_eq!(hash(11), hash(11));
    }

    #[test]
    fn test_effects_dispatched_to_collaborator() {
        #[derive(Debug, Clone, Default)]
        struct Shared(Rc<RefCell<RecordingEffects>>);

        impl Effects for Shared {
            fn ring(&mut self, position: Vec3, radius: f32, color: u32) {
                self.0.borrow_mut().ring(position, radius, color);
            }

            fn ground_slam(&mut self, position: Vec3, radius: f32) {
                self.0.borrow_mut().ground_slam(position, radius);
            }

            fn line(&mut self, from: Vec3, to: Vec3, color: u32) {
                self.0.borrow_mut().line(from, to, color);
            }
        }

        let mut manager = EnemyManager::with_seed(10);
        let shared = Shared::default();
        manager.set_effects(Some(Box::new(shared.clone())));
        manager.set_wave_number(5);
        manager.start_wave();
        run(&mut manager, 60 * 12);
        assert!(!shared.0.borrow().log.is_empty());
    }

    #[test]
    fn test_boss_removal_releases_director_adds() {
        let mut manager = EnemyManager::with_seed(12);
        manager.set_wave_number(5);
        manager.start_wave();
        let boss = manager.agents().sorted_ids()[0];
        assert_eq!(manager.body(boss).unwrap().kind(), AgentKind::Juggernaut);
        run(&mut manager, 60 * 8);
        manager.remove(boss).unwrap();
        assert_eq!(manager.population().role(SpawnRole::BossAdd), 0);
        assert_eq!(manager.population().role(SpawnRole::Boss), 0);
    }
}
