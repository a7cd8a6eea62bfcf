//! Tuning tables for the arena simulation.
//!
//! Everything here is plain data that deserializes from RON, mirroring how
//! unit and faction data are kept out of code. [`ArenaConfig::default`] is
//! the shipped tuning; tests and tools override sections from RON text.
//!
//! # Example RON
//!
//! ```ron
//! ArenaConfig(
//!     waves: WaveConfig(
//!         base_count: 10,
//!         boss_interval: 5,
//!     ),
//!     caps: CapConfig(
//!         max_swarm_minions: 16,
//!     ),
//! )
//! ```
//!
//! Sections and fields omitted from the text keep their defaults.

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::error::{ArenaError, Result};
use crate::movement::{StepClass, StepProfile};

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArenaConfig {
    /// Step-climb tolerances per body class.
    pub movement: MovementConfig,
    /// Wave sizing and composition.
    pub waves: WaveConfig,
    /// Spawn placement.
    pub spawn: SpawnConfig,
    /// Global resource caps.
    pub caps: CapConfig,
    /// Shared steering parameters.
    pub steering: SteeringConfig,
    /// Damage rules applied by the manager.
    pub combat: CombatConfig,
    /// Optional navigation grid.
    pub navigation: NavigationConfig,
}

impl ArenaConfig {
    /// Parse a configuration from RON text and validate it.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(text).map_err(|source| ArenaError::ConfigParse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the simulation relies on.
    pub fn validate(&self) -> Result<()> {
        for class in [StepClass::Light, StepClass::Standard, StepClass::Heavy] {
            let p = self.movement.profile(class);
            if !(p.step_fraction >= 0.0
                && p.step_fraction <= p.assist_fraction
                && p.max_lift_fraction > 0.0)
            {
                return Err(ArenaError::InvalidConfig(format!(
                    "{class:?} step profile must satisfy 0 <= step <= assist and lift > 0"
                )));
            }
        }
        if self.movement.heavy.assist_fraction >= self.movement.standard.assist_fraction {
            return Err(ArenaError::InvalidConfig(
                "heavy assist threshold must be below the standard one".into(),
            ));
        }
        if self.waves.boss_interval == 0 {
            return Err(ArenaError::InvalidConfig("boss_interval must be positive".into()));
        }
        if self.spawn.ring_min > self.spawn.ring_max {
            return Err(ArenaError::InvalidConfig("spawn ring_min exceeds ring_max".into()));
        }
        if self.caps.split_spawns_per_tick == 0 {
            return Err(ArenaError::InvalidConfig(
                "split_spawns_per_tick must be positive".into(),
            ));
        }
        if self.navigation.cell_size <= 0.0 {
            return Err(ArenaError::InvalidConfig("navigation cell_size must be positive".into()));
        }
        Ok(())
    }
}

/// Step profiles for each [`StepClass`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Rushers, minions and small hazards.
    pub light: StepProfile,
    /// Most infantry archetypes.
    pub standard: StepProfile,
    /// Tanks, carriers and bosses.
    pub heavy: StepProfile,
    /// Clearance added to probe boxes so touching surfaces do not count as overlap.
    pub probe_epsilon: f32,
}

impl MovementConfig {
    /// Profile for a body class.
    #[must_use]
    pub fn profile(&self, class: StepClass) -> &StepProfile {
        match class {
            StepClass::Light => &self.light,
            StepClass::Standard => &self.standard,
            StepClass::Heavy => &self.heavy,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            light: StepProfile {
                step_fraction: 0.15,
                assist_fraction: 0.45,
                max_lift_fraction: 0.45,
            },
            standard: StepProfile {
                step_fraction: 0.12,
                assist_fraction: 0.40,
                max_lift_fraction: 0.40,
            },
            heavy: StepProfile {
                step_fraction: 0.12,
                assist_fraction: 0.30,
                max_lift_fraction: 0.15,
            },
            probe_epsilon: 1e-3,
        }
    }
}

/// Wave sizing, unlock thresholds and scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Agents in a trickle wave before the per-wave increment.
    pub base_count: u32,
    /// Every Nth wave is a boss encounter.
    pub boss_interval: u32,
    /// Unlock curves for the non-default archetypes.
    pub unlocks: Vec<UnlockRule>,
    /// Smallest delay between staggered spawns, seconds.
    pub stagger_min: f32,
    /// Largest delay between staggered spawns, seconds.
    pub stagger_max: f32,
    /// Max-health multiplier gained per wave after the first.
    pub health_scale_per_wave: f32,
    /// Outgoing damage multiplier gained per wave after the first.
    pub damage_scale_per_wave: f32,
    /// Live-count fraction below which the blackboard raises `regroup`.
    pub regroup_fraction: f32,
    /// Live count at or above which the blackboard raises `suppression`.
    pub suppression_count: u32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            base_count: 10,
            boss_interval: 5,
            unlocks: vec![
                UnlockRule::new(AgentKind::Rusher, 2, 0.10, 0.02, 0.25),
                UnlockRule::new(AgentKind::Shooter, 3, 0.10, 0.02, 0.25),
                UnlockRule::new(AgentKind::Tank, 4, 0.05, 0.01, 0.15),
                UnlockRule::new(AgentKind::Healer, 6, 0.05, 0.01, 0.10),
                UnlockRule::new(AgentKind::Sniper, 7, 0.05, 0.01, 0.10),
                UnlockRule::new(AgentKind::Flyer, 8, 0.05, 0.01, 0.15),
                UnlockRule::new(AgentKind::SwarmCarrier, 9, 0.04, 0.005, 0.08),
            ],
            stagger_min: 0.08,
            stagger_max: 0.35,
            health_scale_per_wave: 0.06,
            damage_scale_per_wave: 0.04,
            regroup_fraction: 0.25,
            suppression_count: 8,
        }
    }
}

/// Share of a wave given to one archetype once unlocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockRule {
    /// Archetype this rule controls.
    pub kind: AgentKind,
    /// First wave the archetype appears in.
    pub unlock_wave: u32,
    /// Share at the unlock wave.
    pub base_share: f32,
    /// Share gained per wave after unlocking.
    pub share_per_wave: f32,
    /// Upper bound on the share.
    pub max_share: f32,
}

impl UnlockRule {
    /// Create a rule.
    #[must_use]
    pub fn new(
        kind: AgentKind,
        unlock_wave: u32,
        base_share: f32,
        share_per_wave: f32,
        max_share: f32,
    ) -> Self {
        Self {
            kind,
            unlock_wave,
            base_share,
            share_per_wave,
            max_share,
        }
    }

    /// Share of the wave at `wave`, zero before unlocking.
    #[must_use]
    pub fn share_at(&self, wave: u32) -> f32 {
        if wave < self.unlock_wave {
            return 0.0;
        }
        let waves_since = (wave - self.unlock_wave) as f32;
        (self.base_share + self.share_per_wave * waves_since).min(self.max_share)
    }
}

/// Spawn placement rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Inner spawn ring radius around the player.
    pub ring_min: f32,
    /// Outer spawn ring radius around the player.
    pub ring_max: f32,
    /// Candidates sampled per placement.
    pub candidates: u32,
    /// Candidates with `dot(player_forward, dir) <=` this count as off-screen.
    pub behind_dot: f32,
    /// Extra clearance around the spawn footprint.
    pub clearance: f32,
    /// Half-size of the square arena; placements are clamped inside it.
    pub arena_half_size: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            ring_min: 16.0,
            ring_max: 26.0,
            candidates: 24,
            behind_dot: -0.1,
            clearance: 0.4,
            arena_half_size: 48.0,
        }
    }
}

/// Global population and rate caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapConfig {
    /// Hard cap on simultaneously live agents of every kind.
    pub max_live_agents: u32,
    /// Cap on live swarm minions across all carriers.
    pub max_swarm_minions: u32,
    /// Cap on live boss adds across all bosses.
    pub max_boss_adds: u32,
    /// Cap on live hazards.
    pub max_hazards: u32,
    /// Live descendants allowed per splitting lineage.
    pub lineage_population_cap: u32,
    /// Split spawns released per tick.
    pub split_spawns_per_tick: u32,
    /// Minimum seconds between split releases.
    pub split_spawn_interval: f32,
    /// Minimum seconds between any two sniper shots arena-wide.
    pub sniper_volley_interval: f32,
}

impl Default for CapConfig {
    fn default() -> Self {
        Self {
            max_live_agents: 72,
            max_swarm_minions: 18,
            max_boss_adds: 10,
            max_hazards: 16,
            lineage_population_cap: 12,
            split_spawns_per_tick: 2,
            split_spawn_interval: 0.15,
            sniper_volley_interval: 0.9,
        }
    }
}

/// Shared steering parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringConfig {
    /// Neighbour radius for separation.
    pub separation_radius: f32,
    /// Weight of the separation vector against the desire vector.
    pub separation_weight: f32,
    /// Look-ahead for the obstacle probe.
    pub avoidance_probe: f32,
    /// Height offsets sampled by line-of-sight checks.
    pub los_offsets: Vec<f32>,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            separation_radius: 1.6,
            separation_weight: 0.9,
            avoidance_probe: 2.4,
            los_offsets: vec![0.0, 0.45],
        }
    }
}

/// Damage rules applied on incoming hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Multiplier for hits flagged as head shots.
    pub head_multiplier: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            head_multiplier: 1.75,
        }
    }
}

/// Optional navigation grid built from the static colliders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Build a grid when colliders are installed.
    pub enabled: bool,
    /// Grid cell edge in world units.
    pub cell_size: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_size: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ArenaConfig::default().validate().unwrap();
    }

    #[test]
    fn test_heavy_assist_below_standard() {
        let config = ArenaConfig::default();
        assert!(
            config.movement.heavy.assist_fraction < config.movement.standard.assist_fraction
        );
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = ArenaConfig::from_ron_str(
            "ArenaConfig(waves: WaveConfig(base_count: 12), caps: CapConfig(max_swarm_minions: 4))",
        )
        .unwrap();
        assert_eq!(config.waves.base_count, 12);
        assert_eq!(config.waves.boss_interval, 5);
        assert_eq!(config.caps.max_swarm_minions, 4);
        assert_eq!(config.caps.max_boss_adds, CapConfig::default().max_boss_adds);
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let err = ArenaConfig::from_ron_str("ArenaConfig(waves: 3").unwrap_err();
        assert!(matches!(err, ArenaError::ConfigParse { .. }));
    }

    #[test]
    fn test_inverted_heavy_profile_rejected() {
        let mut config = ArenaConfig::default();
        config.movement.heavy.assist_fraction = 0.5;
        assert!(matches!(config.validate(), Err(ArenaError::InvalidConfig(_))));
    }

    #[test]
    fn test_unlock_share_curve() {
        let rule = UnlockRule::new(AgentKind::Shooter, 3, 0.1, 0.05, 0.2);
        assert_eq!(rule.share_at(2), 0.0);
        assert!((rule.share_at(3) - 0.1).abs() < 1e-6);
        assert!((rule.share_at(10) - 0.2).abs() < 1e-6);
    }
}
