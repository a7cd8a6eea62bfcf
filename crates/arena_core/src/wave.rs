//! Wave bookkeeping and composition.
//!
//! A trickle wave fields `base_count + wave` agents. Archetypes other than
//! melee unlock at their configured wave and take a growing share of the
//! wave; melee fills the remainder. Every `boss_interval`th wave is a boss
//! encounter instead, picked from [`AgentKind::BOSS_ROTATION`].

use serde::{Deserialize, Serialize};

use crate::agent::AgentKind;
use crate::config::WaveConfig;

/// Process-wide wave counters, mutated only by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveState {
    /// Current wave, starting at 1.
    pub wave_number: u32,
    /// Agents still counting toward the wave, including staggered spawns
    /// not yet placed.
    pub alive_count: u32,
    /// `alive_count` right after the wave started.
    pub starting_alive_count: u32,
}

impl Default for WaveState {
    fn default() -> Self {
        Self {
            wave_number: 1,
            alive_count: 0,
            starting_alive_count: 0,
        }
    }
}

impl WaveState {
    /// Fraction of the wave still alive.
    #[must_use]
    pub fn remaining_fraction(&self) -> f32 {
        if self.starting_alive_count == 0 {
            0.0
        } else {
            self.alive_count as f32 / self.starting_alive_count as f32
        }
    }
}

/// What a wave fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WavePlan {
    /// Staggered trickle of regular archetypes, in spawn order.
    Trickle(Vec<AgentKind>),
    /// A single boss.
    Boss(AgentKind),
}

impl WavePlan {
    /// Agents the plan fields.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Trickle(kinds) => kinds.len(),
            Self::Boss(_) => 1,
        }
    }

    /// Whether the plan fields nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether `wave` is a boss encounter.
#[must_use]
pub fn is_boss_wave(config: &WaveConfig, wave: u32) -> bool {
    config.boss_interval > 0 && wave > 0 && wave % config.boss_interval == 0
}

/// Boss fielded on a boss wave.
#[must_use]
pub fn boss_for_wave(config: &WaveConfig, wave: u32) -> AgentKind {
    let encounter = (wave / config.boss_interval.max(1)).saturating_sub(1) as usize;
    AgentKind::BOSS_ROTATION[encounter % AgentKind::BOSS_ROTATION.len()]
}

/// Agents in a trickle wave.
#[must_use]
pub fn trickle_count(config: &WaveConfig, wave: u32) -> u32 {
    config.base_count + wave
}

/// Per-archetype counts of a trickle wave; melee takes the remainder.
#[must_use]
pub fn composition(config: &WaveConfig, wave: u32) -> Vec<(AgentKind, u32)> {
    let total = trickle_count(config, wave);
    let mut assigned = 0;
    let mut counts = Vec::new();
    for rule in &config.unlocks {
        let share = rule.share_at(wave);
        if share <= 0.0 {
            continue;
        }
        let n = ((total as f32 * share).floor() as u32).min(total - assigned);
        if n > 0 {
            counts.push((rule.kind, n));
            assigned += n;
        }
    }
    let melee = total - assigned;
    if melee > 0 {
        counts.insert(0, (AgentKind::Melee, melee));
    }
    counts
}

/// Plan for `wave`.
#[must_use]
pub fn plan(config: &WaveConfig, wave: u32) -> WavePlan {
    if is_boss_wave(config, wave) {
        return WavePlan::Boss(boss_for_wave(config, wave));
    }
    let kinds = composition(config, wave)
        .into_iter()
        .flat_map(|(kind, n)| std::iter::repeat(kind).take(n as usize))
        .collect();
    WavePlan::Trickle(kinds)
}

/// Max-health multiplier for agents spawned in `wave`.
#[must_use]
pub fn health_scale(config: &WaveConfig, wave: u32) -> f32 {
    1.0 + config.health_scale_per_wave * wave.saturating_sub(1) as f32
}

/// Outgoing damage multiplier for agents spawned in `wave`.
#[must_use]
pub fn damage_scale(config: &WaveConfig, wave: u32) -> f32 {
    1.0 + config.damage_scale_per_wave * wave.saturating_sub(1) as f32
}
