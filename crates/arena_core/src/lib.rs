//! # Arena Core
//!
//! Enemy simulation kernel for a wave-survival arena.
//!
//! This crate contains **only** simulation logic:
//! - No rendering (visual handles are opaque [`rig::Rig`] knobs)
//! - No IO
//! - No system randomness (every roll goes through a seeded [`rng::SimRng`])
//!
//! The host drives one [`manager::EnemyManager`] per arena: it starts waves,
//! ticks the simulation with the player pose, forwards player hits and
//! receives damage callbacks.
//!
//! ## Crate Structure
//!
//! - [`manager`] - Registry, frame loop, wave lifecycle
//! - [`context`] - Per-update view agents read from and queue requests on
//! - [`agent`] - Agent body, archetypes and the [`agent::Behavior`] trait
//! - [`behaviors`] - Regular archetype state machines
//! - [`bosses`] - Multi-phase boss machines and the boss add director
//! - [`movement`] - Step-aware collision movement
//! - [`steering`] - Obstacle avoidance, separation, line of sight
//! - [`spatial`] - Static collider boxes and ray queries
//! - [`navigation`] - Optional grid path-finding
//! - [`wave`] - Wave composition and scaling
//! - [`lineage`] - Splitting boss lineages and the split queue
//! - [`config`] - RON tuning tables

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod agent;
pub mod behaviors;
pub mod bosses;
pub mod config;
pub mod context;
pub mod error;
pub mod fx;
pub mod lineage;
pub mod manager;
pub mod math;
pub mod movement;
pub mod navigation;
pub mod projectile;
pub mod rig;
pub mod rng;
pub mod spatial;
pub mod spawn;
pub mod steering;
pub mod wave;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::{
        AgentBody, AgentId, AgentKind, AgentMeta, Behavior, BehaviorStatus, RemovalCause,
    };
    pub use crate::config::ArenaConfig;
    pub use crate::context::{CommandBuffer, PlayerHit, PlayerState, TickContext};
    pub use crate::error::{ArenaError, Result};
    pub use crate::fx::{Audio, Effects, FxRequest};
    pub use crate::manager::EnemyManager;
    pub use crate::math::Vec3;
    pub use crate::movement::{BodyShape, StepClass};
    pub use crate::rig::{AssetFactory, AttachPoint, Rig, SceneSink};
    pub use crate::spatial::{Aabb, ColliderSet};
    pub use crate::spawn::{SpawnOptions, SpawnRole};
    pub use crate::wave::WaveState;
}
