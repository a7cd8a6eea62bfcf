//! Error types for the enemy simulation kernel.
//!
//! The per-frame simulation itself never fails; errors only surface at the
//! configuration, lookup and path-finding boundaries.

use thiserror::Error;

use crate::agent::AgentId;

/// Result type alias using [`ArenaError`].
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Top-level error type for the arena simulation.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Failed to parse RON configuration text.
    #[error("Failed to parse arena config: {source}")]
    ConfigParse {
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Configuration parsed but holds values the simulation cannot run with.
    #[error("Invalid arena config: {0}")]
    InvalidConfig(String),

    /// No live agent has this id.
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Archetype name did not match any known kind.
    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),

    /// Path-finding could not connect the two points.
    #[error("No path: {0}")]
    NoPath(String),
}
