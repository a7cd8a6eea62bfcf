//! # Arena Test Utilities
//!
//! Shared testing utilities for the arena crates:
//! - Arena fixtures (ledges, walls, player poses, seeded managers)
//! - Determinism harness over [`arena_core::manager::EnemyManager::state_hash`]
//! - Property-based testing strategies
//! - Test logging setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod strategies;

use tracing_subscriber::EnvFilter;

/// Re-export proptest for convenience.
pub use proptest;

/// Install a `fmt` subscriber filtered by `RUST_LOG` for the current test
/// binary. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
