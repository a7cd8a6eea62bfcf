//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the enemy simulation produces
//! identical results given identical seeds and inputs.
//!
//! # Testing Strategy
//!
//! Every "random" decision in the kernel (windup jitter, strafe flips,
//! burst sizes, spawn placement) draws from the manager's seeded RNG.
//! Sources of non-determinism to guard against:
//!
//! - **HashMap iteration order**: agents are always updated in sorted id
//!   order.
//! - **System randomness**: no RNG without an explicit seed.
//! - **Host inputs**: the player pose and hit sequence must be replayed
//!   exactly; the harness drives both from closures.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use arena_core::context::PlayerState;
use arena_core::manager::EnemyManager;

use crate::fixtures::DT;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of frames simulated.
    pub frames: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Frames: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `frames` - Number of frames to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one frame; receives the frame index
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    frames: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for frame in 0..frames {
            step(&mut state, frame);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Run an [`EnemyManager`] twice against the same player path and compare
/// final state hashes.
///
/// `player` maps a frame index to the player pose for that frame.
pub fn verify_manager_determinism<Setup, Path>(setup: Setup, player: Path, frames: u64) -> DeterminismResult
where
    Setup: Fn() -> EnemyManager,
    Path: Fn(u64) -> PlayerState,
{
    verify_determinism(
        2,
        frames,
        &setup,
        |manager, frame| manager.tick_ai(&player(frame), DT, |_| {}),
        EnemyManager::state_hash,
    )
}

/// Compare two manager runs frame by frame, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs are identical, `Some(frame)` if they diverge at that
/// frame (0 means the initial states already differ).
pub fn find_first_divergence<Setup, Path>(setup: Setup, player: Path, frames: u64) -> Option<u64>
where
    Setup: Fn() -> EnemyManager,
    Path: Fn(u64) -> PlayerState,
{
    let mut first = setup();
    let mut second = setup();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for frame in 1..=frames {
        let pose = player(frame - 1);
        first.tick_ai(&pose, DT, |_| {});
        second.tick_ai(&pose, DT, |_| {});

        if first.state_hash() != second.state_hash() {
            return Some(frame);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Player circling the origin at `radius`, one lap every ten seconds.
#[must_use]
pub fn circling_player(radius: f32) -> impl Fn(u64) -> PlayerState {
    move |frame| {
        let angle = frame as f32 * DT * std::f32::consts::TAU / 10.0;
        let position = glam::Vec3::new(radius * angle.sin(), 0.9, radius * angle.cos());
        let forward = glam::Vec3::new(angle.cos(), 0.0, -angle.sin());
        PlayerState::new(position, forward)
    }
}
