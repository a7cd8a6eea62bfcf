//! Test fixtures and helpers.
//!
//! Pre-built arenas, player poses and managers for consistent testing.

use arena_core::context::{PlayerHit, PlayerState};
use arena_core::manager::EnemyManager;
use arena_core::movement::{BodyShape, StepClass};
use arena_core::spatial::{Aabb, ColliderSet};
use glam::Vec3;

/// Fixed frame step used by the fixtures.
pub const DT: f32 = 1.0 / 60.0;

/// Standard-class body, 1.6 tall.
pub const STANDARD_BODY: BodyShape = BodyShape::new(0.8, 0.3, StepClass::Standard);

/// Heavy-class body, 1.6 tall.
pub const HEAVY_BODY: BodyShape = BodyShape::new(0.8, 0.3, StepClass::Heavy);

/// Light-class body, 1.6 tall.
pub const LIGHT_BODY: BodyShape = BodyShape::new(0.8, 0.3, StepClass::Light);

/// Flat floor at height 0 with a ledge of `height` covering
/// `x ∈ [1, 2)`, `z ∈ [-2, 2]`.
#[must_use]
pub fn ledge_arena(height: f32) -> ColliderSet {
    ColliderSet::with_boxes(vec![Aabb::block(1.0, 2.0, -2.0, 2.0, 0.0, height)])
}

/// Flat floor with a tall wall across `x ∈ [4, 5)`, `z ∈ [-6, 6]`.
#[must_use]
pub fn walled_arena() -> ColliderSet {
    ColliderSet::with_boxes(vec![Aabb::block(4.0, 5.0, -6.0, 6.0, 0.0, 4.0)])
}

/// Arena with scattered low and tall cover, for soak runs.
#[must_use]
pub fn cover_arena() -> ColliderSet {
    ColliderSet::with_boxes(vec![
        Aabb::block(6.0, 8.0, -3.0, 3.0, 0.0, 3.0),
        Aabb::block(-8.0, -6.0, -3.0, 3.0, 0.0, 3.0),
        Aabb::block(-2.0, 2.0, 10.0, 12.0, 0.0, 0.15),
        Aabb::block(-2.0, 2.0, -12.0, -10.0, 0.0, 0.5),
    ])
}

/// Player standing on the floor at `(x, z)`, facing +Z.
#[must_use]
pub fn player_at(x: f32, z: f32) -> PlayerState {
    PlayerState::new(Vec3::new(x, 0.9, z), Vec3::Z)
}

/// Player standing on the floor at `(x, z)`, facing `forward`.
#[must_use]
pub fn player_facing(x: f32, z: f32, forward: Vec3) -> PlayerState {
    PlayerState::new(Vec3::new(x, 0.9, z), forward)
}

/// Manager with the default configuration and an empty arena.
#[must_use]
pub fn seeded_manager(seed: u64) -> EnemyManager {
    EnemyManager::with_seed(seed)
}

/// Manager positioned at `wave` without starting it.
#[must_use]
pub fn manager_at_wave(seed: u64, wave: u32) -> EnemyManager {
    let mut manager = EnemyManager::with_seed(seed);
    manager.set_wave_number(wave);
    manager
}

/// Manager over `colliders`.
///
/// # Panics
///
/// Panics if the default configuration rejects the colliders.
#[must_use]
pub fn manager_with_colliders(seed: u64, colliders: ColliderSet) -> EnemyManager {
    let mut manager = EnemyManager::with_seed(seed);
    manager
        .set_colliders(colliders)
        .expect("default config accepts any collider set");
    manager
}

/// Tick `manager` for `frames` fixed steps, collecting every player hit.
pub fn run_frames(manager: &mut EnemyManager, player: &PlayerState, frames: usize) -> Vec<PlayerHit> {
    let mut hits = Vec::new();
    for _ in 0..frames {
        manager.tick_ai(player, DT, |hit| hits.push(*hit));
    }
    hits
}

/// Tick until no staggered spawn is pending, up to `max_frames`.
/// Returns the frames used.
pub fn drain_pending(manager: &mut EnemyManager, player: &PlayerState, max_frames: usize) -> usize {
    let mut frames = 0;
    while manager.pending_spawns() > 0 && frames < max_frames {
        manager.tick_ai(player, DT, |_| {});
        frames += 1;
    }
    frames
}
