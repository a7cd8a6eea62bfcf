//! Frame benchmarks for arena_core.
//!
//! Run with: `cargo bench -p arena_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use arena_core::context::PlayerState;
use arena_core::manager::EnemyManager;
use arena_core::math::Vec3;
use arena_core::spatial::{Aabb, ColliderSet};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

const DT: f32 = 1.0 / 60.0;

fn arena() -> ColliderSet {
    ColliderSet::with_boxes(vec![
        Aabb::block(6.0, 8.0, -3.0, 3.0, 0.0, 3.0),
        Aabb::block(-8.0, -6.0, -3.0, 3.0, 0.0, 3.0),
        Aabb::block(-2.0, 2.0, 10.0, 12.0, 0.0, 0.5),
    ])
}

/// Manager with a late trickle wave fully placed.
fn populated(wave: u32) -> EnemyManager {
    let mut manager = EnemyManager::with_seed(7);
    // Default config always accepts colliders
    let _ = manager.set_colliders(arena());
    manager.set_wave_number(wave);
    manager.start_wave();
    let player = PlayerState::default();
    while manager.pending_spawns() > 0 {
        manager.tick_ai(&player, DT, |_| {});
    }
    manager
}

/// Runs frame benchmarks for the enemy manager.
pub fn tick_benchmark(c: &mut Criterion) {
    let player = PlayerState::new(Vec3::new(0.0, 0.9, 0.0), Vec3::Z);

    c.bench_function("tick_ai wave 9", |b| {
        b.iter_batched_ref(
            || populated(9),
            |manager| manager.tick_ai(black_box(&player), DT, |hit| {
                black_box(hit);
            }),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("tick_ai wave 24 x60", |b| {
        b.iter_batched_ref(
            || populated(24),
            |manager| {
                for _ in 0..60 {
                    manager.tick_ai(black_box(&player), DT, |hit| {
                        black_box(hit);
                    });
                }
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
