//! Wave lifecycle tests: trickle sizing, boss gates and advance conditions.

use std::cell::RefCell;
use std::rc::Rc;

use arena_core::agent::AgentKind;
use arena_core::config::ArenaConfig;
use arena_core::manager::EnemyManager;
use arena_core::math::Vec3;
use arena_core::spatial::Aabb;
use arena_core::spawn::{SpawnOptions, SpawnRole};
use arena_core::wave::boss_for_wave;
use arena_test_utils::fixtures::{
    drain_pending, manager_at_wave, manager_with_colliders, player_at, player_facing, run_frames,
    seeded_manager, walled_arena,
};
use arena_test_utils::init_tracing;
use arena_test_utils::strategies::{
    arb_boss_wave, arb_ground_point, arb_regular_kind, arb_seed, arb_trickle_wave,
};
use proptest::prelude::*;

// =============================================================================
// Trickle Waves
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_trickle_alive_count_is_ten_plus_wave(seed in arb_seed(), wave in arb_trickle_wave()) {
        let mut manager = manager_at_wave(seed, wave);
        manager.start_wave();
        prop_assert_eq!(manager.wave().alive_count, 10 + wave);
        prop_assert_eq!(manager.wave().starting_alive_count, 10 + wave);
        prop_assert_eq!(manager.pending_spawns() as u32, 10 + wave);
        prop_assert!(manager.agents().is_empty());

        run_frames(&mut manager, &player_at(0.0, 0.0), 30);
        prop_assert_eq!(manager.wave().wave_number, wave);
    }
}

#[test]
fn test_trickle_spawns_are_staggered() {
    let mut manager = manager_at_wave(11, 3);
    manager.start_wave();
    let player = player_at(0.0, 0.0);
    run_frames(&mut manager, &player, 1);
    assert!(manager.agents().len() < 13);
    let frames = drain_pending(&mut manager, &player, 60 * 10);
    assert!(frames > 10, "all spawns landed within {frames} frames");
    assert_eq!(manager.population().role(SpawnRole::Wave), 13);
    assert_eq!(manager.wave().alive_count, 13);
}

#[test]
fn test_staggered_spawns_land_clear_of_walls() {
    let arena = walled_arena();
    let mut manager = manager_with_colliders(13, arena.clone());
    manager.set_wave_number(3);
    manager.start_wave();
    // Facing the wall, so the preferred ring behind the player is open floor
    let player = player_facing(0.0, 0.0, Vec3::X);
    drain_pending(&mut manager, &player, 60 * 10);
    assert_eq!(manager.population().role(SpawnRole::Wave), 13);

    let wall = &arena.boxes()[0];
    for id in manager.agents().sorted_ids() {
        let body = manager.body(id).unwrap();
        let half = Vec3::new(body.shape.footprint, body.shape.half_height, body.shape.footprint);
        let extent = Aabb::new(body.position() - half, body.position() + half);
        assert!(!extent.intersects(wall), "{id} overlaps the wall");
    }
}

#[test]
fn test_wave_does_not_advance_while_agents_alive() {
    let mut manager = manager_at_wave(12, 2);
    manager.start_wave();
    let player = player_at(0.0, 0.0);
    drain_pending(&mut manager, &player, 60 * 10);
    let ids = manager.agents().sorted_ids();
    for id in &ids[1..] {
        manager.remove(*id).unwrap();
    }
    run_frames(&mut manager, &player, 30);
    assert_eq!(manager.wave().wave_number, 2);
    assert_eq!(manager.wave().alive_count, 1);

    manager.apply_hit(ids[0], true, 1.0e6).unwrap();
    run_frames(&mut manager, &player, 1);
    assert_eq!(manager.wave().wave_number, 3);
    assert_eq!(manager.wave().alive_count, 13);
}

// =============================================================================
// Boss Waves
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_boss_waves_field_the_rotation_boss(seed in arb_seed(), wave in arb_boss_wave()) {
        let mut manager = manager_at_wave(seed, wave);
        manager.start_wave();
        let expected = boss_for_wave(&manager.config().waves, wave);
        prop_assert_eq!(manager.agents().len(), 1);
        prop_assert_eq!(manager.ids_of(expected).len(), 1);
        prop_assert_eq!(manager.pending_spawns(), 0);
        prop_assert!(manager.boss_active());
    }
}

#[test]
fn test_wave_five_spawns_exactly_one_boss() {
    init_tracing();
    let mut manager = manager_at_wave(5, 5);
    let started = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&started);
    manager.on_wave(move |wave| log.borrow_mut().push(wave));

    manager.start_wave();
    assert_eq!(*started.borrow(), vec![5]);
    assert_eq!(manager.agents().len(), 1);
    assert_eq!(manager.pending_spawns(), 0);
    assert_eq!(manager.wave().alive_count, 1);
    assert_eq!(manager.population().role(SpawnRole::Boss), 1);
    assert_eq!(manager.population().role(SpawnRole::Wave), 0);
    let bosses = manager.ids_of(AgentKind::BOSS_ROTATION[0]);
    assert_eq!(bosses.len(), 1);
    assert!(manager.boss_active());

    let player = player_at(0.0, 0.0);
    run_frames(&mut manager, &player, 60 * 4);
    assert_eq!(manager.wave().wave_number, 5);
    assert_eq!(manager.population().role(SpawnRole::Wave), 0);

    manager.remove(bosses[0]).unwrap();
    assert!(!manager.boss_active());
    run_frames(&mut manager, &player, 1);
    assert_eq!(manager.wave().wave_number, 6);
    assert_eq!(manager.wave().alive_count, 16);
    assert_eq!(*started.borrow(), vec![5, 6]);
}

#[test]
fn test_boss_adds_leave_with_the_boss() {
    let mut manager = manager_at_wave(6, 5);
    manager.start_wave();
    let boss = manager.ids_of(AgentKind::BOSS_ROTATION[0])[0];
    run_frames(&mut manager, &player_at(0.0, 0.0), 60 * 20);
    manager.remove(boss).unwrap();
    assert_eq!(manager.population().role(SpawnRole::BossAdd), 0);
}

#[test]
fn test_splitter_lineage_holds_the_wave_open() {
    init_tracing();
    // Sixth boss encounter in the rotation
    let wave = 5 * 6;
    let mut manager = manager_at_wave(21, wave);
    manager.start_wave();
    let root = manager.ids_of(AgentKind::Splitter);
    assert_eq!(root.len(), 1);

    let player = player_at(0.0, 0.0);
    manager.apply_hit(root[0], false, 1.0e6).unwrap();
    assert_eq!(manager.wave().alive_count, 0);
    assert!(manager.boss_active());
    run_frames(&mut manager, &player, 1);
    assert_eq!(manager.wave().wave_number, wave);

    let mut frames = 0;
    while manager.wave().wave_number == wave && frames < 60 * 30 {
        assert!(manager.lineages().alive_total() <= manager.config().caps.lineage_population_cap);
        for id in manager.ids_of(AgentKind::Splitter) {
            manager.apply_hit(id, false, 1.0e6).unwrap();
        }
        run_frames(&mut manager, &player, 1);
        frames += 1;
    }
    assert_eq!(manager.wave().wave_number, wave + 1);
    assert!(!manager.lineages().is_active());
}

#[test]
fn test_boss_rotation_follows_encounter_number() {
    for (encounter, kind) in AgentKind::BOSS_ROTATION.iter().enumerate() {
        let wave = 5 * (encounter as u32 + 1);
        let mut manager = manager_at_wave(encounter as u64, wave);
        manager.start_wave();
        assert_eq!(manager.ids_of(*kind).len(), 1, "wave {wave}");
        assert_eq!(manager.agents().len(), 1, "wave {wave}");
    }
}

// =============================================================================
// Host Spawns
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_host_spawn_lands_at_requested_point(
        seed in arb_seed(),
        kind in arb_regular_kind(),
        at in arb_ground_point(),
    ) {
        let mut manager = seeded_manager(seed);
        let id = manager.spawn_at(kind, Some(at), SpawnOptions::default());
        let body = manager.body(id).unwrap();
        prop_assert_eq!(body.kind(), kind);
        prop_assert!((body.position().x - at.x).abs() < 1e-5);
        prop_assert!((body.position().z - at.z).abs() < 1e-5);
        prop_assert!((body.position().y - body.shape.half_height).abs() < 1e-5);
        prop_assert_eq!(manager.population().role(SpawnRole::External), 1);
        prop_assert!(!manager.boss_active());
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_ron_tuning_drives_wave_size_and_gate() {
    let config = ArenaConfig::from_ron_str(
        "ArenaConfig(waves: WaveConfig(base_count: 4, boss_interval: 3))",
    )
    .unwrap();
    let mut manager = EnemyManager::new(config, 17).unwrap();
    manager.set_wave_number(2);
    manager.start_wave();
    assert_eq!(manager.wave().alive_count, 6);

    let mut gate = EnemyManager::new(manager.config().clone(), 18).unwrap();
    gate.set_wave_number(3);
    gate.start_wave();
    assert_eq!(gate.agents().len(), 1);
    assert!(gate.boss_active());
}

#[test]
fn test_invalid_tuning_is_rejected() {
    let mut config = ArenaConfig::default();
    config.movement.heavy.assist_fraction = config.movement.standard.assist_fraction + 0.1;
    assert!(EnemyManager::new(config, 1).is_err());
}
