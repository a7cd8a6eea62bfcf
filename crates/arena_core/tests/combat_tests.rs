//! Combat invariants exercised through the manager: one attack at a time,
//! one hit per swing, non-stacking heals and lineage population caps.

use std::collections::BTreeMap;

use arena_core::agent::{AgentBody, AgentId, AgentKind, Behavior, BehaviorStatus};
use arena_core::bosses::splitter::MAX_GENERATION;
use arena_core::config::ArenaConfig;
use arena_core::context::TickContext;
use arena_core::lineage::{LineageTable, SplitRequest};
use arena_core::manager::EnemyManager;
use arena_core::math::Vec3;
use arena_core::spawn::{SpawnOptions, SpawnRole};
use arena_test_utils::fixtures::{player_at, run_frames, DT};
use arena_test_utils::init_tracing;
use arena_test_utils::strategies::{arb_heal_amounts, arb_seed};
use proptest::prelude::*;

#[derive(Debug)]
struct Idle;

impl Behavior for Idle {
    fn update(&mut self, _body: &mut AgentBody, _ctx: &mut TickContext<'_>, _dt: f32) {}

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus::phase("idle")
    }
}

#[derive(Debug)]
struct Mender {
    target: AgentId,
    amount: f32,
}

impl Behavior for Mender {
    fn update(&mut self, body: &mut AgentBody, ctx: &mut TickContext<'_>, _dt: f32) {
        ctx.propose_heal(body.id, self.target, self.amount);
    }

    fn status(&self) -> BehaviorStatus {
        BehaviorStatus::phase("mend")
    }
}

// =============================================================================
// Attack Exclusion
// =============================================================================

#[test]
fn test_brawlers_swing_one_attack_and_land_one_hit_per_swing() {
    let mut manager = EnemyManager::with_seed(31);
    let player = player_at(0.0, 0.0);
    let ids: Vec<AgentId> = [(1.5, 0.0), (-1.5, 0.0), (0.0, -1.5)]
        .into_iter()
        .map(|(x, z)| manager.spawn_at(AgentKind::Melee, Some(Vec3::new(x, 0.0, z)), SpawnOptions::default()))
        .collect();

    let mut swings: BTreeMap<AgentId, u32> = BTreeMap::new();
    let mut hits: BTreeMap<AgentId, u32> = BTreeMap::new();
    let mut in_active: BTreeMap<AgentId, bool> = BTreeMap::new();

    for _ in 0..60 * 12 {
        manager.tick_ai(&player, DT, |hit| *hits.entry(hit.source).or_default() += 1);
        for &id in &ids {
            let status = manager.status(id).expect("brawler stays alive");
            assert!(status.active_attacks <= 1);
            let active = status.phase == "active";
            let was_active = in_active.insert(id, active).unwrap_or(false);
            if active && !was_active {
                *swings.entry(id).or_default() += 1;
            }
        }
    }

    let total: u32 = swings.values().sum();
    assert!(total >= 3, "expected several swings, got {total}");
    for id in ids {
        let landed = hits.get(&id).copied().unwrap_or(0);
        let swung = swings.get(&id).copied().unwrap_or(0);
        assert!(landed <= swung, "{id}: {landed} hits from {swung} swings");
    }
}

// =============================================================================
// Heal Non-Stacking
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_only_the_largest_heal_lands(
        seed in arb_seed(),
        damage in 5.0f32..50.0,
        amounts in arb_heal_amounts(6),
    ) {
        let mut manager = EnemyManager::with_seed(seed);
        let target = manager.register_external_enemy(
            AgentKind::Melee,
            Some(Vec3::new(0.0, 0.0, -10.0)),
            Box::new(Idle),
            SpawnOptions::default(),
        );
        manager.apply_hit(target, false, damage).unwrap();
        let max = manager.body(target).unwrap().meta.max_health;
        let before = manager.body(target).unwrap().meta.current_health;

        for (i, &amount) in amounts.iter().enumerate() {
            manager.register_external_enemy(
                AgentKind::Healer,
                Some(Vec3::new(i as f32 * 2.0 - 6.0, 0.0, -14.0)),
                Box::new(Mender { target, amount }),
                SpawnOptions::default(),
            );
        }
        run_frames(&mut manager, &player_at(0.0, 0.0), 1);

        let largest = amounts.iter().copied().fold(0.0f32, f32::max);
        let expected = (before + largest).min(max);
        let health = manager.body(target).unwrap().meta.current_health;
        prop_assert!((health - expected).abs() < 1e-3, "health {} expected {}", health, expected);
    }
}

// =============================================================================
// Lineage Cap
// =============================================================================

#[test]
fn test_lineage_cap_holds_while_splitting() {
    init_tracing();
    let mut config = ArenaConfig::default();
    config.caps.lineage_population_cap = 4;
    let mut manager = EnemyManager::new(config, 41).unwrap();
    let player = player_at(0.0, 0.0);
    let root = manager.spawn_at(
        AgentKind::Splitter,
        Some(Vec3::new(0.0, 0.0, -8.0)),
        SpawnOptions::role(SpawnRole::Boss),
    );
    manager.apply_hit(root, false, 1.0e6).unwrap();

    for _ in 0..60 * 10 {
        run_frames(&mut manager, &player, 1);
        let live = manager.ids_of(AgentKind::Splitter);
        assert!(live.len() <= 4, "{} live descendants", live.len());
        assert!(manager.lineages().alive_total() <= 4);
        for id in live {
            let generation = manager
                .body(id)
                .and_then(|b| b.lineage)
                .map_or(0, |tag| tag.generation);
            if generation < MAX_GENERATION {
                manager.apply_hit(id, false, 1.0e6).unwrap();
            }
        }
    }
    assert_eq!(manager.ids_of(AgentKind::Splitter).len(), 4);
    assert_eq!(manager.lineages().pending(), 0);
}

proptest! {
    #[test]
    fn test_lineage_cap_under_large_queue(cap in 1u32..16, queued in 16usize..400) {
        let mut table = LineageTable::new();
        let lineage = table.create(AgentKind::Splitter, cap);
        for _ in 0..queued {
            table.enqueue(SplitRequest {
                lineage,
                generation: 1,
                position: Vec3::ZERO,
                scale: 0.7,
                health_scale: 0.5,
            });
        }
        let mut released = 0u32;
        for _ in 0..2_000 {
            released += table.release(DT, 2, 0.15).len() as u32;
            prop_assert!(table.alive_total() <= cap);
        }
        prop_assert_eq!(released, cap - 1);
        prop_assert_eq!(table.pending(), 0);
    }
}
