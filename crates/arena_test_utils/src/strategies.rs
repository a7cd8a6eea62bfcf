//! Proptest strategies for the arena kernel.
//!
//! These strategies generate random but reproducible inputs for
//! property-based tests of movement, waves, healing and lineages.

use arena_core::agent::AgentKind;
use arena_core::movement::StepClass;
use glam::Vec3;
use proptest::prelude::*;

/// Arena seed.
pub fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Any wave number in a long run.
pub fn arb_wave_number() -> impl Strategy<Value = u32> {
    1u32..60
}

/// Wave number that is not a boss gate under the default interval of 5.
pub fn arb_trickle_wave() -> impl Strategy<Value = u32> {
    arb_wave_number().prop_filter("boss wave", |w| w % 5 != 0)
}

/// Boss-gate wave number under the default interval of 5.
pub fn arb_boss_wave() -> impl Strategy<Value = u32> {
    (1u32..12).prop_map(|n| n * 5)
}

/// Step class.
pub fn arb_step_class() -> impl Strategy<Value = StepClass> {
    prop_oneof![
        Just(StepClass::Light),
        Just(StepClass::Standard),
        Just(StepClass::Heavy),
    ]
}

/// Regular, non-boss archetype that can head a trickle wave.
pub fn arb_regular_kind() -> impl Strategy<Value = AgentKind> {
    prop::sample::select(vec![
        AgentKind::Melee,
        AgentKind::Rusher,
        AgentKind::Shooter,
        AgentKind::Tank,
        AgentKind::Healer,
        AgentKind::Sniper,
        AgentKind::Flyer,
        AgentKind::SwarmCarrier,
    ])
}

/// Boss archetype.
pub fn arb_boss_kind() -> impl Strategy<Value = AgentKind> {
    prop::sample::select(AgentKind::BOSS_ROTATION.to_vec())
}

/// Ledge rise as a fraction of body height.
pub fn arb_rise_fraction() -> impl Strategy<Value = f32> {
    0.0f32..0.8
}

/// Heal proposals from several healers in one frame.
pub fn arb_heal_amounts(max_healers: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.5f32..40.0, 1..=max_healers)
}

/// Ground-level point inside a 40 x 40 arena.
pub fn arb_ground_point() -> impl Strategy<Value = Vec3> {
    (-20.0f32..20.0, -20.0f32..20.0).prop_map(|(x, z)| Vec3::new(x, 0.0, z))
}

/// Horizontal unit direction.
pub fn arb_direction() -> impl Strategy<Value = Vec3> {
    (0.0f32..std::f32::consts::TAU).prop_map(|a| Vec3::new(a.sin(), 0.0, a.cos()))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_trickle_waves_are_not_boss_gates(wave in arb_trickle_wave()) {
            prop_assert!(wave % 5 != 0);
        }

        #[test]
        fn test_boss_kinds_are_bosses(kind in arb_boss_kind()) {
            prop_assert!(kind.is_boss());
        }

        #[test]
        fn test_directions_are_unit(dir in arb_direction()) {
            prop_assert!((dir.length() - 1.0).abs() < 1e-4);
        }
    }
}
