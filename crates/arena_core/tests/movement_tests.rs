//! Step traversal and descent behaviour of the collision mover.
//!
//! Every body here is 1.6 tall (half height 0.8) and starts on the floor at
//! the origin, next to a ledge covering `x ∈ [1, 2)`.

use arena_core::config::MovementConfig;
use arena_core::math::Vec3;
use arena_core::movement::{move_with_collisions, BodyShape, Climb, MoveOutcome, StepClass};
use arena_core::spatial::ColliderSet;
use arena_test_utils::fixtures::{ledge_arena, HEAVY_BODY, LIGHT_BODY, STANDARD_BODY};
use arena_test_utils::strategies::{arb_rise_fraction, arb_step_class};
use proptest::prelude::*;

const START: Vec3 = Vec3::new(0.0, 0.8, 0.0);

fn shape_for(class: StepClass) -> BodyShape {
    match class {
        StepClass::Light => LIGHT_BODY,
        StepClass::Standard => STANDARD_BODY,
        StepClass::Heavy => HEAVY_BODY,
    }
}

fn step(shape: &BodyShape, colliders: &ColliderSet, position: &mut Vec3, delta: Vec3) -> MoveOutcome {
    let config = MovementConfig::default();
    move_with_collisions(
        position,
        shape,
        config.profile(shape.class),
        delta,
        colliders,
        config.probe_epsilon,
    )
}

// =============================================================================
// Ledge Scenario
// =============================================================================

#[test]
fn test_standard_agent_climbs_064_ledge() {
    let colliders = ledge_arena(0.64);
    let mut position = START;
    step(&STANDARD_BODY, &colliders, &mut position, Vec3::new(1.0, 0.0, 0.0));
    assert!((position.x - 1.0).abs() < 1e-5);
    assert!((position.y - (0.64 + 0.8)).abs() < 1e-4, "y = {}", position.y);
    assert_eq!(position.z, 0.0);
}

#[test]
fn test_heavy_agent_blocked_by_064_ledge() {
    let colliders = ledge_arena(0.64);
    let mut position = START;
    let outcome = step(&HEAVY_BODY, &colliders, &mut position, Vec3::new(1.0, 0.0, 0.0));
    assert!(!outcome.moved_x);
    assert_eq!(position, START);
}

#[test]
fn test_light_agent_climbs_064_ledge() {
    let colliders = ledge_arena(0.64);
    let mut position = START;
    step(&LIGHT_BODY, &colliders, &mut position, Vec3::new(1.0, 0.0, 0.0));
    assert!((position.y - 1.44).abs() < 1e-4);
}

#[test]
fn test_heavy_assist_is_strictly_lower_than_standard() {
    let config = MovementConfig::default();
    let heavy = config.profile(StepClass::Heavy);
    let standard = config.profile(StepClass::Standard);
    assert!(heavy.assist_fraction < standard.assist_fraction);
    assert!(heavy.max_lift_fraction <= standard.max_lift_fraction);
    for class in [StepClass::Light, StepClass::Standard, StepClass::Heavy] {
        let p = config.profile(class);
        assert!(p.step_fraction < p.assist_fraction, "{class:?}");
    }
}

// =============================================================================
// Step Bands
// =============================================================================

fn near_threshold(rise: f32, class: StepClass) -> bool {
    let config = MovementConfig::default();
    let p = config.profile(class);
    [p.step_fraction, p.assist_fraction]
        .iter()
        .any(|t| (rise - t).abs() < 0.01)
}

proptest! {
    #[test]
    fn test_step_bands(class in arb_step_class(), rise in arb_rise_fraction()) {
        prop_assume!(rise > 0.02 && !near_threshold(rise, class));
        let shape = shape_for(class);
        let config = MovementConfig::default();
        let profile = *config.profile(class);
        let height = shape.height();
        let ledge = rise * height;
        let colliders = ledge_arena(ledge);
        let mut position = START;

        step(&shape, &colliders, &mut position, Vec3::new(1.2, 0.0, 0.0));

        if rise <= profile.step_fraction {
            prop_assert!((position.x - 1.2).abs() < 1e-5);
            prop_assert!((position.y - (ledge + 0.8)).abs() < 1e-4);
        } else if rise <= profile.assist_fraction {
            prop_assert!((position.x - 1.2).abs() < 1e-5);
            let lifted = position.y - 0.8;
            prop_assert!(lifted > 0.0);
            prop_assert!(lifted <= profile.max_lift_fraction * height + 1e-4);
            prop_assert!(lifted <= ledge + 1e-4);
            for _ in 0..6 {
                step(&shape, &colliders, &mut position, Vec3::ZERO);
            }
            prop_assert!((position.y - (ledge + 0.8)).abs() < 1e-4);
        } else {
            prop_assert_eq!(position, START);
        }
    }

    #[test]
    fn test_descent_snaps_in_one_frame(
        class in arb_step_class(),
        ledge in 0.1f32..1.2,
        reach in 1.0f32..3.0,
    ) {
        let shape = shape_for(class);
        let colliders = ledge_arena(ledge);
        let mut position = Vec3::new(1.5, ledge + 0.8, 0.0);
        let outcome = step(&shape, &colliders, &mut position, Vec3::new(reach, 0.0, 0.0));
        prop_assert_eq!(outcome.climb, Climb::Descended);
        prop_assert!((position.y - 0.8).abs() < 1e-5);
    }
}

#[test]
fn test_progressive_climb_never_teleports() {
    // A quarter of body height: inside heavy assist, above the heavy lift clamp
    let colliders = ledge_arena(0.4);
    let mut position = START;
    let mut previous = position.y;
    let lift = MovementConfig::default().profile(StepClass::Heavy).max_lift_fraction * 1.6;
    let first = step(&HEAVY_BODY, &colliders, &mut position, Vec3::new(1.2, 0.0, 0.0));
    assert_eq!(first.climb, Climb::Assisted { clamped: true });
    for _ in 0..4 {
        assert!(position.y - previous <= lift + 1e-4);
        previous = position.y;
        step(&HEAVY_BODY, &colliders, &mut position, Vec3::ZERO);
    }
    assert!((position.y - 1.2).abs() < 1e-4);
}
