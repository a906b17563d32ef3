//! Property-based tests for climate_core.
//!
//! Verifies the guideline table and activity bands stay well-formed for all
//! inputs, not just the hand-picked breakpoints.

use climate_core::temperature::default_guideline_ranges;
use climate_core::{ActivityLevel, EmotionScoreSet, Emotions, GuidelineTable};
use proptest::prelude::*;

proptest! {
    /// Clamping into any hour's band lands inside that band and the 0–100 scale.
    #[test]
    fn guideline_clamp_stays_in_band(hour in 0u32..24, t in -500.0f64..500.0) {
        let table = GuidelineTable::from_ranges(&default_guideline_ranges()).unwrap();
        let g = table.for_hour(hour);
        let clamped = g.clamp(t);
        prop_assert!(g.contains(clamped));
        prop_assert!((0.0..=100.0).contains(&clamped));
    }

    /// Higher ratios never map to a lower band.
    #[test]
    fn activity_level_is_monotonic(a in 0.0f64..10.0, b in 0.0f64..10.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(ActivityLevel::from_ratio(lo) <= ActivityLevel::from_ratio(hi));
    }

    /// Every band has exactly one nonzero rate and the sign matches the direction.
    #[test]
    fn activity_rate_sign_matches_direction(ratio in 0.0f64..10.0) {
        let level = ActivityLevel::from_ratio(ratio);
        let nonzero = [level.increase_rate(), level.decrease_rate()]
            .iter()
            .filter(|r| **r > 0.0)
            .count();
        prop_assert_eq!(nonzero, 1);
        prop_assert_eq!(level.adjustment_rate() > 0.0, level.is_increasing());
    }

    /// Adding score sets is elementwise.
    #[test]
    fn score_sum_is_elementwise(a in prop::array::uniform6(1u32..=100), b in prop::array::uniform6(1u32..=100)) {
        let to_set = |v: [u32; 6]| Emotions {
            depression: v[0], brightness: v[1], excitement: v[2],
            anger: v[3], sadness: v[4], thrill: v[5],
        };
        let (x, y): (EmotionScoreSet, EmotionScoreSet) = (to_set(a), to_set(b));
        let sum = x + y;
        for (kind, value) in sum.iter() {
            prop_assert_eq!(value, x.get(kind) + y.get(kind));
        }
    }
}
