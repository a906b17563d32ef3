//! Property-based tests for the controller and the weather mapping.

use climate_core::{ActivityLevel, EmotionAverages, Emotions, GuidelineTable, Weather};
use climate_engine::temperature::{activity_step, protection_factor};
use climate_engine::weather::{temperature_for, weather_for};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn any_level() -> impl Strategy<Value = ActivityLevel> {
    prop_oneof![
        Just(ActivityLevel::ExtremelyLow),
        Just(ActivityLevel::VeryLow),
        Just(ActivityLevel::Low),
        Just(ActivityLevel::SlightlyLow),
        Just(ActivityLevel::Normal),
        Just(ActivityLevel::SlightlyHigh),
        Just(ActivityLevel::High),
        Just(ActivityLevel::VeryHigh),
        Just(ActivityLevel::ExtremelyHigh),
    ]
}

fn any_averages() -> impl Strategy<Value = EmotionAverages> {
    prop::array::uniform6(0.0f64..=100.0).prop_map(|v| Emotions {
        depression: v[0],
        brightness: v[1],
        excitement: v[2],
        anger: v[3],
        sadness: v[4],
        thrill: v[5],
    })
}

proptest! {
    #[test]
    fn protection_factor_is_a_damping(current in 0.0f64..=100.0, increasing in any::<bool>()) {
        let f = protection_factor(current, increasing);
        prop_assert!(f > 0.0 && f <= 1.0);
    }

    /// A step always lands in the hour's band, and inside the band it moves
    /// in the direction of the activity level.
    #[test]
    fn activity_step_stays_in_band(
        current in 0.0f64..=100.0,
        level in any_level(),
        hour in 0u32..24,
    ) {
        let table = GuidelineTable::default();
        let band = *table.for_hour(hour);
        let step = activity_step(current, level, &table, hour);

        prop_assert!(band.contains(step.temperature));
        if band.contains(current) {
            if level.is_increasing() {
                prop_assert!(step.temperature >= current);
            } else {
                prop_assert!(step.temperature <= current);
            }
        }
        // No single hour moves more than the largest rate times the largest multiplier.
        prop_assert!(step.final_rate.abs() <= 0.25 * 1.2 + 1e-12);
    }

    #[test]
    fn weather_sides_follow_sentiment(averages in any_averages()) {
        let weather = weather_for(&averages);
        if averages.positive() >= averages.negative() {
            prop_assert!(matches!(weather, Weather::Sunny | Weather::PartlyCloudy | Weather::Cloudy));
        } else {
            prop_assert!(matches!(weather, Weather::Rainy | Weather::MostlyCloudy | Weather::Cloudy));
        }
    }

    #[test]
    fn emotion_temperature_is_in_scale(averages in any_averages(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let t = temperature_for(&averages, &mut rng);
        prop_assert!((5.0..=35.0).contains(&t));
    }
}
