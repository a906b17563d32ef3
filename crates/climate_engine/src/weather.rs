//! Daily emotion averages to an emotional weather label and an emotion-only
//! temperature.

use climate_core::{EmotionAverages, Weather};
use rand::Rng;

pub fn weather_for(averages: &EmotionAverages) -> Weather {
    let positive = averages.positive();
    let negative = averages.negative();

    if positive >= negative {
        if positive >= 240.0 {
            Weather::Sunny
        } else if positive >= 180.0 {
            Weather::PartlyCloudy
        } else {
            Weather::Cloudy
        }
    } else if negative >= 180.0 {
        Weather::Rainy
    } else if negative >= 120.0 {
        Weather::MostlyCloudy
    } else {
        Weather::Cloudy
    }
}

/// Random temperature inside the band selected by emotional vitality,
/// rounded to one decimal.
pub fn temperature_for<R: Rng + ?Sized>(averages: &EmotionAverages, rng: &mut R) -> f64 {
    let vitality = averages.vitality();
    let (low, high) = if vitality > 40.0 {
        (25.0, 35.0)
    } else if vitality >= 20.0 {
        (20.0, 24.0)
    } else if vitality >= -20.0 {
        (15.0, 19.0)
    } else {
        (5.0, 14.0)
    };
    round1(rng.gen_range(low..=high))
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
