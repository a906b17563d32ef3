//! Post-activity classification relative to the historical hourly expectation.

use serde::{Deserialize, Serialize};

/// Nine ordered bands of "how busy is this hour", lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityLevel {
    ExtremelyLow,
    VeryLow,
    Low,
    SlightlyLow,
    Normal,
    SlightlyHigh,
    High,
    VeryHigh,
    ExtremelyHigh,
}

impl ActivityLevel {
    /// Map `actual / expected` onto a band.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 3.0 {
            ActivityLevel::ExtremelyHigh
        } else if ratio >= 2.0 {
            ActivityLevel::VeryHigh
        } else if ratio >= 1.5 {
            ActivityLevel::High
        } else if ratio >= 1.2 {
            ActivityLevel::SlightlyHigh
        } else if ratio >= 0.8 {
            ActivityLevel::Normal
        } else if ratio >= 0.6 {
            ActivityLevel::SlightlyLow
        } else if ratio >= 0.4 {
            ActivityLevel::Low
        } else if ratio >= 0.2 {
            ActivityLevel::VeryLow
        } else {
            ActivityLevel::ExtremelyLow
        }
    }

    /// Fractional warming rate applied when this band is active.
    pub fn increase_rate(&self) -> f64 {
        match self {
            ActivityLevel::ExtremelyHigh => 0.20,
            ActivityLevel::VeryHigh => 0.12,
            ActivityLevel::High => 0.08,
            ActivityLevel::SlightlyHigh => 0.04,
            _ => 0.0,
        }
    }

    /// Fractional cooling rate applied when this band is active.
    pub fn decrease_rate(&self) -> f64 {
        match self {
            ActivityLevel::Normal => 0.01,
            ActivityLevel::SlightlyLow => 0.05,
            ActivityLevel::Low => 0.10,
            ActivityLevel::VeryLow => 0.15,
            ActivityLevel::ExtremelyLow => 0.25,
            _ => 0.0,
        }
    }

    pub fn is_increasing(&self) -> bool {
        self.increase_rate() > 0.0
    }

    /// Signed rate: the nonzero one of the two configured rates.
    pub fn adjustment_rate(&self) -> f64 {
        if self.is_increasing() {
            self.increase_rate()
        } else {
            -self.decrease_rate()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoints_are_inclusive() {
        assert_eq!(ActivityLevel::from_ratio(3.0), ActivityLevel::ExtremelyHigh);
        assert_eq!(ActivityLevel::from_ratio(2.99), ActivityLevel::VeryHigh);
        assert_eq!(ActivityLevel::from_ratio(2.0), ActivityLevel::VeryHigh);
        assert_eq!(ActivityLevel::from_ratio(1.5), ActivityLevel::High);
        assert_eq!(ActivityLevel::from_ratio(1.2), ActivityLevel::SlightlyHigh);
        assert_eq!(ActivityLevel::from_ratio(1.0), ActivityLevel::Normal);
        assert_eq!(ActivityLevel::from_ratio(0.8), ActivityLevel::Normal);
        assert_eq!(ActivityLevel::from_ratio(0.6), ActivityLevel::SlightlyLow);
        assert_eq!(ActivityLevel::from_ratio(0.4), ActivityLevel::Low);
        assert_eq!(ActivityLevel::from_ratio(0.2), ActivityLevel::VeryLow);
        assert_eq!(ActivityLevel::from_ratio(0.19), ActivityLevel::ExtremelyLow);
        assert_eq!(ActivityLevel::from_ratio(0.0), ActivityLevel::ExtremelyLow);
    }

    #[test]
    fn test_rates_have_direction() {
        assert!(ActivityLevel::High.is_increasing());
        assert!(ActivityLevel::High.adjustment_rate() > 0.0);
        assert!(!ActivityLevel::Normal.is_increasing());
        assert!(ActivityLevel::Normal.adjustment_rate() < 0.0);
        assert!(ActivityLevel::ExtremelyLow.adjustment_rate() < 0.0);
    }

    #[test]
    fn test_extremes_move_fastest() {
        assert!(
            ActivityLevel::ExtremelyHigh.adjustment_rate().abs()
                > ActivityLevel::SlightlyHigh.adjustment_rate().abs()
        );
        assert!(
            ActivityLevel::ExtremelyLow.adjustment_rate().abs()
                > ActivityLevel::SlightlyLow.adjustment_rate().abs()
        );
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(ActivityLevel::ExtremelyLow < ActivityLevel::Normal);
        assert!(ActivityLevel::Normal < ActivityLevel::ExtremelyHigh);
    }
}
