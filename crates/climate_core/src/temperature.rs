//! Campus temperature records, daily rollups and the hour-of-day guideline table.

use crate::weather::Weather;
use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest value the campus temperature scale can take.
pub const SCALE_MIN: f64 = 0.0;
/// Highest value the campus temperature scale can take.
pub const SCALE_MAX: f64 = 100.0;

/// Why a ledger row was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    HourlyAdjustment,
    NaturalRecovery,
    MorningPredictionAdjustment,
    MorningMinimumGuarantee,
    EmotionAnalysisUpdate,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::HourlyAdjustment => "hourly_adjustment",
            AdjustmentReason::NaturalRecovery => "natural_recovery",
            AdjustmentReason::MorningPredictionAdjustment => "morning_prediction_adjustment",
            AdjustmentReason::MorningMinimumGuarantee => "morning_minimum_guarantee",
            AdjustmentReason::EmotionAnalysisUpdate => "emotion_analysis_update",
        }
    }
}

impl fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "hourly_adjustment" => AdjustmentReason::HourlyAdjustment,
            "natural_recovery" => AdjustmentReason::NaturalRecovery,
            "morning_prediction_adjustment" => AdjustmentReason::MorningPredictionAdjustment,
            "morning_minimum_guarantee" => AdjustmentReason::MorningMinimumGuarantee,
            "emotion_analysis_update" => AdjustmentReason::EmotionAnalysisUpdate,
            other => bail!("unknown adjustment reason: {}", other),
        })
    }
}

/// One append-only row of the temperature audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampusTemperatureRecord {
    /// Ledger row id (None until persisted).
    pub id: Option<i64>,
    pub recorded_at: NaiveDateTime,
    pub temperature: f64,
    /// Emotion-only temperature this value started from.
    pub emotion_baseline: f64,
    /// `temperature - emotion_baseline`
    pub post_adjustment: f64,
    pub post_count: u64,
    pub expected_hourly_average: f64,
    pub reason: AdjustmentReason,
}

/// One row per calendar date, written by the daily rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCampusSummary {
    pub date: NaiveDate,
    pub final_temperature: f64,
    pub weather: Weather,
    pub total_post_count: u64,
    pub average_hourly_posts: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub created_at: NaiveDateTime,
}

/// Legal band and multipliers for one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureGuideline {
    pub min: f64,
    pub max: f64,
    pub increase_multiplier: f64,
    pub decrease_multiplier: f64,
    /// Upper bound of the random warming applied by a recovery tick.
    pub natural_recovery_rate: f64,
}

impl TemperatureGuideline {
    pub fn clamp(&self, temperature: f64) -> f64 {
        temperature.clamp(self.min, self.max)
    }

    pub fn multiplier(&self, increasing: bool) -> f64 {
        if increasing {
            self.increase_multiplier
        } else {
            self.decrease_multiplier
        }
    }

    pub fn contains(&self, temperature: f64) -> bool {
        temperature >= self.min && temperature <= self.max
    }
}

/// A guideline covering the inclusive hour range `start_hour..=end_hour`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineRange {
    pub start_hour: u32,
    pub end_hour: u32,
    pub min: f64,
    pub max: f64,
    pub increase_multiplier: f64,
    pub decrease_multiplier: f64,
    #[serde(default)]
    pub natural_recovery_rate: f64,
}

impl GuidelineRange {
    fn guideline(&self) -> TemperatureGuideline {
        TemperatureGuideline {
            min: self.min,
            max: self.max,
            increase_multiplier: self.increase_multiplier,
            decrease_multiplier: self.decrease_multiplier,
            natural_recovery_rate: self.natural_recovery_rate,
        }
    }
}

pub fn default_guideline_ranges() -> Vec<GuidelineRange> {
    let range = |start_hour, end_hour, min, max, inc, dec, recovery| GuidelineRange {
        start_hour,
        end_hour,
        min,
        max,
        increase_multiplier: inc,
        decrease_multiplier: dec,
        natural_recovery_rate: recovery,
    };
    vec![
        range(0, 4, 0.0, 40.0, 0.5, 1.2, 0.0),
        range(5, 6, 0.0, 50.0, 0.8, 1.0, 0.0),
        range(7, 8, 5.0, 60.0, 1.0, 0.8, 3.0),
        range(9, 17, 10.0, 100.0, 1.2, 0.6, 2.0),
        range(18, 21, 10.0, 90.0, 1.0, 0.9, 1.5),
        range(22, 23, 5.0, 70.0, 0.7, 1.1, 1.0),
    ]
}

/// Hour-indexed lookup (0–23) of temperature guidelines.
#[derive(Debug, Clone, PartialEq)]
pub struct GuidelineTable {
    hours: [TemperatureGuideline; 24],
}

impl GuidelineTable {
    /// Build the table from hour ranges. Every hour must be covered exactly once
    /// and every band must sit inside the 0–100 scale.
    pub fn from_ranges(ranges: &[GuidelineRange]) -> Result<Self> {
        let mut slots: [Option<TemperatureGuideline>; 24] = [None; 24];

        for r in ranges {
            if r.start_hour > r.end_hour || r.end_hour > 23 {
                bail!("invalid guideline hour range {}..={}", r.start_hour, r.end_hour);
            }
            if r.min > r.max || r.min < SCALE_MIN || r.max > SCALE_MAX {
                bail!(
                    "invalid guideline band [{}, {}] for hours {}..={}",
                    r.min,
                    r.max,
                    r.start_hour,
                    r.end_hour
                );
            }
            if r.increase_multiplier < 0.0 || r.decrease_multiplier < 0.0 || r.natural_recovery_rate < 0.0 {
                bail!("guideline multipliers must be non-negative (hours {}..={})", r.start_hour, r.end_hour);
            }
            for hour in r.start_hour..=r.end_hour {
                let slot = &mut slots[hour as usize];
                if slot.is_some() {
                    bail!("hour {} is covered by more than one guideline", hour);
                }
                *slot = Some(r.guideline());
            }
        }

        let mut hours = [TemperatureGuideline {
            min: SCALE_MIN,
            max: SCALE_MAX,
            increase_multiplier: 1.0,
            decrease_multiplier: 1.0,
            natural_recovery_rate: 0.0,
        }; 24];
        for (hour, slot) in slots.iter().enumerate() {
            match slot {
                Some(g) => hours[hour] = *g,
                None => bail!("no guideline covers hour {}", hour),
            }
        }
        Ok(Self { hours })
    }

    pub fn for_hour(&self, hour: u32) -> &TemperatureGuideline {
        &self.hours[(hour % 24) as usize]
    }
}

impl Default for GuidelineTable {
    fn default() -> Self {
        let mut hours = [TemperatureGuideline {
            min: SCALE_MIN,
            max: SCALE_MAX,
            increase_multiplier: 1.0,
            decrease_multiplier: 1.0,
            natural_recovery_rate: 0.0,
        }; 24];
        for r in default_guideline_ranges() {
            for hour in r.start_hour..=r.end_hour {
                hours[hour as usize] = r.guideline();
            }
        }
        Self { hours }
    }
}
