//! Campus temperature controller.
//!
//! The live temperature is a cached scalar nudged by activity every hour,
//! warmed by natural recovery during the day, re-anchored by emotion
//! analysis, and protected at night against freezing. Every change is
//! appended to the ledger.

use crate::activity::{classify_ratio, expected_posts_from, ActivityAnalyzer};
use crate::statistics::StatisticsStore;
use crate::Backends;
use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use climate_core::clock::{date_key, floor_hour, start_of_day};
use climate_core::config::TemperatureConfig;
use climate_core::{
    ActivityLevel, AdjustmentReason, Cache, CampusTemperatureRecord, Clock, DailyCampusSummary,
    GuidelineTable, PostStore, TemperatureLedger,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex};

const CURRENT_KEY: &str = "campus:temperature:current";
const BASELINE_KEY: &str = "campus:temperature:baseline";
const PROTECTION_KEY: &str = "campus:temperature:protection_mode";

const CURRENT_TTL: std::time::Duration = std::time::Duration::from_secs(2 * 60 * 60);
const PROTECTION_TTL: std::time::Duration = std::time::Duration::from_secs(8 * 60 * 60);
const MIN_MAX_TTL: std::time::Duration = std::time::Duration::from_secs(2 * 24 * 60 * 60);

/// Hours of the day (inclusive) in which natural recovery runs.
const RECOVERY_HOURS: std::ops::RangeInclusive<u32> = 7..=22;

/// Hour the morning prediction targets.
const MORNING_HOUR: u32 = 6;

fn min_key(date: NaiveDate) -> String {
    format!("campus:temperature:min:{}", date_key(date))
}

fn max_key(date: NaiveDate) -> String {
    format!("campus:temperature:max:{}", date_key(date))
}

/// Damping applied to an adjustment near the ends of the scale. Rising
/// moves are only damped right at the top; falling moves are damped
/// progressively from 60 down.
pub fn protection_factor(current: f64, increasing: bool) -> f64 {
    if increasing {
        if current >= 95.0 {
            0.05
        } else {
            1.0
        }
    } else if current <= 5.0 {
        0.05
    } else if current <= 15.0 {
        0.25
    } else if current <= 30.0 {
        0.5
    } else if current < 60.0 {
        0.75
    } else {
        1.0
    }
}

/// One activity step of the controller, shared by the live hourly
/// adjustment and the overnight simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivityStep {
    pub level: ActivityLevel,
    pub protection: f64,
    pub time_multiplier: f64,
    pub final_rate: f64,
    pub temperature: f64,
}

pub fn activity_step(current: f64, level: ActivityLevel, guidelines: &GuidelineTable, hour: u32) -> ActivityStep {
    let guideline = guidelines.for_hour(hour);
    let increasing = level.is_increasing();
    let protection = protection_factor(current, increasing);
    let time_multiplier = guideline.multiplier(increasing);
    let final_rate = level.adjustment_rate() * protection * time_multiplier;
    ActivityStep {
        level,
        protection,
        time_multiplier,
        final_rate,
        temperature: guideline.clamp(current * (1.0 + final_rate)),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyAdjustment {
    pub previous: f64,
    pub post_count: u64,
    pub expected_hourly_average: f64,
    #[serde(flatten)]
    pub step: ActivityStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MorningPrediction {
    pub predicted: f64,
    /// New live temperature when the prediction triggered a pre-correction.
    pub adjusted_to: Option<f64>,
}

pub struct TemperatureManager {
    cache: Arc<dyn Cache>,
    ledger: Arc<dyn TemperatureLedger>,
    posts: Arc<dyn PostStore>,
    clock: Arc<dyn Clock>,
    activity: Arc<ActivityAnalyzer>,
    statistics: Arc<StatisticsStore>,
    guidelines: GuidelineTable,
    config: TemperatureConfig,
    rng: Mutex<StdRng>,
}

impl TemperatureManager {
    pub fn new(
        backends: &Backends,
        activity: Arc<ActivityAnalyzer>,
        statistics: Arc<StatisticsStore>,
        config: &TemperatureConfig,
    ) -> Result<Self> {
        Ok(Self {
            cache: backends.cache.clone(),
            ledger: backends.ledger.clone(),
            posts: backends.posts.clone(),
            clock: backends.clock.clone(),
            activity,
            statistics,
            guidelines: config.guideline_table()?,
            config: config.clone(),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Replace the entropy-seeded generator with a deterministic one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn guidelines(&self) -> &GuidelineTable {
        &self.guidelines
    }

    fn sample(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(low..high)
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Live temperature. A cold cache falls back to the newest ledger row,
    /// then to the configured default.
    pub async fn current_temperature(&self) -> Result<f64> {
        if let Some(t) = self.cache.get_f64(CURRENT_KEY).await? {
            return Ok(t);
        }
        match self.ledger.latest_record().await? {
            Some(record) => {
                tracing::debug!("Current temperature cache cold, using ledger row");
                Ok(record.temperature)
            }
            None => Ok(self.config.default_temperature),
        }
    }

    pub async fn base_emotion_temperature(&self) -> Result<f64> {
        Ok(self
            .cache
            .get_f64(BASELINE_KEY)
            .await?
            .unwrap_or(self.config.default_temperature))
    }

    pub async fn set_base_emotion_temperature(&self, temperature: f64) -> Result<()> {
        self.cache
            .set(BASELINE_KEY, json!(temperature), Some(CURRENT_TTL))
            .await
    }

    pub async fn is_protection_mode(&self) -> Result<bool> {
        Ok(self.cache.get_bool(PROTECTION_KEY).await?.unwrap_or(false))
    }

    /// Today's `(min, max)`; both read as the current temperature before the
    /// first write of the day.
    pub async fn today_min_max(&self) -> Result<(f64, f64)> {
        let today = self.clock.today();
        let min = self.cache.get_f64(&min_key(today)).await?;
        let max = self.cache.get_f64(&max_key(today)).await?;
        match (min, max) {
            (Some(min), Some(max)) => Ok((min, max)),
            _ => {
                let current = self.current_temperature().await?;
                Ok((min.unwrap_or(current), max.unwrap_or(current)))
            }
        }
    }

    pub async fn daily_campus_data(&self, date: NaiveDate) -> Result<Option<DailyCampusSummary>> {
        self.ledger.daily_summary(date).await
    }

    pub async fn recent_records(&self, limit: u32) -> Result<Vec<CampusTemperatureRecord>> {
        self.ledger.recent_records(limit).await
    }

    /// Persist `temperature` as the new live value.
    pub async fn update_campus_temperature(
        &self,
        temperature: f64,
        post_count: u64,
        reason: AdjustmentReason,
    ) -> Result<CampusTemperatureRecord> {
        let now = self.clock.now();
        let baseline = self.base_emotion_temperature().await?;
        let expected = self.activity.expected_hourly_average().await?;

        let mut record = CampusTemperatureRecord {
            id: None,
            recorded_at: now,
            temperature,
            emotion_baseline: baseline,
            post_adjustment: temperature - baseline,
            post_count,
            expected_hourly_average: expected,
            reason,
        };
        record.id = Some(self.ledger.append_record(&record).await?);

        self.cache
            .set(CURRENT_KEY, json!(temperature), Some(CURRENT_TTL))
            .await?;
        self.track_min_max(now.date(), temperature).await?;

        tracing::info!("Campus temperature {:.1} ({})", temperature, reason);
        Ok(record)
    }

    async fn track_min_max(&self, date: NaiveDate, temperature: f64) -> Result<()> {
        let (min_k, max_k) = (min_key(date), max_key(date));
        let min = self.cache.get_f64(&min_k).await?;
        let max = self.cache.get_f64(&max_k).await?;

        if min.map_or(true, |m| temperature < m) {
            self.cache.set(&min_k, json!(temperature), Some(MIN_MAX_TTL)).await?;
        }
        if max.map_or(true, |m| temperature > m) {
            self.cache.set(&max_k, json!(temperature), Some(MIN_MAX_TTL)).await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    /// Scale the live temperature by the activity level of the last full hour.
    pub async fn adjust_hourly(&self) -> Result<HourlyAdjustment> {
        let hour = self.clock.now().hour();
        let post_count = self.activity.trailing_hour_post_count().await?;
        let expected = self.activity.expected_hourly_average().await?;
        let previous = self.current_temperature().await?;

        let level = self.activity.classify(post_count).await?;
        let step = activity_step(previous, level, &self.guidelines, hour);

        tracing::info!(
            "Hourly adjustment: {} posts vs {:.2} expected -> {:?}, rate {:+.4} (protection {}, time x{})",
            post_count,
            expected,
            level,
            step.final_rate,
            step.protection,
            step.time_multiplier
        );

        self.update_campus_temperature(step.temperature, post_count, AdjustmentReason::HourlyAdjustment)
            .await?;
        Ok(HourlyAdjustment {
            previous,
            post_count,
            expected_hourly_average: expected,
            step,
        })
    }

    /// Re-anchor the live temperature on a fresh emotion analysis result.
    pub async fn update_temperature_from_emotion_analysis(
        &self,
        temperature: f64,
    ) -> Result<CampusTemperatureRecord> {
        self.set_base_emotion_temperature(temperature).await?;
        let post_count = self.activity.current_hour_post_count().await?;
        self.update_campus_temperature(temperature, post_count, AdjustmentReason::EmotionAnalysisUpdate)
            .await
    }

    /// Random daytime warming. Returns whether the temperature changed;
    /// it never goes down.
    pub async fn natural_temperature_recovery(&self) -> Result<bool> {
        let hour = self.clock.now().hour();
        if !RECOVERY_HOURS.contains(&hour) {
            return Ok(false);
        }

        let guideline = *self.guidelines.for_hour(hour);
        if guideline.natural_recovery_rate <= 0.0 {
            return Ok(false);
        }

        let current = self.current_temperature().await?;
        let recovered = guideline.clamp(current + self.sample(0.0, guideline.natural_recovery_rate));
        if recovered <= current {
            tracing::debug!("Natural recovery: {:.1} stays (band {}..{})", current, guideline.min, guideline.max);
            return Ok(false);
        }

        let post_count = self.activity.current_hour_post_count().await?;
        self.update_campus_temperature(recovered, post_count, AdjustmentReason::NaturalRecovery)
            .await?;
        Ok(true)
    }

    /// Simulate the controller hour by hour until the next 06:00 using the
    /// expected post volume for each hour. Reads only.
    pub async fn predict_morning_temperature(&self) -> Result<f64> {
        let now = self.clock.now();
        let hourly_average = self.activity.expected_hourly_average().await?;
        let mut temperature = self.current_temperature().await?;

        let target = next_morning(now);
        let mut t = floor_hour(now) + Duration::hours(1);
        while t < target {
            let hour = t.hour();
            let expected = expected_posts_from(hourly_average, hour);
            let level = classify_ratio(expected as f64, hourly_average);
            temperature = activity_step(temperature, level, &self.guidelines, hour).temperature;

            if RECOVERY_HOURS.contains(&hour) {
                // Two half-hour ticks, each averaging half the band's rate.
                let guideline = self.guidelines.for_hour(hour);
                temperature = guideline.clamp(temperature + guideline.natural_recovery_rate);
            }
            t += Duration::hours(1);
        }

        tracing::debug!("Predicted {:02}:00 temperature: {:.2}", MORNING_HOUR, temperature);
        Ok(temperature)
    }

    /// Pre-warm tonight if the morning is predicted to freeze.
    pub async fn predict_and_adjust_for_morning(&self) -> Result<MorningPrediction> {
        let predicted = self.predict_morning_temperature().await?;
        if predicted >= self.config.morning_minimum {
            tracing::info!("Morning prediction {:.1}, no pre-correction needed", predicted);
            return Ok(MorningPrediction {
                predicted,
                adjusted_to: None,
            });
        }

        self.cache
            .set(PROTECTION_KEY, json!(true), Some(PROTECTION_TTL))
            .await?;

        let current = self.current_temperature().await?;
        let boost = (self.config.morning_target - predicted) * 0.5;
        let hour = self.clock.now().hour();
        let adjusted = self.guidelines.for_hour(hour).clamp(current + boost);

        tracing::warn!(
            "Morning prediction {:.1} below {:.1}: protection on, {:.1} -> {:.1}",
            predicted,
            self.config.morning_minimum,
            current,
            adjusted
        );

        let post_count = self.activity.current_hour_post_count().await?;
        self.update_campus_temperature(adjusted, post_count, AdjustmentReason::MorningPredictionAdjustment)
            .await?;
        Ok(MorningPrediction {
            predicted,
            adjusted_to: Some(adjusted),
        })
    }

    /// Dawn floor. Returns the forced temperature when the current one was
    /// too low. Protection mode is cleared either way.
    pub async fn ensure_minimum_morning_temperature(&self) -> Result<Option<f64>> {
        let current = self.current_temperature().await?;
        let forced = if current < self.config.morning_minimum {
            let spread = self.config.morning_guarantee_spread.max(0.0);
            let forced = self.config.morning_minimum + self.sample(0.0, spread);
            tracing::warn!("Morning temperature {:.1} below minimum, forcing {:.1}", current, forced);

            let post_count = self.activity.current_hour_post_count().await?;
            self.update_campus_temperature(forced, post_count, AdjustmentReason::MorningMinimumGuarantee)
                .await?;
            Some(forced)
        } else {
            None
        };

        self.cache.delete(PROTECTION_KEY).await?;
        Ok(forced)
    }

    /// Roll yesterday up into a daily summary, then start today's min/max
    /// tracking from the current temperature.
    pub async fn save_daily_campus_data(&self) -> Result<DailyCampusSummary> {
        let now = self.clock.now();
        let today = now.date();
        let yesterday = today - Duration::days(1);
        let (day_start, day_end) = (start_of_day(yesterday), start_of_day(today));

        let current = self.current_temperature().await?;
        let records = self.ledger.records_between(day_start, day_end).await?;

        // Newest first, so the first row is the closing temperature.
        let final_temperature = records.first().map_or(current, |r| r.temperature);

        let ledger_min = records.iter().map(|r| r.temperature).reduce(f64::min);
        let ledger_max = records.iter().map(|r| r.temperature).reduce(f64::max);
        let min = match self.cache.get_f64(&min_key(yesterday)).await? {
            Some(min) => min,
            None => ledger_min.unwrap_or(current),
        };
        let max = match self.cache.get_f64(&max_key(yesterday)).await? {
            Some(max) => max,
            None => ledger_max.unwrap_or(current),
        };

        let total_post_count = self.posts.count_posts_between(day_start, day_end).await?;
        let summary = DailyCampusSummary {
            date: yesterday,
            final_temperature,
            weather: self.statistics.weather_for(yesterday).await?,
            total_post_count,
            average_hourly_posts: total_post_count as f64 / 24.0,
            min_temperature: min.min(final_temperature),
            max_temperature: max.max(final_temperature),
            created_at: now,
        };
        self.ledger.upsert_daily_summary(&summary).await?;

        self.cache.set(&min_key(today), json!(current), Some(MIN_MAX_TTL)).await?;
        self.cache.set(&max_key(today), json!(current), Some(MIN_MAX_TTL)).await?;

        tracing::info!(
            "Daily rollup for {}: final {:.1}, range {:.1}..{:.1}, {} posts, {}",
            yesterday,
            summary.final_temperature,
            summary.min_temperature,
            summary.max_temperature,
            summary.total_post_count,
            summary.weather
        );
        Ok(summary)
    }
}

/// The first 06:00 strictly after `now`.
fn next_morning(now: NaiveDateTime) -> NaiveDateTime {
    let today = start_of_day(now.date()) + Duration::hours(MORNING_HOUR as i64);
    if now < today {
        today
    } else {
        today + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_factor_table() {
        assert_eq!(protection_factor(96.0, true), 0.05);
        assert_eq!(protection_factor(94.9, true), 1.0);
        assert_eq!(protection_factor(3.0, true), 1.0);
        assert_eq!(protection_factor(3.0, false), 0.05);
        assert_eq!(protection_factor(5.0, false), 0.05);
        assert_eq!(protection_factor(12.0, false), 0.25);
        assert_eq!(protection_factor(30.0, false), 0.5);
        assert_eq!(protection_factor(59.9, false), 0.75);
        assert_eq!(protection_factor(60.0, false), 1.0);
        assert_eq!(protection_factor(99.0, false), 1.0);
    }

    #[test]
    fn test_protection_limits_extreme_moves() {
        let table = GuidelineTable::default();
        // Rising at the top of a full band.
        let step = activity_step(96.0, ActivityLevel::ExtremelyHigh, &table, 12);
        assert!(step.final_rate <= 0.05, "rate {}", step.final_rate);
        // Falling at the bottom.
        let step = activity_step(3.0, ActivityLevel::ExtremelyLow, &table, 2);
        assert!(step.final_rate.abs() <= 0.05, "rate {}", step.final_rate);
        assert!(step.temperature >= 3.0 * 0.95);
    }

    #[test]
    fn test_activity_step_respects_band() {
        let table = GuidelineTable::default();
        // 09-17 band is 10..100.
        let step = activity_step(10.5, ActivityLevel::ExtremelyLow, &table, 10);
        assert_eq!(step.temperature, 10.5 * (1.0 - 0.25 * 0.25 * 0.6));
        let step = activity_step(8.0, ActivityLevel::ExtremelyLow, &table, 10);
        assert_eq!(step.temperature, 10.0);
        // 00-04 band tops out at 40.
        let step = activity_step(45.0, ActivityLevel::ExtremelyHigh, &table, 1);
        assert_eq!(step.temperature, 40.0);
    }

    #[test]
    fn test_next_morning() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let at = |h: u32, m: u32| day.and_hms_opt(h, m, 0).unwrap();
        assert_eq!(next_morning(at(23, 0)), at(6, 0) + Duration::days(1));
        assert_eq!(next_morning(at(2, 0)), at(6, 0));
        assert_eq!(next_morning(at(6, 0)), at(6, 0) + Duration::days(1));
    }
}
