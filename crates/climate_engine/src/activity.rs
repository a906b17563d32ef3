//! How busy the campus is right now compared with what history says to expect.

use anyhow::Result;
use chrono::Duration;
use climate_core::clock::{date_key, floor_hour};
use climate_core::config::ActivityConfig;
use climate_core::{ActivityLevel, Cache, Clock, PostStore, TemperatureLedger};
use serde_json::json;
use std::sync::Arc;

/// Share of the average hourly volume expected in each hour of the day.
pub const HOURLY_MULTIPLIER: [f64; 24] = [
    0.15, 0.08, 0.05, 0.03, 0.03, 0.05, // 00-05
    0.2, 0.5, 0.9, 1.1, 1.2, 1.3, // 06-11
    1.6, 1.6, 1.5, 1.5, 1.4, 1.4, // 12-17
    1.3, 1.2, 1.1, 1.0, 0.7, 0.4, // 18-23
];

/// Band for `actual` posts against an `expected` count. With no expectation
/// at all the hour counts as normal.
pub fn classify_ratio(actual: f64, expected: f64) -> ActivityLevel {
    if expected <= 0.0 {
        return ActivityLevel::Normal;
    }
    ActivityLevel::from_ratio(actual / expected)
}

/// Diurnal share of `hourly_average` for `hour`.
pub fn expected_posts_from(hourly_average: f64, hour: u32) -> u64 {
    (hourly_average * HOURLY_MULTIPLIER[(hour % 24) as usize])
        .round()
        .max(0.0) as u64
}

pub struct ActivityAnalyzer {
    posts: Arc<dyn PostStore>,
    ledger: Arc<dyn TemperatureLedger>,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    config: ActivityConfig,
}

impl ActivityAnalyzer {
    pub fn new(
        posts: Arc<dyn PostStore>,
        ledger: Arc<dyn TemperatureLedger>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
        config: ActivityConfig,
    ) -> Self {
        Self {
            posts,
            ledger,
            cache,
            clock,
            config,
        }
    }

    /// Posts created since the top of the current hour.
    pub async fn current_hour_post_count(&self) -> Result<u64> {
        let now = self.clock.now();
        let hour_start = floor_hour(now);
        let key = format!(
            "activity:current_hour_count:{}",
            hour_start.format("%Y-%m-%dT%H")
        );

        if let Some(count) = self.cache.get_u64(&key).await? {
            return Ok(count);
        }

        let count = self.posts.count_posts_between(hour_start, now).await?;
        self.cache
            .set(
                &key,
                json!(count),
                Some(std::time::Duration::from_secs(self.config.count_cache_secs)),
            )
            .await?;
        Ok(count)
    }

    /// Posts created in the full hour leading up to now. This is the volume
    /// comparable with [`Self::expected_hourly_average`] at any minute of
    /// the hour.
    pub async fn trailing_hour_post_count(&self) -> Result<u64> {
        let now = self.clock.now();
        self.posts
            .count_posts_between(now - Duration::hours(1), now)
            .await
    }

    /// Mean posts per hour over the trailing lookback window of daily
    /// summaries, or the raw post count spread over the window when no
    /// summaries exist yet.
    pub async fn expected_hourly_average(&self) -> Result<f64> {
        let today = self.clock.today();
        let key = format!("activity:expected_hourly_average:{}", date_key(today));
        if let Some(avg) = self.cache.get_f64(&key).await? {
            return Ok(avg);
        }

        let days = self.config.lookback_days.max(1);
        let summaries = self
            .ledger
            .daily_summaries_between(today - Duration::days(days as i64), today)
            .await?;

        let average = if summaries.is_empty() {
            self.daily_average(days).await? / 24.0
        } else {
            summaries.iter().map(|s| s.average_hourly_posts).sum::<f64>() / summaries.len() as f64
        };

        self.cache
            .set(
                &key,
                json!(average),
                Some(std::time::Duration::from_secs(self.config.average_cache_secs)),
            )
            .await?;
        tracing::debug!("Expected hourly average over {} day(s): {:.2}", days, average);
        Ok(average)
    }

    /// Mean posts per day over the last `days` days.
    pub async fn daily_average(&self, days: u32) -> Result<f64> {
        let days = days.max(1);
        let today = self.clock.today();
        let summaries = self
            .ledger
            .daily_summaries_between(today - Duration::days(days as i64), today)
            .await?;

        if !summaries.is_empty() {
            let total: u64 = summaries.iter().map(|s| s.total_post_count).sum();
            return Ok(total as f64 / summaries.len() as f64);
        }

        let now = self.clock.now();
        let count = self
            .posts
            .count_posts_between(now - Duration::days(days as i64), now)
            .await?;
        Ok(count as f64 / days as f64)
    }

    pub async fn classify(&self, actual: u64) -> Result<ActivityLevel> {
        let expected = self.expected_hourly_average().await?;
        Ok(classify_ratio(actual as f64, expected))
    }

    pub async fn expected_posts_for_hour(&self, hour: u32) -> Result<u64> {
        Ok(expected_posts_from(self.expected_hourly_average().await?, hour))
    }
}
