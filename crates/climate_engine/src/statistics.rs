//! Per-day emotion statistics in the shared cache.
//!
//! Every key is scoped to a calendar date and expires after two days, so a
//! forgotten reset ages out on its own. Plain writers target the clock's
//! date; the `_on` writers target the date the analyzed posts belong to.

use anyhow::Result;
use chrono::NaiveDate;
use climate_core::clock::date_key;
use climate_core::{
    Cache, Clock, EmotionAverages, EmotionKind, EmotionScoreSet, Emotions, Weather,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Lifetime of every statistics key.
pub const STATS_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Emotion temperature reported before the first analysis of the day.
pub const DEFAULT_EMOTION_TEMPERATURE: f64 = 20.0;

fn avg_key(kind: EmotionKind, date: NaiveDate) -> String {
    format!("emotion:avg:{}:{}", kind, date_key(date))
}

fn count_key(kind: EmotionKind, date: NaiveDate) -> String {
    format!("emotion:count:{}:{}", kind, date_key(date))
}

fn cumulative_key(kind: EmotionKind, date: NaiveDate) -> String {
    format!("emotion:cumulative:{}:{}", kind, date_key(date))
}

fn total_posts_key(date: NaiveDate) -> String {
    format!("emotion:total_posts:{}", date_key(date))
}

fn hourly_key(date: NaiveDate, hour: u32) -> String {
    format!("emotion:hourly:{}:{:02}", date_key(date), hour)
}

fn weather_key(date: NaiveDate) -> String {
    format!("emotion:weather:{}", date_key(date))
}

fn temperature_key(date: NaiveDate) -> String {
    format!("emotion:temperature:{}", date_key(date))
}

pub struct StatisticsStore {
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
}

impl StatisticsStore {
    pub fn new(cache: Arc<dyn Cache>, clock: Arc<dyn Clock>) -> Self {
        Self { cache, clock }
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.cache.set(key, value, Some(STATS_TTL)).await
    }

    /// Fold one run's scores into today's running averages. Each call counts
    /// as one sample regardless of how many posts the run covered.
    pub async fn update_running_average(&self, scores: &EmotionScoreSet) -> Result<EmotionAverages> {
        self.update_running_average_on(self.today(), scores).await
    }

    pub async fn update_running_average_on(
        &self,
        date: NaiveDate,
        scores: &EmotionScoreSet,
    ) -> Result<EmotionAverages> {
        let mut updated = EmotionAverages::neutral();

        for (kind, score) in scores.iter() {
            let count = self.cache.get_u64(&count_key(kind, date)).await?.unwrap_or(0);
            let avg = match count {
                0 => 0.0,
                _ => self
                    .cache
                    .get_f64(&avg_key(kind, date))
                    .await?
                    .unwrap_or(EmotionAverages::NEUTRAL),
            };

            let new_avg = (avg * count as f64 + score as f64) / (count + 1) as f64;
            self.set(&avg_key(kind, date), json!(new_avg)).await?;
            self.set(&count_key(kind, date), json!(count + 1)).await?;
            *updated.get_mut(kind) = new_avg;
        }

        tracing::debug!("Running averages for {}: {:?}", date, updated);
        Ok(updated)
    }

    pub async fn update_cumulative(&self, scores: &EmotionScoreSet) -> Result<()> {
        self.update_cumulative_on(self.today(), scores).await
    }

    pub async fn update_cumulative_on(&self, date: NaiveDate, scores: &EmotionScoreSet) -> Result<()> {
        for (kind, score) in scores.iter() {
            let key = cumulative_key(kind, date);
            let sum = self.cache.get_u64(&key).await?.unwrap_or(0);
            self.set(&key, json!(sum + score as u64)).await?;
        }
        Ok(())
    }

    pub async fn update_total_posts(&self, n: u64) -> Result<u64> {
        self.update_total_posts_on(self.today(), n).await
    }

    pub async fn update_total_posts_on(&self, date: NaiveDate, n: u64) -> Result<u64> {
        let key = total_posts_key(date);
        let total = self.cache.get_u64(&key).await?.unwrap_or(0) + n;
        self.set(&key, json!(total)).await?;
        Ok(total)
    }

    pub async fn update_hourly_posts(&self, hour: u32, n: u64) -> Result<()> {
        self.update_hourly_posts_on(self.today(), hour, n).await
    }

    pub async fn update_hourly_posts_on(&self, date: NaiveDate, hour: u32, n: u64) -> Result<()> {
        let key = hourly_key(date, hour % 24);
        let count = self.cache.get_u64(&key).await?.unwrap_or(0) + n;
        self.set(&key, json!(count)).await
    }

    pub async fn set_weather_and_temperature(&self, weather: Weather, temperature: f64) -> Result<()> {
        self.set_weather_and_temperature_on(self.today(), weather, temperature)
            .await
    }

    pub async fn set_weather_and_temperature_on(
        &self,
        date: NaiveDate,
        weather: Weather,
        temperature: f64,
    ) -> Result<()> {
        self.set(&weather_key(date), json!(weather.as_str())).await?;
        self.set(&temperature_key(date), json!(temperature)).await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Today's averages; categories never sampled read as neutral.
    pub async fn daily_averages(&self) -> Result<EmotionAverages> {
        self.daily_averages_for(self.today()).await
    }

    pub async fn daily_averages_for(&self, date: NaiveDate) -> Result<EmotionAverages> {
        let mut averages = EmotionAverages::neutral();
        for kind in EmotionKind::ALL {
            if let Some(avg) = self.cache.get_f64(&avg_key(kind, date)).await? {
                *averages.get_mut(kind) = avg;
            }
        }
        Ok(averages)
    }

    pub async fn sample_counts(&self) -> Result<Emotions<u64>> {
        let date = self.today();
        let mut counts = Emotions::splat(0u64);
        for kind in EmotionKind::ALL {
            *counts.get_mut(kind) = self.cache.get_u64(&count_key(kind, date)).await?.unwrap_or(0);
        }
        Ok(counts)
    }

    pub async fn cumulative_scores(&self) -> Result<Emotions<u64>> {
        let date = self.today();
        let mut sums = Emotions::splat(0u64);
        for kind in EmotionKind::ALL {
            *sums.get_mut(kind) = self
                .cache
                .get_u64(&cumulative_key(kind, date))
                .await?
                .unwrap_or(0);
        }
        Ok(sums)
    }

    pub async fn total_posts(&self) -> Result<u64> {
        self.total_posts_for(self.today()).await
    }

    pub async fn total_posts_for(&self, date: NaiveDate) -> Result<u64> {
        Ok(self
            .cache
            .get_u64(&total_posts_key(date))
            .await?
            .unwrap_or(0))
    }

    pub async fn hourly_posts(&self) -> Result<[u64; 24]> {
        self.hourly_posts_for(self.today()).await
    }

    pub async fn hourly_posts_for(&self, date: NaiveDate) -> Result<[u64; 24]> {
        let mut hours = [0u64; 24];
        for (hour, slot) in hours.iter_mut().enumerate() {
            *slot = self
                .cache
                .get_u64(&hourly_key(date, hour as u32))
                .await?
                .unwrap_or(0);
        }
        Ok(hours)
    }

    pub async fn weather(&self) -> Result<Weather> {
        self.weather_for(self.today()).await
    }

    /// Stored weather for `date`; unknown or missing labels read as cloudy.
    pub async fn weather_for(&self, date: NaiveDate) -> Result<Weather> {
        Ok(self
            .cache
            .get_string(&weather_key(date))
            .await?
            .and_then(|label| label.parse().ok())
            .unwrap_or_default())
    }

    pub async fn temperature(&self) -> Result<f64> {
        self.temperature_for(self.today()).await
    }

    pub async fn temperature_for(&self, date: NaiveDate) -> Result<f64> {
        Ok(self
            .cache
            .get_f64(&temperature_key(date))
            .await?
            .unwrap_or(DEFAULT_EMOTION_TEMPERATURE))
    }

    /// Delete every statistics key for the current date. Safe to repeat.
    pub async fn reset_daily(&self) -> Result<()> {
        let date = self.today();
        let mut keys = Vec::with_capacity(EmotionKind::ALL.len() * 3 + 27);
        for kind in EmotionKind::ALL {
            keys.push(avg_key(kind, date));
            keys.push(count_key(kind, date));
            keys.push(cumulative_key(kind, date));
        }
        keys.push(total_posts_key(date));
        keys.extend((0..24).map(|hour| hourly_key(date, hour)));
        keys.push(weather_key(date));
        keys.push(temperature_key(date));

        for key in &keys {
            self.cache.delete(key).await?;
        }
        tracing::info!("Daily emotion statistics reset for {}", date_key(date));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use climate_core::{ManualClock, MemoryCache};

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn store() -> (StatisticsStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(noon()));
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        (StatisticsStore::new(cache, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_running_average_one_sample_per_run() {
        let (stats, _) = store();

        let avg = stats
            .update_running_average(&EmotionScoreSet::splat(80))
            .await
            .unwrap();
        assert_eq!(avg.brightness, 80.0);
        assert_eq!(stats.sample_counts().await.unwrap().brightness, 1);

        let avg = stats
            .update_running_average(&EmotionScoreSet::splat(40))
            .await
            .unwrap();
        assert_eq!(avg.brightness, 60.0);
        assert_eq!(avg.thrill, 60.0);
        assert_eq!(stats.sample_counts().await.unwrap().depression, 2);
        assert_eq!(stats.daily_averages().await.unwrap(), EmotionAverages::splat(60.0));
    }

    #[tokio::test]
    async fn test_unsampled_day_reads_defaults() {
        let (stats, _) = store();
        assert_eq!(stats.daily_averages().await.unwrap(), EmotionAverages::neutral());
        assert_eq!(stats.weather().await.unwrap(), Weather::Cloudy);
        assert_eq!(stats.temperature().await.unwrap(), 20.0);
        assert_eq!(stats.total_posts().await.unwrap(), 0);
        assert_eq!(stats.hourly_posts().await.unwrap(), [0; 24]);
    }

    #[tokio::test]
    async fn test_counters_accumulate() {
        let (stats, _) = store();
        stats.update_total_posts(12).await.unwrap();
        assert_eq!(stats.update_total_posts(3).await.unwrap(), 15);

        stats.update_hourly_posts(9, 4).await.unwrap();
        stats.update_hourly_posts(9, 1).await.unwrap();
        stats.update_hourly_posts(23, 2).await.unwrap();
        let hours = stats.hourly_posts().await.unwrap();
        assert_eq!(hours[9], 5);
        assert_eq!(hours[23], 2);
        assert_eq!(hours.iter().sum::<u64>(), 7);

        stats.update_cumulative(&EmotionScoreSet::splat(70)).await.unwrap();
        stats.update_cumulative(&EmotionScoreSet::splat(90)).await.unwrap();
        assert_eq!(stats.cumulative_scores().await.unwrap(), Emotions::splat(160));
    }

    #[tokio::test]
    async fn test_reset_is_idempotent_and_scoped_to_today() {
        let (stats, clock) = store();
        stats.update_running_average(&EmotionScoreSet::splat(30)).await.unwrap();
        stats.set_weather_and_temperature(Weather::Rainy, 8.5).await.unwrap();
        let yesterday = clock.today();

        clock.advance(chrono::Duration::days(1));
        stats.update_total_posts(5).await.unwrap();
        stats.set_weather_and_temperature(Weather::Sunny, 30.0).await.unwrap();

        stats.reset_daily().await.unwrap();
        stats.reset_daily().await.unwrap();

        assert_eq!(stats.total_posts().await.unwrap(), 0);
        assert_eq!(stats.weather().await.unwrap(), Weather::Cloudy);
        // Yesterday survives for the rollup.
        assert_eq!(stats.weather_for(yesterday).await.unwrap(), Weather::Rainy);
        assert_eq!(stats.temperature_for(yesterday).await.unwrap(), 8.5);
        assert_eq!(
            stats.daily_averages_for(yesterday).await.unwrap(),
            EmotionAverages::splat(30.0)
        );
    }

    #[tokio::test]
    async fn test_dated_writers_leave_today_alone() {
        let (stats, clock) = store();
        let yesterday = clock.today() - chrono::Duration::days(1);

        stats
            .update_running_average_on(yesterday, &EmotionScoreSet::splat(90))
            .await
            .unwrap();
        stats.update_total_posts_on(yesterday, 4).await.unwrap();
        stats.update_hourly_posts_on(yesterday, 23, 4).await.unwrap();
        stats
            .set_weather_and_temperature_on(yesterday, Weather::Sunny, 28.0)
            .await
            .unwrap();

        assert_eq!(stats.total_posts_for(yesterday).await.unwrap(), 4);
        assert_eq!(stats.hourly_posts_for(yesterday).await.unwrap()[23], 4);
        assert_eq!(stats.weather_for(yesterday).await.unwrap(), Weather::Sunny);
        assert_eq!(
            stats.daily_averages_for(yesterday).await.unwrap(),
            EmotionAverages::splat(90.0)
        );

        assert_eq!(stats.total_posts().await.unwrap(), 0);
        assert_eq!(stats.hourly_posts().await.unwrap(), [0; 24]);
        assert_eq!(stats.daily_averages().await.unwrap(), EmotionAverages::neutral());
    }

    #[tokio::test]
    async fn test_keys_expire_after_two_days() {
        let (stats, clock) = store();
        stats.set_weather_and_temperature(Weather::Sunny, 31.0).await.unwrap();
        let day = clock.today();
        clock.advance(chrono::Duration::days(2));
        assert_eq!(stats.weather_for(day).await.unwrap(), Weather::Cloudy);
    }
}
