//! The facade the scheduler, CLI and reporting layer talk to.

use crate::activity::ActivityAnalyzer;
use crate::schedule::JobKind;
use crate::statistics::StatisticsStore;
use crate::temperature::TemperatureManager;
use crate::time_range::{fetch_posts, TimeRange, TimeRangeKind};
use crate::weather::{temperature_for, weather_for};
use crate::Backends;
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use climate_core::{
    ClimateConfig, DailyCampusSummary, EmotionAverages, EmotionScoreSet, Post, Weather,
};
use climate_scoring::{EmotionScorer, ScoreClient};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub window: TimeRange,
    pub post_count: usize,
    pub chunks: usize,
    /// Summed chunk scores for this run.
    pub scores: EmotionScoreSet,
    pub safety_override: bool,
    /// Running averages of the window's day after this run.
    pub averages: EmotionAverages,
    pub weather: Weather,
    pub emotion_temperature: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The window was empty; nothing was scored or stored.
    NoPosts { window: TimeRange },
    Analyzed(AnalysisReport),
}

/// Everything the read-only surface exposes, in one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct ClimateSnapshot {
    pub taken_at: NaiveDateTime,
    pub emotion_weather: Weather,
    pub emotion_temperature: f64,
    pub daily_average_scores: EmotionAverages,
    pub total_analyzed_posts: u64,
    pub hourly_analyzed_posts: [u64; 24],
    pub campus_temperature: f64,
    pub today_min_temperature: f64,
    pub today_max_temperature: f64,
    pub protection_mode: bool,
    pub yesterday: Option<DailyCampusSummary>,
}

pub struct ClimateService {
    backends: Backends,
    scorer: EmotionScorer,
    activity: Arc<ActivityAnalyzer>,
    statistics: Arc<StatisticsStore>,
    temperature: TemperatureManager,
    rng: Mutex<StdRng>,
}

impl ClimateService {
    pub fn new(config: &ClimateConfig, backends: Backends, client: Arc<dyn ScoreClient>) -> Result<Self> {
        let activity = Arc::new(ActivityAnalyzer::new(
            backends.posts.clone(),
            backends.ledger.clone(),
            backends.cache.clone(),
            backends.clock.clone(),
            config.activity.clone(),
        ));
        let statistics = Arc::new(StatisticsStore::new(
            backends.cache.clone(),
            backends.clock.clone(),
        ));
        let temperature = TemperatureManager::new(
            &backends,
            activity.clone(),
            statistics.clone(),
            &config.temperature,
        )?;

        tracing::info!(
            "Climate service ready (scorer: {}, batch size {})",
            client.name(),
            config.llm.effective_batch_size()
        );

        Ok(Self {
            scorer: EmotionScorer::with_batch_size(client, config.llm.effective_batch_size()),
            backends,
            activity,
            statistics,
            temperature,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Deterministic randomness for both the emotion temperature draw and
    /// the controller.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self.temperature = self.temperature.with_seed(seed.wrapping_add(1));
        self
    }

    pub fn temperature_manager(&self) -> &TemperatureManager {
        &self.temperature
    }

    pub fn statistics(&self) -> &StatisticsStore {
        &self.statistics
    }

    pub fn activity(&self) -> &ActivityAnalyzer {
        &self.activity
    }

    // ------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------

    pub async fn run_analysis(&self, kind: TimeRangeKind) -> Result<AnalysisOutcome> {
        let window = kind.resolve(self.backends.clock.now());
        let posts = fetch_posts(self.backends.posts.as_ref(), &window).await?;

        if posts.is_empty() {
            tracing::info!("No posts in {} .. {}, skipping analysis", window.start, window.end);
            return Ok(AnalysisOutcome::NoPosts { window });
        }

        let batch = self
            .scorer
            .score_posts(&posts)
            .await
            .context("Emotion scoring failed")?;

        // Statistics belong to the day the window starts in, so the 00:00 run
        // over 23:00-24:00 completes yesterday instead of seeding today.
        let date = window.start.date();
        let stats = &self.statistics;
        let averages = stats.update_running_average_on(date, &batch.scores).await?;
        stats.update_cumulative_on(date, &batch.scores).await?;
        stats.update_total_posts_on(date, posts.len() as u64).await?;
        for (hour, count) in posts_per_hour(&posts).iter().enumerate() {
            if *count > 0 {
                stats.update_hourly_posts_on(date, hour as u32, *count).await?;
            }
        }

        let weather = weather_for(&averages);
        let emotion_temperature = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            temperature_for(&averages, &mut *rng)
        };
        stats
            .set_weather_and_temperature_on(date, weather, emotion_temperature)
            .await?;
        self.temperature
            .update_temperature_from_emotion_analysis(emotion_temperature)
            .await?;

        tracing::info!(
            "Analyzed {} posts ({} chunk(s)): {}, emotion temperature {:.1}",
            posts.len(),
            batch.chunks,
            weather,
            emotion_temperature
        );

        Ok(AnalysisOutcome::Analyzed(AnalysisReport {
            window,
            post_count: posts.len(),
            chunks: batch.chunks,
            scores: batch.scores,
            safety_override: batch.safety_overrides > 0,
            averages,
            weather,
            emotion_temperature,
        }))
    }

    pub async fn run_scheduled_analysis(&self) -> Result<AnalysisOutcome> {
        self.run_analysis(TimeRangeKind::Scheduled).await
    }

    pub async fn run_manual_analysis(&self) -> Result<AnalysisOutcome> {
        self.run_analysis(TimeRangeKind::Manual).await
    }

    pub async fn run_full_day_analysis(&self, date: NaiveDate) -> Result<AnalysisOutcome> {
        self.run_analysis(TimeRangeKind::for_date(date)).await
    }

    // ------------------------------------------------------------------
    // Read-only surface
    // ------------------------------------------------------------------

    pub async fn current_emotion_weather(&self) -> Result<Weather> {
        self.statistics.weather().await
    }

    pub async fn current_emotion_temperature(&self) -> Result<f64> {
        self.statistics.temperature().await
    }

    pub async fn current_daily_average_scores(&self) -> Result<EmotionAverages> {
        self.statistics.daily_averages().await
    }

    pub async fn total_analyzed_posts_count(&self) -> Result<u64> {
        self.statistics.total_posts().await
    }

    pub async fn hourly_analyzed_posts_count(&self) -> Result<[u64; 24]> {
        self.statistics.hourly_posts().await
    }

    pub async fn current_campus_temperature(&self) -> Result<f64> {
        self.temperature.current_temperature().await
    }

    pub async fn today_min_max_temperature(&self) -> Result<(f64, f64)> {
        self.temperature.today_min_max().await
    }

    pub async fn daily_campus_data(&self, date: NaiveDate) -> Result<Option<DailyCampusSummary>> {
        self.temperature.daily_campus_data(date).await
    }

    /// Clears today's emotion statistics. Temperature state is untouched.
    pub async fn reset_daily(&self) -> Result<()> {
        self.statistics.reset_daily().await
    }

    pub async fn snapshot(&self) -> Result<ClimateSnapshot> {
        let taken_at = self.backends.clock.now();
        let (today_min, today_max) = self.today_min_max_temperature().await?;
        Ok(ClimateSnapshot {
            taken_at,
            emotion_weather: self.current_emotion_weather().await?,
            emotion_temperature: self.current_emotion_temperature().await?,
            daily_average_scores: self.current_daily_average_scores().await?,
            total_analyzed_posts: self.total_analyzed_posts_count().await?,
            hourly_analyzed_posts: self.hourly_analyzed_posts_count().await?,
            campus_temperature: self.current_campus_temperature().await?,
            today_min_temperature: today_min,
            today_max_temperature: today_max,
            protection_mode: self.temperature.is_protection_mode().await?,
            yesterday: self
                .daily_campus_data(taken_at.date() - Duration::days(1))
                .await?,
        })
    }

    // ------------------------------------------------------------------
    // Scheduled jobs
    // ------------------------------------------------------------------

    pub async fn run_job(&self, job: JobKind) -> Result<()> {
        tracing::debug!("Running job {}", job);
        match job {
            JobKind::HourlyAnalysis => {
                self.run_scheduled_analysis().await?;
            }
            JobKind::HourlyAdjustment => {
                self.temperature.adjust_hourly().await?;
            }
            JobKind::NaturalRecovery => {
                self.temperature.natural_temperature_recovery().await?;
            }
            JobKind::MorningPrediction => {
                self.temperature.predict_and_adjust_for_morning().await?;
            }
            JobKind::MorningGuarantee => {
                self.temperature.ensure_minimum_morning_temperature().await?;
            }
            JobKind::DailyRollup => {
                self.temperature.save_daily_campus_data().await?;
            }
            JobKind::DailyStatsReset => {
                self.reset_daily().await?;
            }
        }
        Ok(())
    }
}

/// Post counts by the hour each post was created in.
fn posts_per_hour(posts: &[Post]) -> [u64; 24] {
    let mut hours = [0u64; 24];
    for post in posts {
        hours[post.created_at.hour() as usize] += 1;
    }
    hours
}
