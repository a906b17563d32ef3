use crate::temperature::{default_guideline_ranges, GuidelineRange, GuidelineTable};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub activity: ActivityConfig,
    pub temperature: TemperatureConfig,
    pub scheduler: SchedulerConfig,
}

impl ClimateConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: ClimateConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            if !v.is_empty() {
                self.llm.api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.llm.timeout_secs = n;
            }
        }
        if let Ok(v) = std::env::var("CLIMATE_DB_PATH") {
            self.storage.db_path = v;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Largest number of posts sent to the model in one call.
pub const MAX_BATCH_SIZE: usize = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai` or `mock`
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub reasoning_effort: String,
    pub verbosity: String,
    /// Posts per call; values above [`MAX_BATCH_SIZE`] are capped.
    pub batch_size: usize,
}

impl LlmConfig {
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-5-mini".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 60,
            reasoning_effort: "minimal".to_string(),
            verbosity: "low".to_string(),
            batch_size: MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "climate.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Days of daily rollups averaged for the hourly expectation.
    pub lookback_days: u32,
    pub count_cache_secs: u64,
    pub average_cache_secs: u64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            count_cache_secs: 300,
            average_cache_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    /// Used whenever no cached or persisted temperature exists.
    pub default_temperature: f64,
    /// Predicted or actual morning temperatures below this trigger protection.
    pub morning_minimum: f64,
    /// Target the morning pre-correction boosts towards.
    pub morning_target: f64,
    /// Width of the random band above `morning_minimum` used by the dawn guarantee.
    pub morning_guarantee_spread: f64,
    pub guidelines: Vec<GuidelineRange>,
}

impl TemperatureConfig {
    pub fn guideline_table(&self) -> Result<GuidelineTable> {
        GuidelineTable::from_ranges(&self.guidelines).context("Invalid temperature guidelines")
    }
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            default_temperature: 20.0,
            morning_minimum: 5.0,
            morning_target: 15.0,
            morning_guarantee_spread: 15.0,
            guidelines: default_guideline_ranges(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the scheduler loop wakes to look for due jobs.
    pub tick_secs: u64,
    /// Job names (snake_case) that should never run.
    pub disabled_jobs: Vec<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: 20,
            disabled_jobs: vec![],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
