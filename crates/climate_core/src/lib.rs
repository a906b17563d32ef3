//! Shared vocabulary of the campus emotional climate engine: emotion scores,
//! activity bands, weather labels, temperature records, configuration, and
//! the clock/cache/store seams every other crate is written against.

pub mod activity;
pub mod cache;
pub mod clock;
pub mod config;
pub mod emotion;
pub mod store;
pub mod temperature;
pub mod weather;

pub use activity::ActivityLevel;
pub use cache::{Cache, MemoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ClimateConfig;
pub use emotion::{EmotionAverages, EmotionKind, EmotionScoreSet, Emotions};
pub use store::{Post, PostStore, TemperatureLedger};
pub use temperature::{
    AdjustmentReason, CampusTemperatureRecord, DailyCampusSummary, GuidelineTable,
    TemperatureGuideline,
};
pub use weather::Weather;
