//! The campus climate engine: turns windows of campus posts into emotion
//! statistics, an emotional weather label and a continuously controlled
//! campus temperature.

pub mod activity;
pub mod schedule;
pub mod service;
pub mod statistics;
pub mod temperature;
pub mod time_range;
pub mod weather;

pub use activity::ActivityAnalyzer;
pub use schedule::{JobKind, JobSchedule, ScheduleEntry};
pub use service::{AnalysisOutcome, AnalysisReport, ClimateService, ClimateSnapshot};
pub use statistics::StatisticsStore;
pub use temperature::TemperatureManager;
pub use time_range::{TimeRange, TimeRangeKind};

use climate_core::{Cache, Clock, PostStore, TemperatureLedger};
use std::sync::Arc;

/// Injected collaborators shared by every component of the engine.
#[derive(Clone)]
pub struct Backends {
    pub posts: Arc<dyn PostStore>,
    pub ledger: Arc<dyn TemperatureLedger>,
    pub cache: Arc<dyn Cache>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Use one store for posts, the ledger and the cache.
    pub fn shared<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: PostStore + TemperatureLedger + Cache + 'static,
    {
        Self {
            posts: store.clone(),
            ledger: store.clone(),
            cache: store,
            clock,
        }
    }
}
