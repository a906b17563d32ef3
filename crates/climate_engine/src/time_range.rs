//! Which slice of campus posts an analysis run looks at.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use climate_core::clock::{floor_hour, start_of_day};
use climate_core::{Post, PostStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRangeKind {
    /// The previous full clock hour.
    Scheduled,
    /// From the top of the current hour until now.
    Manual,
    FullDay {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl TimeRangeKind {
    /// `[date 00:00, date+1 00:00)`
    pub fn for_date(date: NaiveDate) -> Self {
        let start = start_of_day(date);
        TimeRangeKind::FullDay {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn resolve(&self, now: NaiveDateTime) -> TimeRange {
        match *self {
            TimeRangeKind::Scheduled => {
                let end = floor_hour(now);
                TimeRange {
                    start: end - Duration::hours(1),
                    end,
                    is_scheduled: true,
                }
            }
            TimeRangeKind::Manual => TimeRange {
                start: floor_hour(now),
                end: now,
                is_scheduled: false,
            },
            TimeRangeKind::FullDay { start, end } => TimeRange {
                start,
                end,
                is_scheduled: false,
            },
        }
    }
}

/// Half-open window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub is_scheduled: bool,
}

impl TimeRange {
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t < self.end
    }
}

/// Posts created inside `range`, newest first.
pub async fn fetch_posts(posts: &dyn PostStore, range: &TimeRange) -> Result<Vec<Post>> {
    if range.start >= range.end {
        return Ok(Vec::new());
    }
    posts
        .posts_between(range.start, range.end)
        .await
        .with_context(|| format!("Failed to fetch posts for {} .. {}", range.start, range.end))
}
