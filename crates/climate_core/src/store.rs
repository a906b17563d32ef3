//! Seams to the persistence collaborators: the campus content store and the
//! temperature ledger.

use crate::temperature::{CampusTemperatureRecord, DailyCampusSummary};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A campus post as seen by the climate engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

/// Read-only view over the campus content store.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Posts with `start <= created_at < end`, newest first.
    async fn posts_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Post>>;

    /// Number of posts with `start <= created_at < end`.
    async fn count_posts_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<u64>;
}

/// Append-only temperature history plus the daily rollup table.
#[async_trait]
pub trait TemperatureLedger: Send + Sync {
    /// Append a record, returning its ledger id.
    async fn append_record(&self, record: &CampusTemperatureRecord) -> Result<i64>;

    /// Up to `limit` most recent records, newest first.
    async fn recent_records(&self, limit: u32) -> Result<Vec<CampusTemperatureRecord>>;

    /// Most recent record, if any.
    async fn latest_record(&self) -> Result<Option<CampusTemperatureRecord>> {
        Ok(self.recent_records(1).await?.into_iter().next())
    }

    /// Records with `start <= recorded_at < end`, newest first.
    async fn records_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CampusTemperatureRecord>>;

    /// Insert or replace the summary for `summary.date`.
    async fn upsert_daily_summary(&self, summary: &DailyCampusSummary) -> Result<()>;

    async fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailyCampusSummary>>;

    /// Summaries with `from <= date < to`, oldest first.
    async fn daily_summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCampusSummary>>;
}
