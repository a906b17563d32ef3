use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use climate_core::clock::{from_epoch, to_epoch};
use climate_core::{
    Cache, CampusTemperatureRecord, Clock, DailyCampusSummary, Post, PostStore, SystemClock,
    TemperatureLedger, Weather,
};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Self::with_clock(db_path, Arc::new(SystemClock)).await
    }

    /// Open (creating if needed) the database. `clock` drives cache expiry.
    pub async fn with_clock<P: AsRef<Path>>(db_path: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = db_path.as_ref().display().to_string();

        // Every pooled connection to ":memory:" would be its own database.
        let (db_url, max_connections) = if path == ":memory:" {
            ("sqlite::memory:".to_string(), 1)
        } else {
            (format!("sqlite://{}?mode=rwc", path), 5)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database at {}", path))?;

        let store = Self { pool, clock };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create posts table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at)")
            .execute(&self.pool)
            .await
            .context("Failed to create posts created_at index")?;

        // Append-only audit trail of every temperature change.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS campus_temperature_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recorded_at INTEGER NOT NULL,
                temperature REAL NOT NULL,
                emotion_baseline REAL NOT NULL,
                post_adjustment REAL NOT NULL,
                post_count INTEGER NOT NULL,
                expected_hourly_average REAL NOT NULL,
                reason TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create campus_temperature_records table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_temperature_records_recorded_at ON campus_temperature_records(recorded_at)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create temperature records index")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_campus_summaries (
                date TEXT PRIMARY KEY,
                final_temperature REAL NOT NULL,
                weather TEXT NOT NULL,
                total_post_count INTEGER NOT NULL,
                average_hourly_posts REAL NOT NULL,
                min_temperature REAL NOT NULL,
                max_temperature REAL NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create daily_campus_summaries table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create kv_cache table")?;

        Ok(())
    }

    /// Insert a post into the local content table. Returns its id.
    pub async fn insert_post(&self, title: &str, body: &str, created_at: NaiveDateTime) -> Result<i64> {
        let result = sqlx::query("INSERT INTO posts (title, body, created_at) VALUES (?, ?, ?)")
            .bind(title)
            .bind(body)
            .bind(to_epoch(created_at))
            .execute(&self.pool)
            .await
            .context("Failed to insert post")?;
        Ok(result.last_insert_rowid())
    }

    /// Drop expired cache rows. Returns how many were removed.
    pub async fn prune_expired_cache(&self) -> Result<u64> {
        let now = to_epoch(self.clock.now());
        let result = sqlx::query("DELETE FROM kv_cache WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to prune kv_cache")?;
        Ok(result.rows_affected())
    }
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let created_at: i64 = row.get("created_at");
    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        created_at: from_epoch(created_at).context("post created_at out of range")?,
    })
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<CampusTemperatureRecord> {
    let recorded_at: i64 = row.get("recorded_at");
    let reason: String = row.get("reason");
    Ok(CampusTemperatureRecord {
        id: Some(row.get("id")),
        recorded_at: from_epoch(recorded_at).context("record timestamp out of range")?,
        temperature: row.get("temperature"),
        emotion_baseline: row.get("emotion_baseline"),
        post_adjustment: row.get("post_adjustment"),
        post_count: row.get::<i64, _>("post_count").max(0) as u64,
        expected_hourly_average: row.get("expected_hourly_average"),
        reason: reason.parse()?,
    })
}

fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<DailyCampusSummary> {
    let date: String = row.get("date");
    let weather: String = row.get("weather");
    let created_at: i64 = row.get("created_at");
    Ok(DailyCampusSummary {
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("bad summary date {}", date))?,
        final_temperature: row.get("final_temperature"),
        weather: weather.parse::<Weather>().unwrap_or_default(),
        total_post_count: row.get::<i64, _>("total_post_count").max(0) as u64,
        average_hourly_posts: row.get("average_hourly_posts"),
        min_temperature: row.get("min_temperature"),
        max_temperature: row.get("max_temperature"),
        created_at: from_epoch(created_at).context("summary timestamp out of range")?,
    })
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn posts_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<Post>> {
        let rows = sqlx::query(
            "SELECT id, title, body, created_at FROM posts \
             WHERE created_at >= ? AND created_at < ? \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(to_epoch(start))
        .bind(to_epoch(end))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch posts in range")?;

        rows.iter().map(row_to_post).collect()
    }

    async fn count_posts_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM posts WHERE created_at >= ? AND created_at < ?")
            .bind(to_epoch(start))
            .bind(to_epoch(end))
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts in range")?;
        Ok(row.get::<i64, _>("n").max(0) as u64)
    }
}

#[async_trait]
impl TemperatureLedger for SqliteStore {
    async fn append_record(&self, record: &CampusTemperatureRecord) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO campus_temperature_records \
             (recorded_at, temperature, emotion_baseline, post_adjustment, post_count, \
              expected_hourly_average, reason) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(to_epoch(record.recorded_at))
        .bind(record.temperature)
        .bind(record.emotion_baseline)
        .bind(record.post_adjustment)
        .bind(record.post_count as i64)
        .bind(record.expected_hourly_average)
        .bind(record.reason.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to append temperature record")?;

        let id = result.last_insert_rowid();
        tracing::debug!(
            "Temperature record #{}: {:.1} ({})",
            id,
            record.temperature,
            record.reason
        );
        Ok(id)
    }

    async fn recent_records(&self, limit: u32) -> Result<Vec<CampusTemperatureRecord>> {
        let rows = sqlx::query(
            "SELECT id, recorded_at, temperature, emotion_baseline, post_adjustment, post_count, \
             expected_hourly_average, reason \
             FROM campus_temperature_records ORDER BY recorded_at DESC, id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent temperature records")?;

        rows.iter().map(row_to_record).collect()
    }

    async fn records_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CampusTemperatureRecord>> {
        let rows = sqlx::query(
            "SELECT id, recorded_at, temperature, emotion_baseline, post_adjustment, post_count, \
             expected_hourly_average, reason \
             FROM campus_temperature_records \
             WHERE recorded_at >= ? AND recorded_at < ? \
             ORDER BY recorded_at DESC, id DESC",
        )
        .bind(to_epoch(start))
        .bind(to_epoch(end))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch temperature records in range")?;

        rows.iter().map(row_to_record).collect()
    }

    async fn upsert_daily_summary(&self, summary: &DailyCampusSummary) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO daily_campus_summaries
                (date, final_temperature, weather, total_post_count, average_hourly_posts,
                 min_temperature, max_temperature, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                final_temperature = excluded.final_temperature,
                weather = excluded.weather,
                total_post_count = excluded.total_post_count,
                average_hourly_posts = excluded.average_hourly_posts,
                min_temperature = excluded.min_temperature,
                max_temperature = excluded.max_temperature,
                created_at = excluded.created_at
            "#,
        )
        .bind(summary.date.format("%Y-%m-%d").to_string())
        .bind(summary.final_temperature)
        .bind(summary.weather.as_str())
        .bind(summary.total_post_count as i64)
        .bind(summary.average_hourly_posts)
        .bind(summary.min_temperature)
        .bind(summary.max_temperature)
        .bind(to_epoch(summary.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to upsert daily campus summary")?;
        Ok(())
    }

    async fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailyCampusSummary>> {
        let row = sqlx::query("SELECT * FROM daily_campus_summaries WHERE date = ?")
            .bind(date.format("%Y-%m-%d").to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch daily campus summary")?;
        row.as_ref().map(row_to_summary).transpose()
    }

    async fn daily_summaries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyCampusSummary>> {
        // ISO dates compare correctly as text.
        let rows = sqlx::query(
            "SELECT * FROM daily_campus_summaries WHERE date >= ? AND date < ? ORDER BY date ASC",
        )
        .bind(from.format("%Y-%m-%d").to_string())
        .bind(to.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch daily campus summaries")?;
        rows.iter().map(row_to_summary).collect()
    }
}

#[async_trait]
impl Cache for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = to_epoch(self.clock.now());
        let row = sqlx::query(
            "SELECT value FROM kv_cache WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read kv_cache")?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Corrupt cache value for {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| to_epoch(self.clock.now()) + ttl.as_secs() as i64);
        sqlx::query(
            "INSERT INTO kv_cache (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value.to_string())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to write kv_cache")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .context("Failed to delete from kv_cache")?;
        Ok(())
    }
}
