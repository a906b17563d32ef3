//! Shared key/value cache with optional per-key TTL.
//!
//! Values are JSON so the same abstraction can back onto an external cache
//! server, the SQLite `kv_cache` table, or the in-process [`MemoryCache`].
//! Writes are last-writer-wins; there is no compare-and-set.

use crate::clock::Clock;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value`. With `ttl = None` the entry never expires.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    /// Remove `key`. Deleting an absent key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        Ok(self.get(key).await?.and_then(|v| v.as_f64()))
    }

    async fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.get(key).await?.and_then(|v| v.as_u64()))
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(key)
            .await?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key).await?.and_then(|v| v.as_bool()))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<NaiveDateTime>,
}

/// In-process cache. Expiry is evaluated lazily against the injected clock.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live (non-expired) entries.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.expires_at.map_or(true, |at| at > now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(e) if e.expires_at.map_or(true, |at| at > now) => {
                    return Ok(Some(e.value.clone()))
                }
                Some(_) => {}
            }
        }
        // Expired: drop it so the map doesn't grow without bound.
        self.entries.write().await.remove(key);
        tracing::trace!("cache entry {} expired", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let expires_at = match ttl {
            Some(ttl) => Some(self.clock.now() + chrono::Duration::from_std(ttl)?),
            None => None,
        };
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
