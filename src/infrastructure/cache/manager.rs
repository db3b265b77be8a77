use super::secondary::SecondaryCache;
use crate::error::OpsError;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Longest TTL an entry can carry; larger requests are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

const FALLBACK_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Deadline `ttl` after `now`, clamped to [`MAX_TTL`]. Never panics; if the
/// clock cannot represent the clamped deadline a one-day TTL is used.
pub(crate) fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_TTL))
        .or_else(|| now.checked_add(FALLBACK_TTL))
        .unwrap_or(now)
}

/// Cache sizing and timing knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Primary store capacity; inserting past it evicts the oldest entry
    pub max_size: usize,

    /// TTL applied when a caller does not pass one, and to secondary backfills
    pub default_ttl: Duration,

    /// Budget for any single secondary-tier call
    pub secondary_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl: Duration::from_secs(300),
            secondary_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
    pub created_at: Instant,

    /// Insertion sequence, breaks `created_at` ties
    seq: u64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,

    /// Mean age of surviving entries in milliseconds
    pub average_age: f64,

    /// Entries purged by the sweep that produced these stats
    pub expired_items: usize,
}

struct PrimaryStore<T> {
    entries: HashMap<String, CacheEntry<T>>,
    next_seq: u64,
}

impl<T> PrimaryStore<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    fn insert(&mut self, key: &str, value: T, ttl: Duration, max_size: usize) {
        if !self.entries.contains_key(key) && self.entries.len() >= max_size {
            self.evict_oldest();
        }

        let now = Instant::now();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: expiry_after(now, ttl),
                created_at: now,
                seq,
            },
        );
    }

    /// Removes the entry created first. Reads do not refresh position.
    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.created_at, entry.seq))
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            debug!(key = %key, "Evicting oldest cache entry");
            self.entries.remove(&key);
        }
    }

    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&CacheEntry<T>> {
        let expired = self.entries.get(key)?.is_expired(Instant::now());
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key)
    }

    fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}

/// Two-tier cache-aside store.
///
/// The primary tier is a bounded in-memory map with lazy TTL expiry and
/// creation-order eviction. The optional secondary tier is consulted on a
/// primary miss and written best-effort; any failure there is logged and
/// the cache degrades to primary-only behaviour.
pub struct CacheManager<T> {
    primary: Mutex<PrimaryStore<T>>,
    secondary: Option<Arc<dyn SecondaryCache>>,
    config: CacheConfig,
}

impl<T> CacheManager<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(config: CacheConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_secondary(config: CacheConfig, secondary: Arc<dyn SecondaryCache>) -> Self {
        Self::build(config, Some(secondary))
    }

    fn build(mut config: CacheConfig, secondary: Option<Arc<dyn SecondaryCache>>) -> Self {
        config.max_size = config.max_size.max(1);
        config.default_ttl = config.default_ttl.min(MAX_TTL);
        Self {
            primary: Mutex::new(PrimaryStore::new()),
            secondary,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    /// Stores `value` in the primary tier and mirrors it to the secondary.
    pub async fn set(&self, key: &str, value: T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.config.default_ttl).min(MAX_TTL);

        let json = match &self.secondary {
            Some(_) => match serde_json::to_string(&value) {
                Ok(json) => Some(json),
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache value not serializable, skipping secondary write");
                    None
                }
            },
            None => None,
        };

        self.primary
            .lock()
            .await
            .insert(key, value, ttl, self.config.max_size);

        if let (Some(secondary), Some(json)) = (&self.secondary, json) {
            if let Err(e) = self.secondary_call("set", secondary.set(key, &json, ttl)).await {
                warn!(key = %key, error = %e, "Secondary cache write failed");
            }
        }
    }

    /// Primary lookup, falling back to the secondary tier on a miss.
    ///
    /// A secondary hit is copied back into the primary tier with the default
    /// TTL, since the remaining remote TTL is not known.
    pub async fn get(&self, key: &str) -> Option<T> {
        {
            let mut primary = self.primary.lock().await;
            if let Some(entry) = primary.live(key) {
                return Some(entry.value.clone());
            }
        }

        let secondary = self.secondary.as_ref()?;
        let json = match self.secondary_call("get", secondary.get(key)).await {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Secondary cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<T>(&json) {
            Ok(value) => {
                debug!(key = %key, "Secondary cache hit, backfilling primary");
                self.primary.lock().await.insert(
                    key,
                    value.clone(),
                    self.config.default_ttl,
                    self.config.max_size,
                );
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Secondary cache returned undecodable value");
                None
            }
        }
    }

    /// Removes `key` from both tiers. Returns whether the primary held it.
    pub async fn delete(&self, key: &str) -> bool {
        let removed = self.primary.lock().await.entries.remove(key).is_some();

        if let Some(secondary) = &self.secondary {
            if let Err(e) = self.secondary_call("delete", secondary.delete(key)).await {
                warn!(key = %key, error = %e, "Secondary cache delete failed");
            }
        }

        removed
    }

    pub async fn clear(&self) {
        self.primary.lock().await.entries.clear();

        if let Some(secondary) = &self.secondary {
            if let Err(e) = self.secondary_call("clear", secondary.clear()).await {
                warn!(error = %e, "Secondary cache clear failed");
            }
        }
    }

    /// Primary-only membership test with lazy expiry.
    pub async fn has(&self, key: &str) -> bool {
        self.primary.lock().await.live(key).is_some()
    }

    /// Purges expired primary entries, then reports on the survivors.
    pub async fn get_stats(&self) -> CacheStats {
        let mut primary = self.primary.lock().await;
        let expired_items = primary.purge_expired();

        let now = Instant::now();
        let size = primary.entries.len();
        let average_age = if size == 0 {
            0.0
        } else {
            let total_ms: f64 = primary
                .entries
                .values()
                .map(|entry| now.duration_since(entry.created_at).as_secs_f64() * 1000.0)
                .sum();
            total_ms / size as f64
        };

        CacheStats {
            size,
            max_size: self.config.max_size,
            average_age,
            expired_items,
        }
    }

    async fn secondary_call<R>(
        &self,
        operation: &str,
        call: impl Future<Output = anyhow::Result<R>>,
    ) -> Result<R, OpsError> {
        let budget = self.config.secondary_timeout;
        match tokio::time::timeout(budget, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OpsError::CacheBackend(format!("{}: {}", operation, e))),
            Err(_) => Err(OpsError::timeout(format!("secondary cache {}", operation), budget)),
        }
    }
}

/// Cache-aside read: returns the cached value or runs `producer` once.
///
/// A producer error is returned unchanged and nothing is cached.
pub async fn with_cache<T, F, Fut>(
    cache: &CacheManager<T>,
    key: &str,
    producer: F,
    ttl: Option<Duration>,
) -> anyhow::Result<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    if let Some(cached) = cache.get(key).await {
        debug!("Cache HIT for key={}", key);
        return Ok(cached);
    }

    debug!("Cache MISS for key={}", key);
    let value = producer().await?;
    cache.set(key, value.clone(), ttl).await;
    Ok(value)
}

/// Cache of JSON documents shared by route handlers.
pub type JsonCache = CacheManager<serde_json::Value>;

static GLOBAL_CACHE: OnceLock<Arc<JsonCache>> = OnceLock::new();

/// Initializes the process-wide JSON cache. Later calls return the first
/// instance unchanged.
pub fn init_global_cache(
    config: CacheConfig,
    secondary: Option<Arc<dyn SecondaryCache>>,
) -> Arc<JsonCache> {
    GLOBAL_CACHE
        .get_or_init(|| Arc::new(JsonCache::build(config, secondary)))
        .clone()
}

/// The process-wide JSON cache, primary-only with defaults if never initialized.
pub fn global_cache() -> Arc<JsonCache> {
    GLOBAL_CACHE
        .get_or_init(|| Arc::new(JsonCache::new(CacheConfig::default())))
        .clone()
}
