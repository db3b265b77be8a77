use super::manager::expiry_after;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Remote tier behind the primary in-memory cache.
///
/// Values cross this boundary as JSON text; the adapter owns its own copies
/// and is only eventually consistent with the primary store.
#[async_trait]
pub trait SecondaryCache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Simulated secondary tier kept in process memory.
///
/// Supports failure and latency injection so callers can exercise the
/// degraded paths without a network backend.
#[derive(Default)]
pub struct InMemorySecondary {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    failing: AtomicBool,
    latency: Option<Duration>,
}

impl InMemorySecondary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// While set, every call fails.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Raw stored JSON, ignoring expiry.
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).map(|(v, _)| v.clone())
    }

    async fn simulate(&self) -> anyhow::Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("simulated secondary cache failure");
        }
        Ok(())
    }
}

#[async_trait]
impl SecondaryCache for InMemorySecondary {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.simulate().await?;
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expires_at)) if Instant::now() > *expires_at => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        self.simulate().await?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), expiry_after(Instant::now(), ttl)));
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.simulate().await?;
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.simulate().await?;
        self.entries.lock().await.clear();
        Ok(())
    }
}
