use super::secondary::SecondaryCache;
use anyhow::Result;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::debug;

const SCAN_BATCH: usize = 500;

/// Redis-backed secondary cache tier.
///
/// Keys are namespaced so `clear` only removes entries written by this
/// service. Values are stored as JSON text with `SET EX`.
pub struct RedisCache {
    client: Client,
    namespace: String,
}

impl RedisCache {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

#[async_trait]
impl SecondaryCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        // Redis rejects a zero expiry.
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn.set_ex(self.namespaced(key), value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(self.namespaced(key)).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pattern = format!("{}:*", self.namespace);
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        // Incremental SCAN so a large keyspace never blocks the server
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                removed += keys.len();
                let _: () = conn.del(keys).await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(removed, namespace = %self.namespace, "Cleared secondary cache");
        Ok(())
    }
}
