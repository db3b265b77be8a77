//! Built-in dependency probes and the default dependency set.

use super::checker::{DependencyDescriptor, DependencyProbe};
use crate::config::Config;
use crate::error::OpsError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Round trips slower than this fail the database probe even if they succeed.
pub const DATABASE_SLOW_THRESHOLD: Duration = Duration::from_millis(1000);

const CACHE_BACKEND_SIMULATED_DELAY: Duration = Duration::from_millis(10);

/// A single trivial round trip against the database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl DatabaseClient for sqlx::PgPool {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").fetch_one(self).await?;
        Ok(())
    }
}

/// Healthy iff the round trip both succeeds and finishes under one second.
pub struct DatabaseProbe {
    client: Arc<dyn DatabaseClient>,
}

impl DatabaseProbe {
    pub fn new(client: Arc<dyn DatabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DependencyProbe for DatabaseProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        let started = Instant::now();
        self.client.ping().await?;
        let elapsed = started.elapsed();

        if elapsed >= DATABASE_SLOW_THRESHOLD {
            return Err(OpsError::DependencyUnavailable {
                name: "database".to_string(),
                reason: format!("round trip took {}ms", elapsed.as_millis()),
            }
            .into());
        }
        Ok(true)
    }
}

/// Simulated cache-backend probe.
///
/// There is no real backend round trip here; it always succeeds after a short
/// delay and is registered as non-critical.
#[derive(Default)]
pub struct CacheBackendProbe;

#[async_trait]
impl DependencyProbe for CacheBackendProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        tokio::time::sleep(CACHE_BACKEND_SIMULATED_DELAY).await;
        Ok(true)
    }
}

/// Verifies the scratch directory accepts a write and a delete.
pub struct FileStorageProbe {
    scratch_dir: PathBuf,
}

impl FileStorageProbe {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait]
impl DependencyProbe for FileStorageProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let path = self
            .scratch_dir
            .join(format!(".health-{}", uuid::Uuid::now_v7()));
        tokio::fs::write(&path, b"ok").await?;
        tokio::fs::remove_file(&path).await?;

        debug!(dir = %self.scratch_dir.display(), "Scratch directory writable");
        Ok(true)
    }
}

/// One presence check inside the external-APIs probe.
#[derive(Debug, Clone)]
pub struct SubCheck {
    pub name: &'static str,
    pub passed: bool,
}

/// Passes when at least half of its sub-checks pass.
pub struct ExternalApisProbe {
    checks: Vec<SubCheck>,
}

impl ExternalApisProbe {
    pub fn new(checks: Vec<SubCheck>) -> Self {
        Self { checks }
    }

    /// Maps-provider key and mail configuration presence.
    pub fn from_config(config: &Config) -> Self {
        Self::new(vec![
            SubCheck {
                name: "maps_api_key",
                passed: config.maps_api_key.is_some(),
            },
            SubCheck {
                name: "email_config",
                passed: config.smtp_host.is_some() && config.smtp_user.is_some(),
            },
        ])
    }
}

#[async_trait]
impl DependencyProbe for ExternalApisProbe {
    async fn check(&self) -> anyhow::Result<bool> {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        // Empty list: 0 * 2 >= 0
        Ok(passed * 2 >= self.checks.len())
    }
}

/// The standard dependency set: database (critical), cache, file storage and
/// external APIs.
pub fn default_dependencies(
    config: &Config,
    database: Arc<dyn DatabaseClient>,
) -> Vec<DependencyDescriptor> {
    vec![
        DependencyDescriptor::new(
            "database",
            Arc::new(DatabaseProbe::new(database)),
            Duration::from_millis(5000),
            true,
        ),
        DependencyDescriptor::new(
            "cache",
            Arc::new(CacheBackendProbe),
            Duration::from_millis(3000),
            false,
        ),
        DependencyDescriptor::new(
            "file_storage",
            Arc::new(FileStorageProbe::new(config.storage_scratch_dir.clone())),
            Duration::from_millis(3000),
            false,
        ),
        DependencyDescriptor::new(
            "external_apis",
            Arc::new(ExternalApisProbe::from_config(config)),
            Duration::from_millis(5000),
            false,
        ),
    ]
}
