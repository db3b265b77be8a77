use super::types::*;
use crate::infrastructure::monitoring::{
    HEALTH_CHECK_STATUS, MetricsCollector, current_process_stats, process_start, process_uptime,
};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::join_all;
use serde_json::json;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Name of the informational entry added to every result.
pub const SYSTEM_CHECK: &str = "system";

/// A dependency probe.
///
/// `Ok(true)` is healthy. `Ok(false)` and `Err(_)` are both reported as
/// unhealthy, the error message being carried into the outcome.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    async fn check(&self) -> anyhow::Result<bool>;
}

/// A named probe with its timeout budget and criticality.
#[derive(Clone)]
pub struct DependencyDescriptor {
    pub name: String,
    pub probe: Arc<dyn DependencyProbe>,
    pub timeout: Duration,
    pub critical: bool,
}

impl DependencyDescriptor {
    pub fn new(
        name: impl Into<String>,
        probe: Arc<dyn DependencyProbe>,
        timeout: Duration,
        critical: bool,
    ) -> Self {
        Self {
            name: name.into(),
            probe,
            timeout,
            critical,
        }
    }
}

impl std::fmt::Debug for DependencyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyDescriptor")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("critical", &self.critical)
            .finish()
    }
}

/// Version and environment reported alongside every result.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub version: String,
    pub environment: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Runs dependency probes concurrently and folds them into one status.
///
/// Every probe is raced against its own timeout; the losing side of the
/// race is dropped, so a late answer can never change a reported outcome.
pub struct HealthChecker {
    dependencies: Vec<DependencyDescriptor>,
    metrics: Arc<MetricsCollector>,
    info: ServiceInfo,
}

impl HealthChecker {
    pub fn new(metrics: Arc<MetricsCollector>, info: ServiceInfo) -> Self {
        process_start();
        Self {
            dependencies: Vec::new(),
            metrics,
            info,
        }
    }

    /// Adds a dependency. A second descriptor with an existing name is
    /// ignored, as is one named [`SYSTEM_CHECK`].
    pub fn register(mut self, descriptor: DependencyDescriptor) -> Self {
        if descriptor.name == SYSTEM_CHECK {
            warn!(dependency = %descriptor.name, "Dependency name is reserved, ignoring");
            return self;
        }
        if self.dependencies.iter().any(|d| d.name == descriptor.name) {
            warn!(dependency = %descriptor.name, "Dependency already registered, ignoring duplicate");
            return self;
        }
        self.dependencies.push(descriptor);
        self
    }

    pub fn with_dependencies(self, descriptors: impl IntoIterator<Item = DependencyDescriptor>) -> Self {
        descriptors.into_iter().fold(self, Self::register)
    }

    pub fn dependencies(&self) -> &[DependencyDescriptor] {
        &self.dependencies
    }

    /// Time since the process started.
    pub fn uptime(&self) -> Duration {
        process_uptime()
    }

    /// Runs every probe, records the aggregate gauge and returns the result.
    #[instrument(skip(self))]
    pub async fn perform_health_check(&self) -> HealthCheckResult {
        let outcomes = join_all(self.dependencies.iter().map(run_probe)).await;

        let status = aggregate(self.dependencies.iter().zip(outcomes.iter()));
        let mut checks: BTreeMap<String, CheckOutcome> = self
            .dependencies
            .iter()
            .map(|d| d.name.clone())
            .zip(outcomes)
            .collect();
        checks.insert(SYSTEM_CHECK.to_string(), self.system_outcome().await);

        self.metrics
            .record_gauge(HEALTH_CHECK_STATUS, status.gauge_value(), &[])
            .await;

        debug!(%status, "Health check completed");

        HealthCheckResult {
            status,
            timestamp: Utc::now(),
            checks,
            uptime_ms: self.uptime().as_millis() as u64,
            version: self.info.version.clone(),
            environment: self.info.environment.clone(),
        }
    }

    /// Health result merged with request figures and process memory.
    pub async fn get_detailed_health_check(&self) -> DetailedHealthCheck {
        let health = self.perform_health_check().await;
        let summary = self.metrics.get_api_metrics_summary().await;
        let memory = tokio::task::spawn_blocking(current_process_stats)
            .await
            .ok()
            .flatten();

        DetailedHealthCheck {
            health,
            metrics: HealthMetrics {
                total_requests: summary.total_requests,
                average_response_time: summary.average_response_time,
                error_rate: summary.error_rate,
            },
            memory,
        }
    }

    /// True iff every critical probe passes within its timeout.
    pub async fn is_ready(&self) -> bool {
        let critical: Vec<&DependencyDescriptor> =
            self.dependencies.iter().filter(|d| d.critical).collect();
        let outcomes = join_all(critical.into_iter().map(run_probe)).await;
        outcomes.iter().all(CheckOutcome::is_healthy)
    }

    /// Liveness never consults a dependency.
    pub fn is_alive(&self) -> bool {
        !self.uptime().is_zero()
    }

    pub fn liveness(&self) -> LivenessReport {
        LivenessReport {
            status: if self.is_alive() {
                LivenessStatus::Healthy
            } else {
                LivenessStatus::Unhealthy
            },
            timestamp: Utc::now(),
            uptime: self.uptime().as_secs_f64(),
        }
    }

    pub async fn readiness(&self) -> ReadinessReport {
        let (ready, checks) = tokio::join!(self.is_ready(), self.perform_health_check());
        ReadinessReport {
            status: if ready {
                ReadinessStatus::Ready
            } else {
                ReadinessStatus::NotReady
            },
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn system_outcome(&self) -> CheckOutcome {
        let memory = tokio::task::spawn_blocking(current_process_stats)
            .await
            .ok()
            .flatten();

        CheckOutcome {
            status: CheckStatus::Healthy,
            response_time_ms: None,
            error: None,
            critical: None,
            details: Some(json!({
                "memory": memory,
                "uptimeMs": self.uptime().as_millis() as u64,
                "rustVersion": option_env!("VENUE_OPS_RUSTC_VERSION").unwrap_or("unknown"),
                "platform": format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            })),
        }
    }
}

/// Any critical failure is unhealthy; otherwise any failure is degraded.
fn aggregate<'a>(
    results: impl Iterator<Item = (&'a DependencyDescriptor, &'a CheckOutcome)>,
) -> HealthStatus {
    let mut status = HealthStatus::Healthy;
    for (descriptor, outcome) in results {
        if outcome.is_healthy() {
            continue;
        }
        if descriptor.critical {
            return HealthStatus::Unhealthy;
        }
        status = HealthStatus::Degraded;
    }
    status
}

async fn run_probe(descriptor: &DependencyDescriptor) -> CheckOutcome {
    let started = Instant::now();
    let guarded = AssertUnwindSafe(descriptor.probe.check()).catch_unwind();
    let result = tokio::time::timeout(descriptor.timeout, guarded).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let failure = match result {
        Ok(Ok(Ok(true))) => return CheckOutcome::healthy(elapsed_ms, descriptor.critical),
        Ok(Ok(Ok(false))) => "Dependency check failed".to_string(),
        Ok(Ok(Err(e))) => e.to_string(),
        Ok(Err(_)) => "Probe panicked".to_string(),
        Err(_) => "Timeout".to_string(),
    };

    warn!(
        dependency = %descriptor.name,
        critical = descriptor.critical,
        error = %failure,
        elapsed_ms,
        "Dependency check failed"
    );
    CheckOutcome::unhealthy(elapsed_ms, descriptor.critical, failure)
}
