//! Background system sampler.
//!
//! Periodically reads this process's memory and CPU usage into the system
//! gauges and purges samples older than the configured retention. On
//! platforms `sysinfo` cannot introspect, or when no tokio runtime is
//! running, the sampler logs once and does nothing.

use super::metrics::{CPU_USAGE_PERCENT, MEMORY_USAGE_BYTES, MetricsCollector};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Point-in-time resource usage of the current process.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStats {
    pub memory_bytes: u64,
    pub virtual_memory_bytes: u64,
    pub cpu_percent: f64,
}

/// Reads resource usage of the current process.
pub struct ProcessSampler {
    system: System,
    pid: Option<Pid>,
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = if sysinfo::IS_SUPPORTED_SYSTEM {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };

        Self {
            system: System::new(),
            pid,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.pid.is_some()
    }

    /// CPU usage is relative to the previous call, so the first sample reads 0.
    pub fn sample(&mut self) -> Option<ProcessStats> {
        let pid = self.pid?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        let process = self.system.process(pid)?;

        Some(ProcessStats {
            memory_bytes: process.memory(),
            virtual_memory_bytes: process.virtual_memory(),
            cpu_percent: f64::from(process.cpu_usage()),
        })
    }
}

impl ProcessSampler {
    /// Time since the OS started this process.
    pub fn run_time(&mut self) -> Option<Duration> {
        let pid = self.pid?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.system
            .process(pid)
            .map(|process| Duration::from_secs(process.run_time()))
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// When this process started.
///
/// Resolved once, backdating the first call by the OS-reported run time
/// (whole seconds). Without process introspection it anchors at the first
/// call, so call it early in `main`.
pub fn process_start() -> Instant {
    *PROCESS_START.get_or_init(|| {
        let now = Instant::now();
        let run_time = ProcessSampler::new().run_time().unwrap_or_default();
        now.checked_sub(run_time).unwrap_or(now)
    })
}

pub fn process_uptime() -> Duration {
    process_start().elapsed()
}

/// One-off reading used by health reports.
pub fn current_process_stats() -> Option<ProcessStats> {
    ProcessSampler::new().sample()
}

/// Starts the sampler and retention task for `collector`.
///
/// Returns `None` without spawning when called outside a tokio runtime.
/// The task is never cancelled; it lives as long as the runtime.
pub fn spawn_system_sampler(collector: Arc<MetricsCollector>) -> Option<JoinHandle<()>> {
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            warn!("No async runtime available, system sampler disabled");
            return None;
        }
    };

    let mut sampler = ProcessSampler::new();
    if !sampler.is_supported() {
        warn!("Process introspection not supported on this platform, system gauges will stay empty");
    }

    let interval = collector.config().sample_interval.max(MIN_SAMPLE_INTERVAL);
    let retention = collector.config().retention;
    info!(interval_ms = interval.as_millis() as u64, "Starting system sampler");

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            if let Some(stats) = sampler.sample() {
                collector
                    .record_gauge(MEMORY_USAGE_BYTES, stats.memory_bytes as f64, &[])
                    .await;
                collector
                    .record_gauge(CPU_USAGE_PERCENT, stats.cpu_percent, &[])
                    .await;
                debug!(
                    memory_bytes = stats.memory_bytes,
                    cpu_percent = stats.cpu_percent,
                    "Sampled process resources"
                );
            }

            collector.cleanup_old_metrics(retention).await;
        }
    }))
}
