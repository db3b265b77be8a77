//! Metrics collection for the operational layer.
//!
//! This module provides:
//! - A bounded in-memory time-series store for counters, gauges and histograms
//! - Bounded API request and performance sample lists with summary aggregation
//! - Text exposition export
//! - A background sampler feeding process memory/CPU into the system gauges

pub mod metrics;
pub mod prometheus;
pub mod sampler;
pub mod types;

pub use metrics::{
    ACTIVE_CONNECTIONS, CPU_USAGE_PERCENT, HEALTH_CHECK_STATUS, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUESTS_TOTAL, MEMORY_USAGE_BYTES, MetricsCollector, MetricsConfig,
};
pub use sampler::{
    ProcessSampler, ProcessStats, current_process_stats, process_start, process_uptime,
    spawn_system_sampler,
};
pub use types::*;
