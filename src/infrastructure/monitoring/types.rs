//! Metric types and data structures for the metrics collector.
//!
//! Defines the per-metric time series, the bounded request and performance
//! records, and the summary shapes handed to dashboards and health checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Label pairs in the order they were supplied.
pub type Labels = Vec<(String, String)>;

/// Supported metric types, rendered lowercase in the exposition format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Monotonically reported count of discrete occurrences
    Counter,

    /// Point-in-time measurement (memory bytes, active connections)
    Gauge,

    /// Distribution sample (request duration)
    Histogram,

    Summary,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Counter => write!(f, "counter"),
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Histogram => write!(f, "histogram"),
            MetricType::Summary => write!(f, "summary"),
        }
    }
}

/// A single recorded observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricValue {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub labels: Labels,
}

/// A registered metric and its bounded history.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: String,
    pub metric_type: MetricType,
    pub help: String,

    /// Oldest first; never longer than the collector's history cap
    pub values: VecDeque<MetricValue>,
}

impl Metric {
    pub fn new(name: impl Into<String>, metric_type: MetricType, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric_type,
            help: help.into(),
            values: VecDeque::new(),
        }
    }
}

/// One completed API request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMetricRecord {
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response_time_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
}

impl ApiMetricRecord {
    pub fn new(
        endpoint: impl Into<String>,
        method: impl Into<String>,
        status_code: u16,
        response_time_ms: f64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            status_code,
            response_time_ms,
            timestamp: Utc::now(),
            user_id: None,
            ip_address: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

/// Process-level performance sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSample {
    pub response_time_ms: f64,
    pub memory_usage_bytes: u64,
    pub cpu_usage_percent: f64,
    pub active_connections: u64,
    pub error_rate: f64,
    pub timestamp: DateTime<Utc>,
}

/// Request count for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCount {
    pub endpoint: String,
    pub count: u64,
}

/// Aggregate view over the retained API records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMetricsSummary {
    pub total_requests: u64,

    /// Arithmetic mean in milliseconds
    pub average_response_time: f64,

    /// Percentage (0-100) of records with status >= 400
    pub error_rate: f64,

    /// At most ten endpoints, busiest first
    pub top_endpoints: Vec<EndpointCount>,

    /// Keyed by hundreds bucket ("200", "400", ...)
    pub status_code_distribution: BTreeMap<String, u64>,
}
