use crate::infrastructure::monitoring::ProcessStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Aggregate service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every dependency answered
    Healthy,
    /// Only non-critical dependencies are failing
    Degraded,
    /// At least one critical dependency is failing
    Unhealthy,
}

impl HealthStatus {
    /// Value recorded into the `health_check_status` gauge.
    pub fn gauge_value(self) -> f64 {
        match self {
            HealthStatus::Healthy => 1.0,
            HealthStatus::Degraded => 0.5,
            HealthStatus::Unhealthy => 0.0,
        }
    }

    /// Degraded still serves traffic, so only unhealthy maps to 503.
    pub fn http_status(self) -> http::StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => http::StatusCode::OK,
            HealthStatus::Unhealthy => http::StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Status of a single dependency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of one probe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub status: CheckStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CheckOutcome {
    pub fn healthy(response_time_ms: u64, critical: bool) -> Self {
        Self {
            status: CheckStatus::Healthy,
            response_time_ms: Some(response_time_ms),
            error: None,
            critical: Some(critical),
            details: None,
        }
    }

    pub fn unhealthy(response_time_ms: u64, critical: bool, error: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Unhealthy,
            response_time_ms: Some(response_time_ms),
            error: Some(error.into()),
            critical: Some(critical),
            details: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }
}

/// Full result of one health-check pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: BTreeMap<String, CheckOutcome>,
    pub uptime_ms: u64,
    pub version: String,
    pub environment: String,
}

/// Request figures merged into the detailed report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub total_requests: u64,
    pub average_response_time: f64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthCheck {
    #[serde(flatten)]
    pub health: HealthCheckResult,
    pub metrics: HealthMetrics,
    pub memory: Option<ProcessStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LivenessStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessReport {
    pub status: LivenessStatus,
    pub timestamp: DateTime<Utc>,

    /// Process uptime in seconds
    pub uptime: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub status: ReadinessStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthCheckResult,
}
