use std::time::Duration;
use thiserror::Error;

/// Degradations raised inside the operational layer.
///
/// None of these reach a route handler: each is absorbed at the boundary
/// where it occurs and reduced to a `tracing` warning or a structured
/// unhealthy outcome.
#[derive(Debug, Error)]
pub enum OpsError {
    #[error("{operation} timed out after {}ms", budget.as_millis())]
    Timeout { operation: String, budget: Duration },

    #[error("Dependency {name} unavailable: {reason}")]
    DependencyUnavailable { name: String, reason: String },

    #[error("Log sink {sink} failed: {reason}")]
    SinkWrite { sink: &'static str, reason: String },

    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    #[error("Compression failed: {0}")]
    Compression(String),
}

impl OpsError {
    pub fn timeout(operation: impl Into<String>, budget: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            budget,
        }
    }

    pub fn sink(sink: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::SinkWrite {
            sink,
            reason: reason.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OpsError::timeout("secondary get", Duration::from_millis(250));
        assert_eq!(err.to_string(), "secondary get timed out after 250ms");
        assert!(err.is_timeout());

        let err = OpsError::sink("file", "disk full");
        assert_eq!(err.to_string(), "Log sink file failed: disk full");
        assert!(!err.is_timeout());
    }
}
