//! Dependency health checks with liveness and readiness semantics.

pub mod checker;
pub mod probes;
pub mod types;

pub use checker::{DependencyDescriptor, DependencyProbe, HealthChecker, SYSTEM_CHECK, ServiceInfo};
pub use probes::{
    CacheBackendProbe, DatabaseClient, DatabaseProbe, ExternalApisProbe, FileStorageProbe,
    SubCheck, default_dependencies,
};
pub use types::*;
