use crate::infrastructure::{
    cache::JsonCache, health::HealthChecker, logging::StructuredLogger,
    monitoring::MetricsCollector,
};
use crate::presentation::http::response::ResponseOptimizer;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsCollector>,
    pub health: Arc<HealthChecker>,
    pub cache: Arc<JsonCache>,
    pub logger: Arc<StructuredLogger>,
    pub optimizer: Arc<ResponseOptimizer>,

    /// Requests currently being served
    pub in_flight: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(
        metrics: Arc<MetricsCollector>,
        health: Arc<HealthChecker>,
        cache: Arc<JsonCache>,
        logger: Arc<StructuredLogger>,
        optimizer: ResponseOptimizer,
    ) -> Self {
        Self {
            metrics,
            health,
            cache,
            logger,
            optimizer: Arc::new(optimizer),
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }
}
