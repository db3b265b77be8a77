use super::{
    handlers::{health, metrics, ops},
    middleware::logging::logging_middleware,
    middleware::request_id::request_id_middleware,
    state::AppState,
};
use axum::{Router, middleware, routing::get};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/metrics/summary", get(metrics::metrics_summary))
        .route("/api/v1/ops/cache", get(ops::cache_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            logging_middleware,
        ))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
