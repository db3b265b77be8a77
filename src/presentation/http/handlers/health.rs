use crate::infrastructure::health::{
    DetailedHealthCheck, LivenessReport, ReadinessReport, ReadinessStatus,
};
use crate::presentation::http::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Process liveness. Never touches a dependency.
pub async fn liveness(State(state): State<AppState>) -> Json<LivenessReport> {
    Json(state.health.liveness())
}

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let report: ReadinessReport = state.health.readiness().await;

    let code = match report.status {
        ReadinessStatus::Ready => StatusCode::OK,
        ReadinessStatus::NotReady => StatusCode::SERVICE_UNAVAILABLE,
    };
    if code != StatusCode::OK {
        tracing::warn!(status = %report.checks.status, "Readiness check failed");
    }

    (code, Json(report))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let detailed: DetailedHealthCheck = state.health.get_detailed_health_check().await;
    let code = detailed.health.status.http_status();
    (code, Json(detailed))
}
