use crate::presentation::http::response::{OptimizedResponse, ResponseOptions};
use crate::presentation::http::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics.export_prometheus_text().await;
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(EXPOSITION_CONTENT_TYPE))],
        body,
    )
}

pub async fn metrics_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> OptimizedResponse {
    let summary = state.metrics.get_api_metrics_summary().await;
    let options = ResponseOptions::from_headers(&headers).with_cache_control("no-cache");
    state.optimizer.optimize_response(&summary, options).await
}
