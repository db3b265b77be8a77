use crate::presentation::http::response::{OptimizedResponse, ResponseOptions};
use crate::presentation::http::state::AppState;
use axum::{extract::State, http::HeaderMap};

pub async fn cache_stats(State(state): State<AppState>, headers: HeaderMap) -> OptimizedResponse {
    let stats = state.cache.get_stats().await;
    let options = ResponseOptions::from_headers(&headers).with_cache_control("no-cache");
    state.optimizer.optimize_response(&stats, options).await
}
