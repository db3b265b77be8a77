use super::request_id::RequestId;
use crate::infrastructure::monitoring::{ACTIVE_CONNECTIONS, ApiMetricRecord, MetricsCollector};
use crate::presentation::http::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .map(str::to_string)
}

/// Counts a request as in flight until it completes or its future is dropped.
struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
    metrics: Arc<MetricsCollector>,
    entered_at: u64,
    done: bool,
}

impl InFlightGuard {
    fn enter(state: &AppState) -> Self {
        let entered_at = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        Self {
            in_flight: state.in_flight.clone(),
            metrics: state.metrics.clone(),
            entered_at,
            done: false,
        }
    }

    /// Decrements the counter and returns the remaining in-flight count.
    fn leave(mut self) -> u64 {
        self.done = true;
        decrement(&self.in_flight)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        // Cancelled mid-request: no await is possible here
        let active = decrement(&self.in_flight);
        let metrics = self.metrics.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                metrics
                    .record_gauge(ACTIVE_CONNECTIONS, active as f64, &[])
                    .await;
            });
        }
    }
}

fn decrement(counter: &AtomicU64) -> u64 {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
        .map_or(0, |previous| previous.saturating_sub(1))
}

/// Records every request into the metrics collector and the audit log.
pub async fn logging_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    // Route template keeps label cardinality bounded
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let ip_address = extract_client_ip(request.headers());

    let guard = InFlightGuard::enter(&state);
    state
        .metrics
        .record_gauge(ACTIVE_CONNECTIONS, guard.entered_at as f64, &[])
        .await;

    let response = next.run(request).await;

    let active = guard.leave();
    state
        .metrics
        .record_gauge(ACTIVE_CONNECTIONS, active as f64, &[])
        .await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = response.status().as_u16();

    let mut record = ApiMetricRecord::new(endpoint.clone(), method.clone(), status, elapsed_ms);
    record.ip_address = ip_address.clone();
    state.metrics.record_api_metric(record).await;

    tracing::info!("Request: {} {} -> {} ({:.1}ms)", method, endpoint, status, elapsed_ms);

    let audit = state
        .logger
        .create_request_logger(request_id, None, ip_address);
    tokio::spawn(async move {
        audit
            .log_api_call(&method, &endpoint, status, elapsed_ms, None)
            .await;
    });

    response
}
