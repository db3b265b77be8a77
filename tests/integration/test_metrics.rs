use super::helpers::{expect_status, get, read_bytes, read_json, read_text, send, spawn_app};
use axum::body::Body;
use http::{Request, StatusCode, header};
use serde_json::Value;
use venue_ops::infrastructure::monitoring::{HTTP_REQUESTS_TOTAL, MetricType};

#[tokio::test]
async fn requests_are_recorded_and_exported() {
    let app = spawn_app();

    send(&app.app, get("/health/live")).await;
    send(&app.app, get("/health/live")).await;
    send(&app.app, get("/does-not-exist")).await;

    let res = expect_status(send(&app.app, get("/metrics")).await, StatusCode::OK).await;
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );
    let text = read_text(res).await;

    assert!(text.starts_with(&format!(
        "# HELP {} ",
        HTTP_REQUESTS_TOTAL
    )));
    assert!(text.contains(&format!("# TYPE {} {}", HTTP_REQUESTS_TOTAL, MetricType::Counter)));
    assert!(text.contains(
        "http_requests_total{endpoint=\"/health/live\",method=\"GET\",status=\"200\"} 1"
    ));
    assert!(text.contains(
        "http_requests_total{endpoint=\"/does-not-exist\",method=\"GET\",status=\"404\"} 1"
    ));
    assert!(text.contains("# TYPE http_request_duration_seconds histogram"));
}

#[tokio::test]
async fn summary_reflects_recorded_traffic() {
    let app = spawn_app();

    send(&app.app, get("/health/live")).await;
    send(&app.app, get("/health/live")).await;
    send(&app.app, get("/nowhere")).await;

    let res = expect_status(send(&app.app, get("/metrics/summary")).await, StatusCode::OK).await;
    assert_eq!(res.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(res.headers()[header::VARY], "Accept-Encoding");
    let body: Value = read_json(res).await;

    assert_eq!(body["totalRequests"], 3);
    assert_eq!(body["topEndpoints"][0]["endpoint"], "/health/live");
    assert_eq!(body["topEndpoints"][0]["count"], 2);
    assert_eq!(body["statusCodeDistribution"]["200"], 2);
    assert_eq!(body["statusCodeDistribution"]["400"], 1);

    let rate = body["errorRate"].as_f64().unwrap();
    assert!((rate - 100.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn small_summary_is_not_compressed_even_when_accepted() {
    let app = spawn_app();
    send(&app.app, get("/health/live")).await;

    let req = Request::builder()
        .uri("/metrics/summary")
        .header(header::ACCEPT_ENCODING, "gzip, br")
        .body(Body::empty())
        .unwrap();
    let res = expect_status(send(&app.app, req).await, StatusCode::OK).await;

    assert!(res.headers().get(header::CONTENT_ENCODING).is_none());
    assert!(res.headers().get("x-original-size").is_none());
    assert!(res.headers()[header::ETAG].to_str().unwrap().starts_with("W/"));
    let body = read_bytes(res).await;
    assert!(body.len() < 1024);
    assert!(serde_json::from_slice::<Value>(&body).is_ok());
}

#[tokio::test]
async fn active_connections_return_to_zero() {
    let app = spawn_app();
    send(&app.app, get("/health/live")).await;

    let gauge = app
        .state
        .metrics
        .metric("active_connections")
        .await
        .expect("gauge registered");
    assert_eq!(gauge.values.back().unwrap().value, 0.0);
}
