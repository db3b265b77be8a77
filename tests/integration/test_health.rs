use super::helpers::{expect_status, get, read_json, send, spawn_app};
use http::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_endpoints_report_healthy_service() {
    let app = spawn_app();

    let res = expect_status(send(&app.app, get("/health")).await, StatusCode::OK).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], "1.2.3");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["database"]["critical"], true);
    assert_eq!(body["checks"]["system"]["status"], "healthy");
    assert!(body["metrics"]["totalRequests"].is_u64());

    let res = expect_status(send(&app.app, get("/health/ready")).await, StatusCode::OK).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["status"], "healthy");
}

#[tokio::test]
async fn non_critical_failure_degrades_but_stays_available() {
    let app = spawn_app();
    app.storage.set(false);

    let res = expect_status(send(&app.app, get("/health")).await, StatusCode::OK).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["file_storage"]["error"], "connection refused");

    expect_status(send(&app.app, get("/health/ready")).await, StatusCode::OK).await;
}

#[tokio::test]
async fn critical_failure_fails_health_and_readiness_but_not_liveness() {
    let app = spawn_app();
    app.database.set(false);
    app.storage.set(false);

    let res = expect_status(
        send(&app.app, get("/health")).await,
        StatusCode::SERVICE_UNAVAILABLE,
    )
    .await;
    let body: Value = read_json(res).await;
    assert_eq!(body["status"], "unhealthy");

    let res = expect_status(
        send(&app.app, get("/health/ready")).await,
        StatusCode::SERVICE_UNAVAILABLE,
    )
    .await;
    let body: Value = read_json(res).await;
    assert_eq!(body["status"], "not_ready");

    let res = expect_status(send(&app.app, get("/health/live")).await, StatusCode::OK).await;
    let body: Value = read_json(res).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn recovery_is_reflected_on_next_check() {
    let app = spawn_app();
    app.database.set(false);
    expect_status(
        send(&app.app, get("/health/ready")).await,
        StatusCode::SERVICE_UNAVAILABLE,
    )
    .await;

    app.database.set(true);
    expect_status(send(&app.app, get("/health/ready")).await, StatusCode::OK).await;
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = spawn_app();
    let res = send(&app.app, get("/health/live")).await;
    let id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("missing x-request-id");
    assert!(uuid::Uuid::parse_str(id).is_ok());
}
