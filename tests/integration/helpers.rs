use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::Request,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower::ServiceExt;
use venue_ops::{
    infrastructure::{
        cache::{CacheConfig, JsonCache},
        health::{DependencyDescriptor, DependencyProbe, HealthChecker, ServiceInfo},
        logging::{LoggerConfig, StructuredLogger},
        monitoring::{MetricsCollector, MetricsConfig},
    },
    presentation::http::{
        response::ResponseOptimizer, routes::create_router, state::AppState,
    },
};

/// Probe whose answer can be flipped while the app is running.
pub struct Switch(AtomicBool);

impl Switch {
    pub fn new(up: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(up)))
    }

    pub fn set(&self, up: bool) {
        self.0.store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl DependencyProbe for Switch {
    async fn check(&self) -> anyhow::Result<bool> {
        if self.0.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            anyhow::bail!("connection refused")
        }
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub database: Arc<Switch>,
    pub storage: Arc<Switch>,
}

/// Router over isolated components: a critical `database` probe and a
/// non-critical `file_storage` probe, both initially up.
pub fn spawn_app() -> TestApp {
    let database = Switch::new(true);
    let storage = Switch::new(true);

    let metrics = Arc::new(MetricsCollector::new(MetricsConfig::default()));
    let health = HealthChecker::new(
        metrics.clone(),
        ServiceInfo {
            version: "1.2.3".to_string(),
            environment: "test".to_string(),
        },
    )
    .with_dependencies([
        DependencyDescriptor::new(
            "database",
            database.clone(),
            Duration::from_millis(500),
            true,
        ),
        DependencyDescriptor::new(
            "file_storage",
            storage.clone(),
            Duration::from_millis(500),
            false,
        ),
    ]);

    let logger = StructuredLogger::new(LoggerConfig {
        console: false,
        ..LoggerConfig::default()
    });

    let state = AppState::new(
        metrics,
        Arc::new(health),
        Arc::new(JsonCache::new(CacheConfig::default())),
        Arc::new(logger),
        ResponseOptimizer::default(),
    );

    TestApp {
        app: create_router(state.clone()),
        state,
        database,
        storage,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn read_json<T: DeserializeOwned>(res: axum::response::Response) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("failed to parse json")
}

pub async fn read_text(res: axum::response::Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("invalid utf8")
}

pub async fn read_bytes(res: axum::response::Response) -> Vec<u8> {
    to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("failed to read body")
        .to_vec()
}

pub async fn expect_status(
    res: axum::response::Response,
    expected: http::StatusCode,
) -> axum::response::Response {
    let actual = res.status();

    if actual == expected {
        return res;
    }

    let body = read_text(res).await;
    panic!(
        "HTTP status mismatch. Expected {}, got {}. Response body: {}",
        expected, actual, body
    );
}
