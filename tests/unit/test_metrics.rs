use venue_ops::infrastructure::monitoring::{
    ApiMetricRecord, MetricType, MetricsCollector, MetricsConfig,
};

fn collector(history_cap: usize) -> MetricsCollector {
    MetricsCollector::new(MetricsConfig {
        history_cap,
        ..MetricsConfig::default()
    })
}

#[tokio::test]
async fn history_keeps_the_most_recent_window() {
    let metrics = collector(5);
    metrics
        .register("queue_depth", MetricType::Gauge, "Pending jobs")
        .await;

    for i in 0..12 {
        metrics.record_gauge("queue_depth", i as f64, &[]).await;
    }

    let metric = metrics.metric("queue_depth").await.unwrap();
    let values: Vec<f64> = metric.values.iter().map(|v| v.value).collect();
    assert_eq!(values, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
}

#[tokio::test]
async fn export_is_deterministic() {
    let metrics = collector(100);
    metrics
        .record_api_metric(ApiMetricRecord::new("/venues", "GET", 200, 12.0))
        .await;
    metrics
        .record_api_metric(ApiMetricRecord::new("/bookings", "POST", 201, 30.0))
        .await;

    let first = metrics.export_prometheus_text().await;
    let second = metrics.export_prometheus_text().await;
    assert_eq!(first, second);
    assert!(first.contains("http_request_duration_seconds{endpoint=\"/venues\",method=\"GET\"} 0.012"));
}

#[tokio::test]
async fn summary_matches_reference_figures() {
    let metrics = collector(100);
    for (status, ms) in [(200, 100.0), (200, 150.0), (400, 200.0)] {
        metrics
            .record_api_metric(ApiMetricRecord::new("/search", "GET", status, ms))
            .await;
    }

    let summary = metrics.get_api_metrics_summary().await;
    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.average_response_time, 150.0);
    assert!((summary.error_rate - 33.33).abs() < 0.01);
    assert_eq!(summary.status_code_distribution["200"], 2);
    assert_eq!(summary.status_code_distribution["400"], 1);
}

#[tokio::test]
async fn reset_restores_built_ins_only() {
    let metrics = collector(100);
    metrics.register("custom", MetricType::Counter, "Custom").await;
    metrics
        .record_api_metric(ApiMetricRecord::new("/a", "GET", 200, 1.0))
        .await;

    metrics.reset().await;

    assert!(metrics.metric("custom").await.is_none());
    assert!(metrics.metric("http_requests_total").await.unwrap().values.is_empty());
    assert!(metrics.api_metrics().await.is_empty());
}
