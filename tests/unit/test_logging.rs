use serde_json::json;
use std::sync::Arc;
use venue_ops::infrastructure::logging::{LogLevel, LoggerConfig, StructuredLogger, log_context};

fn file_logger(dir: &std::path::Path, level: LogLevel) -> Arc<StructuredLogger> {
    Arc::new(StructuredLogger::new(LoggerConfig {
        service: "venue-api".to_string(),
        level,
        console: false,
        file: true,
        log_dir: dir.to_path_buf(),
        ..LoggerConfig::default()
    }))
}

fn read_log(dir: &std::path::Path) -> String {
    let date = chrono::Utc::now().format("%Y-%m-%d");
    std::fs::read_to_string(dir.join(format!("venue-api-{}.log", date))).unwrap_or_default()
}

#[tokio::test]
async fn file_sink_receives_admitted_entries_only() {
    let dir = tempfile::tempdir().unwrap();
    let logger = file_logger(dir.path(), LogLevel::Warn);

    logger.info("ignored", None).await;
    logger
        .warn("Slow upstream", log_context(json!({ "upstream": "maps" })))
        .await;

    let content = read_log(dir.path());
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("WARN venue-api: Slow upstream | Context: {\"upstream\":\"maps\"}"));
}

#[tokio::test]
async fn request_logger_lines_carry_request_and_user() {
    let dir = tempfile::tempdir().unwrap();
    let logger = file_logger(dir.path(), LogLevel::Info);
    let request = logger.create_request_logger("req-42", Some("user-1".to_string()), None);

    request
        .log_api_call("GET", "/venues", 200, 8.0, None)
        .await;

    let content = read_log(dir.path());
    assert!(content.contains("INFO venue-api: API GET /venues - 200 (8ms)"));
    assert!(content.contains(" | User: user-1 | Request: req-42"));
}
