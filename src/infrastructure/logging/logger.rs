use super::entry::{ErrorInfo, LogContext, LogEntry, LogLevel};
use super::sinks::{ConsoleSink, FileSink, LogSink, RemoteSink};
use futures_util::future::join_all;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RemoteSinkConfig {
    pub endpoint: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Service name stamped on every entry
    pub service: String,

    /// Minimum admitted level
    pub level: LogLevel,

    pub console: bool,
    pub file: bool,
    pub log_dir: PathBuf,
    pub max_file_size: u64,
    pub max_files: usize,

    /// Remote sink, enabled only when both endpoint and token are known
    pub remote: Option<RemoteSinkConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            service: "venue-api".to_string(),
            level: LogLevel::Info,
            console: true,
            file: false,
            log_dir: PathBuf::from("logs"),
            max_file_size: 10 * 1024 * 1024,
            max_files: 5,
            remote: None,
        }
    }
}

/// Leveled logger fanning each entry out to every enabled sink.
///
/// Sinks run concurrently and fail independently: a failing sink is reported
/// through `tracing` and never reaches the caller or the other sinks.
pub struct StructuredLogger {
    config: LoggerConfig,
    sinks: Vec<Arc<dyn LogSink>>,
}

impl StructuredLogger {
    pub fn new(config: LoggerConfig) -> Self {
        let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();
        if config.console {
            sinks.push(Arc::new(ConsoleSink));
        }
        if config.file {
            sinks.push(Arc::new(FileSink::new(
                config.log_dir.clone(),
                config.service.clone(),
                config.max_file_size,
                config.max_files,
            )));
        }
        if let Some(remote) = &config.remote {
            sinks.push(Arc::new(RemoteSink::new(
                remote.endpoint.clone(),
                remote.token.clone(),
            )));
        }
        Self::with_sinks(config, sinks)
    }

    pub fn with_sinks(config: LoggerConfig, sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { config, sinks }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<LogContext>,
        error: Option<ErrorInfo>,
    ) {
        if !self.config.level.admits(level) {
            return;
        }

        let entry = LogEntry::new(level, message, self.config.service.clone(), context, error);
        let results = join_all(self.sinks.iter().map(|sink| sink.write(&entry))).await;

        for (sink, result) in self.sinks.iter().zip(results) {
            if let Err(e) = result {
                warn!(sink = sink.name(), error = %e, "Structured log write failed");
            }
        }
    }

    pub async fn error(
        &self,
        message: impl Into<String>,
        context: Option<LogContext>,
        error: Option<ErrorInfo>,
    ) {
        self.log(LogLevel::Error, message, context, error).await;
    }

    pub async fn warn(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.log(LogLevel::Warn, message, context, None).await;
    }

    pub async fn info(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.log(LogLevel::Info, message, context, None).await;
    }

    pub async fn debug(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.log(LogLevel::Debug, message, context, None).await;
    }

    /// `API <method> <endpoint> - <status> (<ms>ms)`, leveled by status class.
    pub async fn log_api_call(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        response_time_ms: f64,
        context: Option<LogContext>,
    ) {
        let level = match status_code {
            400.. => LogLevel::Error,
            300..=399 => LogLevel::Warn,
            _ => LogLevel::Info,
        };

        let mut context = context.unwrap_or_default();
        context.insert("method".into(), Value::from(method));
        context.insert("endpoint".into(), Value::from(endpoint));
        context.insert("statusCode".into(), Value::from(status_code));
        context.insert("responseTime".into(), Value::from(response_time_ms));

        let message = format!(
            "API {} {} - {} ({}ms)",
            method,
            endpoint,
            status_code,
            response_time_ms.round() as u64
        );
        self.log(level, message, Some(context), None).await;
    }

    pub async fn log_business_event(&self, event: &str, context: Option<LogContext>) {
        self.log(
            LogLevel::Info,
            format!("Business Event: {}", event),
            context,
            None,
        )
        .await;
    }

    pub async fn log_security_event(&self, event: &str, context: Option<LogContext>) {
        self.log(
            LogLevel::Warn,
            format!("Security Event: {}", event),
            context,
            None,
        )
        .await;
    }

    pub async fn log_performance_metric(
        &self,
        metric: &str,
        value: f64,
        unit: &str,
        context: Option<LogContext>,
    ) {
        let mut context = context.unwrap_or_default();
        context.insert("metric".into(), Value::from(metric));
        context.insert("value".into(), Value::from(value));
        context.insert("unit".into(), Value::from(unit));

        self.log(
            LogLevel::Debug,
            format!("Performance Metric: {} = {}{}", metric, value, unit),
            Some(context),
            None,
        )
        .await;
    }

    /// A façade bound to one request. It shares this logger, it does not copy it.
    pub fn create_request_logger(
        self: &Arc<Self>,
        request_id: impl Into<String>,
        user_id: Option<String>,
        ip_address: Option<String>,
    ) -> RequestLogger {
        RequestLogger {
            logger: Arc::clone(self),
            request_id: request_id.into(),
            user_id,
            ip_address,
        }
    }
}

/// Injects `requestId`, `userId` and `ipAddress` into every context.
#[derive(Clone)]
pub struct RequestLogger {
    logger: Arc<StructuredLogger>,
    request_id: String,
    user_id: Option<String>,
    ip_address: Option<String>,
}

impl RequestLogger {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn shared(&self) -> &Arc<StructuredLogger> {
        &self.logger
    }

    fn bind(&self, context: Option<LogContext>) -> Option<LogContext> {
        let mut context = context.unwrap_or_default();
        context.insert("requestId".into(), Value::from(self.request_id.clone()));
        if let Some(user_id) = &self.user_id {
            context.insert("userId".into(), Value::from(user_id.clone()));
        }
        if let Some(ip) = &self.ip_address {
            context.insert("ipAddress".into(), Value::from(ip.clone()));
        }
        Some(context)
    }

    pub async fn error(
        &self,
        message: impl Into<String>,
        context: Option<LogContext>,
        error: Option<ErrorInfo>,
    ) {
        self.logger.error(message, self.bind(context), error).await;
    }

    pub async fn warn(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.logger.warn(message, self.bind(context)).await;
    }

    pub async fn info(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.logger.info(message, self.bind(context)).await;
    }

    pub async fn debug(&self, message: impl Into<String>, context: Option<LogContext>) {
        self.logger.debug(message, self.bind(context)).await;
    }

    pub async fn log_api_call(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        response_time_ms: f64,
        context: Option<LogContext>,
    ) {
        self.logger
            .log_api_call(method, endpoint, status_code, response_time_ms, self.bind(context))
            .await;
    }

    pub async fn log_business_event(&self, event: &str, context: Option<LogContext>) {
        self.logger.log_business_event(event, self.bind(context)).await;
    }

    pub async fn log_security_event(&self, event: &str, context: Option<LogContext>) {
        self.logger.log_security_event(event, self.bind(context)).await;
    }

    pub async fn log_performance_metric(
        &self,
        metric: &str,
        value: f64,
        unit: &str,
        context: Option<LogContext>,
    ) {
        self.logger
            .log_performance_metric(metric, value, unit, self.bind(context))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpsError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Captures entries in memory.
    #[derive(Default)]
    struct Capture {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl Capture {
        fn take(&self) -> Vec<LogEntry> {
            std::mem::take(&mut *self.entries.lock().unwrap())
        }
    }

    #[async_trait]
    impl LogSink for Capture {
        fn name(&self) -> &'static str {
            "capture"
        }

        async fn write(&self, entry: &LogEntry) -> Result<(), OpsError> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl LogSink for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn write(&self, _entry: &LogEntry) -> Result<(), OpsError> {
            Err(OpsError::sink("broken", "unreachable host"))
        }
    }

    fn logger(level: LogLevel) -> (Arc<StructuredLogger>, Arc<Capture>) {
        let capture = Arc::new(Capture::default());
        let config = LoggerConfig {
            level,
            ..LoggerConfig::default()
        };
        let logger = StructuredLogger::with_sinks(
            config,
            vec![
                Arc::new(Broken) as Arc<dyn LogSink>,
                capture.clone() as Arc<dyn LogSink>,
            ],
        );
        (Arc::new(logger), capture)
    }

    #[tokio::test]
    async fn test_level_filtering() {
        let (logger, capture) = logger(LogLevel::Warn);

        logger.error("e", None, None).await;
        logger.warn("w", None).await;
        logger.info("i", None).await;
        logger.debug("d", None).await;

        let levels: Vec<LogLevel> = capture.take().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Error, LogLevel::Warn]);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_others() {
        let (logger, capture) = logger(LogLevel::Debug);
        logger.info("still delivered", None).await;
        assert_eq!(capture.take().len(), 1);
    }

    #[tokio::test]
    async fn test_api_call_levels_and_message() {
        let (logger, capture) = logger(LogLevel::Debug);

        logger.log_api_call("GET", "/venues", 200, 12.4, None).await;
        logger.log_api_call("GET", "/old", 301, 3.0, None).await;
        logger.log_api_call("POST", "/bookings", 500, 87.0, None).await;

        let entries = capture.take();
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "API GET /venues - 200 (12ms)");
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[2].level, LogLevel::Error);
        assert_eq!(entries[2].context.as_ref().unwrap()["statusCode"], 500);
    }

    #[tokio::test]
    async fn test_fixed_level_helpers() {
        let (logger, capture) = logger(LogLevel::Debug);

        logger.log_business_event("booking_confirmed", None).await;
        logger.log_security_event("login_failed", None).await;
        logger.log_performance_metric("db_query", 42.0, "ms", None).await;

        let entries = capture.take();
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].message, "Business Event: booking_confirmed");
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[1].message, "Security Event: login_failed");
        assert_eq!(entries[2].level, LogLevel::Debug);
        assert_eq!(entries[2].message, "Performance Metric: db_query = 42ms");
    }

    #[tokio::test]
    async fn test_request_logger_injects_fields() {
        let (logger, capture) = logger(LogLevel::Info);
        let request = logger.create_request_logger(
            "req-1",
            Some("user-7".to_string()),
            Some("10.0.0.1".to_string()),
        );

        request
            .info("Listing viewed", crate::infrastructure::logging::log_context(json!({ "venue": 3 })))
            .await;
        request.warn("Slow query", None).await;

        let entries = capture.take();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.request_id.as_deref(), Some("req-1"));
            assert_eq!(entry.user_id.as_deref(), Some("user-7"));
            assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.1"));
        }
        assert_eq!(entries[0].context.as_ref().unwrap()["venue"], 3);
        assert!(Arc::ptr_eq(request.shared(), &logger));
    }

    #[tokio::test]
    async fn test_enabled_sinks_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let logger = StructuredLogger::new(LoggerConfig {
            console: false,
            file: true,
            log_dir: dir.path().to_path_buf(),
            remote: Some(RemoteSinkConfig {
                endpoint: "http://127.0.0.1:9/logs".to_string(),
                token: "t".to_string(),
            }),
            ..LoggerConfig::default()
        });
        assert_eq!(logger.sink_names(), vec!["file", "remote"]);
    }
}
