use super::prometheus;
use super::types::*;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const MEMORY_USAGE_BYTES: &str = "memory_usage_bytes";
pub const CPU_USAGE_PERCENT: &str = "cpu_usage_percent";
pub const ACTIVE_CONNECTIONS: &str = "active_connections";
pub const HEALTH_CHECK_STATUS: &str = "health_check_status";

const BUILT_IN_METRICS: [(&str, MetricType, &str); 6] = [
    (HTTP_REQUESTS_TOTAL, MetricType::Counter, "Total number of HTTP requests"),
    (
        HTTP_REQUEST_DURATION_SECONDS,
        MetricType::Histogram,
        "HTTP request duration in seconds",
    ),
    (MEMORY_USAGE_BYTES, MetricType::Gauge, "Process resident memory in bytes"),
    (CPU_USAGE_PERCENT, MetricType::Gauge, "Process CPU usage percentage"),
    (ACTIVE_CONNECTIONS, MetricType::Gauge, "Number of active connections"),
    (
        HEALTH_CHECK_STATUS,
        MetricType::Gauge,
        "Aggregate health status (1 = healthy, 0.5 = degraded, 0 = unhealthy)",
    ),
];

/// Configuration for metric retention and background sampling.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Maximum values retained per metric and per bounded record list
    pub history_cap: usize,

    /// Period of the background system sampler
    pub sample_interval: Duration,

    /// Age after which the background task purges samples
    pub retention: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            history_cap: 1000,
            sample_interval: Duration::from_secs(5),
            retention: Duration::from_secs(3600),
        }
    }
}

trait BoundedPush<T> {
    fn push_bounded(&mut self, value: T, max_size: usize);
}

impl<T> BoundedPush<T> for VecDeque<T> {
    fn push_bounded(&mut self, value: T, max_size: usize) {
        self.push_back(value);
        while self.len() > max_size {
            self.pop_front();
        }
    }
}

/// Registered metrics in registration order plus the bounded record lists.
#[derive(Default)]
struct MetricsInner {
    metrics: Vec<Metric>,
    index: HashMap<String, usize>,
    api_metrics: VecDeque<ApiMetricRecord>,
    performance: VecDeque<PerformanceSample>,
}

impl MetricsInner {
    fn register(&mut self, name: &str, metric_type: MetricType, help: &str) {
        if let Some(&idx) = self.index.get(name) {
            let existing = &self.metrics[idx];
            if existing.metric_type != metric_type {
                warn!(
                    metric = name,
                    registered = %existing.metric_type,
                    requested = %metric_type,
                    "Metric already registered with a different type, keeping the original"
                );
            }
            return;
        }
        self.index.insert(name.to_string(), self.metrics.len());
        self.metrics.push(Metric::new(name, metric_type, help));
    }

    fn register_built_ins(&mut self) {
        for (name, metric_type, help) in BUILT_IN_METRICS {
            self.register(name, metric_type, help);
        }
    }

    fn record(
        &mut self,
        name: &str,
        metric_type: MetricType,
        value: f64,
        labels: &[(&str, &str)],
        cap: usize,
    ) {
        if !value.is_finite() {
            warn!(metric = name, value, "Dropping non-finite metric value");
            return;
        }

        let Some(&idx) = self.index.get(name) else {
            warn!(metric = name, "Metric not registered, dropping value");
            return;
        };

        let metric = &mut self.metrics[idx];
        if metric.metric_type != metric_type {
            warn!(
                metric = name,
                registered = %metric.metric_type,
                attempted = %metric_type,
                "Metric type mismatch, dropping value"
            );
            return;
        }

        metric.values.push_bounded(
            MetricValue {
                value,
                timestamp: Utc::now(),
                labels: labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            cap,
        );
    }
}

static GLOBAL: OnceLock<Arc<MetricsCollector>> = OnceLock::new();

/// In-memory time-series store for counters, gauges and histograms.
///
/// Every recording call is infallible from the caller's point of view:
/// unregistered names, type mismatches and non-finite values are logged
/// and dropped. Each series keeps at most `history_cap` values, dropping
/// the oldest first.
pub struct MetricsCollector {
    inner: RwLock<MetricsInner>,
    config: MetricsConfig,
    start_time: Instant,
}

impl MetricsCollector {
    /// Creates an isolated collector with the built-in metric set registered.
    pub fn new(config: MetricsConfig) -> Self {
        let mut inner = MetricsInner::default();
        inner.register_built_ins();

        Self {
            inner: RwLock::new(inner),
            config,
            start_time: Instant::now(),
        }
    }

    /// Initializes the process-wide collector. Later calls return the
    /// instance created by the first one and ignore `config`.
    pub fn init_global(config: MetricsConfig) -> Arc<Self> {
        GLOBAL.get_or_init(|| Arc::new(Self::new(config))).clone()
    }

    /// The process-wide collector, created with defaults on first use.
    pub fn global() -> Arc<Self> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::new(MetricsConfig::default())))
            .clone()
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Declares a metric. Re-registering an existing name is a no-op.
    pub async fn register(&self, name: &str, metric_type: MetricType, help: &str) {
        self.inner.write().await.register(name, metric_type, help);
    }

    pub async fn record_counter(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.record(name, MetricType::Counter, value, labels).await;
    }

    pub async fn record_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.record(name, MetricType::Gauge, value, labels).await;
    }

    pub async fn record_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.record(name, MetricType::Histogram, value, labels).await;
    }

    async fn record(&self, name: &str, metric_type: MetricType, value: f64, labels: &[(&str, &str)]) {
        let cap = self.config.history_cap;
        self.inner
            .write()
            .await
            .record(name, metric_type, value, labels, cap);
    }

    /// Stores an API record and derives the request counter and duration histogram.
    #[instrument(skip(self, record), fields(endpoint = %record.endpoint, status = record.status_code))]
    pub async fn record_api_metric(&self, record: ApiMetricRecord) {
        if !record.response_time_ms.is_finite() || record.response_time_ms < 0.0 {
            warn!(
                response_time_ms = record.response_time_ms,
                "Dropping API metric with invalid response time"
            );
            return;
        }

        let cap = self.config.history_cap;
        let status = record.status_code.to_string();
        let seconds = record.response_time_ms / 1000.0;

        let mut inner = self.inner.write().await;
        inner.record(
            HTTP_REQUESTS_TOTAL,
            MetricType::Counter,
            1.0,
            &[
                ("endpoint", record.endpoint.as_str()),
                ("method", record.method.as_str()),
                ("status", status.as_str()),
            ],
            cap,
        );
        inner.record(
            HTTP_REQUEST_DURATION_SECONDS,
            MetricType::Histogram,
            seconds,
            &[("endpoint", record.endpoint.as_str()), ("method", record.method.as_str())],
            cap,
        );
        inner.api_metrics.push_bounded(record, cap);
    }

    /// Stores a performance sample and mirrors its resource fields into gauges.
    pub async fn record_performance_metric(&self, sample: PerformanceSample) {
        let cap = self.config.history_cap;
        let mut inner = self.inner.write().await;

        inner.record(
            MEMORY_USAGE_BYTES,
            MetricType::Gauge,
            sample.memory_usage_bytes as f64,
            &[],
            cap,
        );
        inner.record(
            CPU_USAGE_PERCENT,
            MetricType::Gauge,
            sample.cpu_usage_percent,
            &[],
            cap,
        );
        inner.record(
            ACTIVE_CONNECTIONS,
            MetricType::Gauge,
            sample.active_connections as f64,
            &[],
            cap,
        );
        inner.performance.push_bounded(sample, cap);
    }

    /// Aggregates the retained API records.
    pub async fn get_api_metrics_summary(&self) -> ApiMetricsSummary {
        let inner = self.inner.read().await;
        summarize(&inner.api_metrics)
    }

    /// Renders every registered metric in the text exposition format.
    ///
    /// Output depends only on recorded state, so two calls without an
    /// intervening mutation are byte-identical.
    pub async fn export_prometheus_text(&self) -> String {
        let inner = self.inner.read().await;
        prometheus::render(&inner.metrics)
    }

    /// Removes every value and record older than `now - max_age`.
    pub async fn cleanup_old_metrics(&self, max_age: Duration) {
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return;
        };

        let mut inner = self.inner.write().await;
        let mut removed = 0usize;

        for metric in inner.metrics.iter_mut() {
            removed += retain_newer(&mut metric.values, cutoff, |v| v.timestamp);
        }
        removed += retain_newer(&mut inner.api_metrics, cutoff, |r| r.timestamp);
        removed += retain_newer(&mut inner.performance, cutoff, |s| s.timestamp);

        if removed > 0 {
            debug!(removed, "Purged expired metric samples");
        }
    }

    /// Clears all state and re-registers the built-in metric set.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        *inner = MetricsInner::default();
        inner.register_built_ins();
    }

    /// Copy of a single metric, if registered.
    pub async fn metric(&self, name: &str) -> Option<Metric> {
        let inner = self.inner.read().await;
        inner.index.get(name).map(|&idx| inner.metrics[idx].clone())
    }

    pub async fn api_metrics(&self) -> Vec<ApiMetricRecord> {
        self.inner.read().await.api_metrics.iter().cloned().collect()
    }

    pub async fn performance_samples(&self) -> Vec<PerformanceSample> {
        self.inner.read().await.performance.iter().cloned().collect()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

fn retain_newer<T>(
    items: &mut VecDeque<T>,
    cutoff: DateTime<Utc>,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
) -> usize {
    let before = items.len();
    items.retain(|item| timestamp(item) >= cutoff);
    before - items.len()
}

fn summarize(records: &VecDeque<ApiMetricRecord>) -> ApiMetricsSummary {
    if records.is_empty() {
        return ApiMetricsSummary::default();
    }

    let total = records.len();
    let total_time: f64 = records.iter().map(|r| r.response_time_ms).sum();
    let errors = records.iter().filter(|r| r.is_error()).count();

    // First-seen order is preserved so the stable sort breaks ties by it.
    let mut endpoint_counts: Vec<EndpointCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut distribution = std::collections::BTreeMap::new();

    for record in records {
        match positions.get(record.endpoint.as_str()) {
            Some(&pos) => endpoint_counts[pos].count += 1,
            None => {
                positions.insert(record.endpoint.as_str(), endpoint_counts.len());
                endpoint_counts.push(EndpointCount {
                    endpoint: record.endpoint.clone(),
                    count: 1,
                });
            }
        }

        let bucket = (record.status_code / 100 * 100).to_string();
        *distribution.entry(bucket).or_insert(0u64) += 1;
    }

    endpoint_counts.sort_by(|a, b| b.count.cmp(&a.count));
    endpoint_counts.truncate(10);

    ApiMetricsSummary {
        total_requests: total as u64,
        average_response_time: total_time / total as f64,
        error_rate: errors as f64 / total as f64 * 100.0,
        top_endpoints: endpoint_counts,
        status_code_distribution: distribution,
    }
}
