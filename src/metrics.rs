/// Metrics for the registry lookup service
///
/// Prometheus-compatible counters and histograms for:
/// - HTTP request counts and latencies
/// - Per-source query outcomes and latencies
/// - Resolutions by query kind

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use tracing::warn;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Source Metrics ==========

    /// Source queries by source and outcome (ok, error, timeout, cancelled)
    pub static ref SOURCE_QUERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "registry_source_queries_total",
        "Total number of data source queries",
        &["source", "outcome"]
    )
    .unwrap();

    /// Source query duration in seconds
    pub static ref SOURCE_QUERY_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "registry_source_query_duration_seconds",
        "Data source query latencies in seconds",
        &["source"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // ========== Resolver Metrics ==========

    /// Resolutions by query kind
    pub static ref RESOLVE_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "registry_resolve_requests_total",
        "Total number of lookup resolutions",
        &["kind"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}
