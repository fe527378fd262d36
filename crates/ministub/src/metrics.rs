//! Prometheus metrics for ministub.
//!
//! Tracks served requests, executed actions and chained request latency.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of stub requests answered
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "ministub_requests_total",
        "Total number of requests answered by the stub server",
        &["method", "status"]
    )
    .unwrap();

    /// Actions executed, by kind and result
    pub static ref ACTIONS_TOTAL: CounterVec = register_counter_vec!(
        "ministub_actions_total",
        "Total number of actions executed",
        &["kind", "result"]  // kind: delay|request, result: success|error
    )
    .unwrap();

    /// Chained request duration
    pub static ref OUTBOUND_DURATION_MS: HistogramVec = register_histogram_vec!(
        "ministub_outbound_duration_ms",
        "Duration of chained outbound requests in milliseconds",
        &["result"],  // result: success|invalid|error
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record an answered request
pub fn record_request(method: &str, status: u16) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

/// Helper to record an executed action
pub fn record_action(kind: &str, success: bool) {
    let result = if success { "success" } else { "error" };
    ACTIONS_TOTAL.with_label_values(&[kind, result]).inc();
}

/// Helper to record a chained request
pub fn record_outbound(result: &str, duration_ms: f64) {
    OUTBOUND_DURATION_MS
        .with_label_values(&[result])
        .observe(duration_ms);
}
