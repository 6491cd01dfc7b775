use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};

lazy_static! {
    pub static ref DATABASE_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "database_operation_duration_seconds",
        "Repository operation duration in seconds",
        &["operation", "table", "status"]
    ).expect("metric can be registered");

    pub static ref OPERATION_COUNTER: IntCounterVec = register_int_counter_vec!(
        "operations_total",
        "Total number of repository operations",
        &["operation", "table", "status"]
    ).expect("metric can be registered");

    pub static ref CONNECTION_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        "connection_attempts_total",
        "Session connection attempts by outcome",
        &["driver", "status"]
    ).expect("metric can be registered");

    pub static ref ACTIVE_SESSIONS: IntGaugeVec = register_int_gauge_vec!(
        "active_sessions",
        "Number of open keyspace-bound sessions",
        &["driver"]
    ).expect("metric can be registered");
}

fn status(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}

pub fn record_operation(operation: &str, table: &str, success: bool, duration: f64) {
    let status = status(success);
    DATABASE_OPERATION_DURATION
        .with_label_values(&[operation, table, status])
        .observe(duration);
    OPERATION_COUNTER
        .with_label_values(&[operation, table, status])
        .inc();
}

pub fn record_connection_attempt(driver: &str, success: bool) {
    CONNECTION_ATTEMPTS
        .with_label_values(&[driver, status(success)])
        .inc();
}

/// Prometheus text exposition of every registered metric
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
