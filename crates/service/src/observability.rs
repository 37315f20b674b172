use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static CONTENT_SERVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "site_admin_content_served_total",
        "Content reads and writes served, by backend",
        &["backend"]
    )
    .expect("register content_served_total")
});

pub static BACKEND_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "site_admin_backend_failures_total",
        "Content backend failures that triggered a fallback",
        &["backend"]
    )
    .expect("register backend_failures_total")
});

pub static MIRROR_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "site_admin_mirror_failures_total",
        "Best-effort image mirror updates that failed",
        &["mirror"]
    )
    .expect("register mirror_failures_total")
});

pub static UPLOADS_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "site_admin_uploads_rejected_total",
        "Image uploads refused before persistence",
        &["reason"]
    )
    .expect("register uploads_rejected_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
