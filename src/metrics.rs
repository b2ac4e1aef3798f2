//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Counter, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("academy_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "academy_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Enrollment Metrics
    pub static ref ENROLLMENT_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("academy_enrollment_transitions_total", "Total number of applied enrollment transitions"),
        &["transition"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("academy_uploads_total", "Total number of asset uploads"),
        &["category"]
    ).expect("metric can be created");
    pub static ref UPLOAD_BYTES_TOTAL: Counter = Counter::new(
        "academy_upload_bytes_total",
        "Total bytes of assets uploaded"
    ).expect("metric can be created");
    pub static ref SIGNED_URL_FAILURES_TOTAL: prometheus::IntCounter = prometheus::IntCounter::new(
        "academy_signed_url_failures_total",
        "Total number of asset references that could not be resolved"
    ).expect("metric can be created");

    // Notification Metrics
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("academy_notifications_total", "Total number of notifications pushed"),
        &["kind"]
    ).expect("metric can be created");
    pub static ref NOTIFICATIONS_ACTIVE: IntGauge = IntGauge::new(
        "academy_notifications_active",
        "Notifications currently waiting to expire"
    ).expect("metric can be created");

    // Assistant Metrics
    pub static ref VIDEO_JOBS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("academy_video_jobs_total", "Total number of finished video generation jobs"),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("academy_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

fn register(name: &str, collector: Box<dyn prometheus::core::Collector>) {
    if let Err(error) = REGISTRY.register(collector) {
        tracing::warn!(metric = name, %error, "Metric registration skipped");
    }
}

/// Initialize metrics registry.
///
/// Safe to call more than once; duplicates are skipped with a warning.
pub fn init_metrics() {
    register("http_requests_total", Box::new(HTTP_REQUESTS_TOTAL.clone()));
    register(
        "http_request_duration_seconds",
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
    );
    register(
        "enrollment_transitions_total",
        Box::new(ENROLLMENT_TRANSITIONS_TOTAL.clone()),
    );
    register("uploads_total", Box::new(UPLOADS_TOTAL.clone()));
    register("upload_bytes_total", Box::new(UPLOAD_BYTES_TOTAL.clone()));
    register(
        "signed_url_failures_total",
        Box::new(SIGNED_URL_FAILURES_TOTAL.clone()),
    );
    register("notifications_total", Box::new(NOTIFICATIONS_TOTAL.clone()));
    register(
        "notifications_active",
        Box::new(NOTIFICATIONS_ACTIVE.clone()),
    );
    register("video_jobs_total", Box::new(VIDEO_JOBS_TOTAL.clone()));
    register("errors_total", Box::new(ERRORS_TOTAL.clone()));

    tracing::info!("Metrics registry initialized");
}
