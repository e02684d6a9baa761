//! Prometheus metrics for the variant search server

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Histogram, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
};

lazy_static! {
    // HTTP

    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "togovar_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "togovar_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");

    pub static ref HTTP_REQUESTS_IN_FLIGHT: IntGaugeVec = register_int_gauge_vec!(
        "togovar_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
        &["method", "path"]
    )
    .expect("Failed to register HTTP_REQUESTS_IN_FLIGHT");

    // Search pipeline

    /// Search requests by [`SearchOutcome`] label.
    pub static ref SEARCH_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "togovar_search_requests_total",
        "Total number of variant search requests by outcome",
        &["outcome"]
    )
    .expect("Failed to register SEARCH_REQUESTS_TOTAL");

    pub static ref BACKEND_REQUEST_DURATION_SECONDS: Histogram = register_histogram!(
        "togovar_backend_request_duration_seconds",
        "Search backend round trip in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register BACKEND_REQUEST_DURATION_SECONDS");

    pub static ref SEARCH_RECORDS_RETURNED: Histogram = register_histogram!(
        "togovar_search_records_returned",
        "Number of records returned per search",
        vec![0.0, 1.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
    )
    .expect("Failed to register SEARCH_RECORDS_RETURNED");

    // Reference data

    pub static ref REGISTRY_RELOADS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "togovar_registry_reloads_total",
        "Reference data reloads by status",
        &["status"]
    )
    .expect("Failed to register REGISTRY_RELOADS_TOTAL");

    pub static ref REGISTRY_LOADED_AT_SECONDS: IntGauge = register_int_gauge!(
        "togovar_registry_loaded_at_seconds",
        "Unix time of the last successful reference data load"
    )
    .expect("Failed to register REGISTRY_LOADED_AT_SECONDS");
}

/// Outcome label of [`SEARCH_REQUESTS_TOTAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Ok,
    Invalid,
    Timeout,
    BackendError,
    InternalError,
}

impl SearchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchOutcome::Ok => "ok",
            SearchOutcome::Invalid => "invalid",
            SearchOutcome::Timeout => "timeout",
            SearchOutcome::BackendError => "backend_error",
            SearchOutcome::InternalError => "internal_error",
        }
    }
}

pub fn record_search(outcome: SearchOutcome) {
    SEARCH_REQUESTS_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
}

/// Collapse unknown paths into one label to bound cardinality.
pub fn sanitize_path(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/search/variant" => "/api/search/variant",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_paths_keep_their_label() {
        assert_eq!(sanitize_path("/api/search/variant"), "/api/search/variant");
        assert_eq!(sanitize_path("/api/search/variant/"), "/api/search/variant");
        assert_eq!(sanitize_path("/health"), "/health");
        assert_eq!(sanitize_path("/variants/tgv123"), "other");
    }

    #[test]
    fn search_outcomes_are_counted_by_label() {
        let before = SEARCH_REQUESTS_TOTAL.with_label_values(&["invalid"]).get();
        record_search(SearchOutcome::Invalid);
        let after = SEARCH_REQUESTS_TOTAL.with_label_values(&["invalid"]).get();
        assert!(after > before);
    }
}
