//! Metrics definitions for the Huddle service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `huddle_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: standard HTTP methods, anything else is `OTHER`
//! - `endpoint`: parameterized paths only (room ids and participant ids are
//!   never used as label values)
//! - `status`: success, error, timeout, or a bounded error type
//! - `kind`: whip, whep
//! - `operation`: bounded by code (create_room, add_participant, ...)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by the
/// `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("huddle_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("huddle_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        // SDP negotiation through the media server can take a while when it
        // gathers candidates before answering
        .set_buckets_for_metric(
            Matcher::Prefix("huddle_gateway_forward".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set gateway forward buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `huddle_http_requests_total`, `huddle_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_method = normalize_method(method);
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("huddle_http_request_duration_seconds",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("huddle_http_requests_total",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Map a request method to a bounded label.
///
/// `/whip` and `/whep` accept any method, including extension methods.
fn normalize_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PATCH" => "PATCH",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=399 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize a request path to a bounded endpoint label.
///
/// Room ids and participant ids are replaced with placeholders. Everything
/// else, including UI asset paths served by the SPA fallback, is `/other`.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => return "/health",
        "/ready" => return "/ready",
        "/metrics" => return "/metrics",
        "/room" | "/room/" => return "/room",
        _ => {}
    }

    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("room"), Some(id), None) if !id.is_empty() => "/room/{room_id}",
        (Some("whip"), Some(id), None) if !id.is_empty() => "/whip/{participant_id}",
        (Some("whep"), Some(id), None) if !id.is_empty() => "/whep/{participant_id}",
        _ => "/other",
    }
}

// ============================================================================
// Room Metrics
// ============================================================================

/// Record a successfully created room.
///
/// Metric: `huddle_rooms_created_total`
pub fn record_room_created() {
    counter!("huddle_rooms_created_total").increment(1);
}

/// Record a join attempt.
///
/// Metric: `huddle_room_joins_total`
/// Labels: `status` (success or a bounded error type)
pub fn record_room_join(status: &'static str) {
    counter!("huddle_room_joins_total", "status" => status).increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `huddle_db_query_duration_seconds`, `huddle_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("huddle_db_query_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("huddle_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// Gateway Metrics
// ============================================================================

/// Record one forward to the upstream media server.
///
/// Metric: `huddle_gateway_forward_duration_seconds`, `huddle_gateway_forwards_total`
/// Labels: `kind` (whip/whep), `status` (success = upstream answered, error = transport failure)
pub fn record_gateway_forward(kind: &'static str, status: &'static str, duration: Duration) {
    histogram!("huddle_gateway_forward_duration_seconds",
        "kind" => kind
    )
    .record(duration.as_secs_f64());

    counter!("huddle_gateway_forwards_total",
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}
