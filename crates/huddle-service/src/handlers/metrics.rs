//! Prometheus metrics endpoint handler.
//!
//! The endpoint is unauthenticated. Metric labels never carry room or
//! participant identifiers.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns the Prometheus text exposition format:
/// ```text
/// # TYPE huddle_rooms_created_total counter
/// huddle_rooms_created_total 3
/// ```
#[tracing::instrument(skip_all, name = "huddle.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
