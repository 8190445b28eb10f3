//! HTTP metrics middleware.
//!
//! Applied as the outermost layer so that responses produced before a
//! handler runs (404, 405, 413 from the body limit, 408 from the timeout
//! layer) are counted too.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Records method, normalized path, status code, and duration of every
/// request.
///
/// For forwarded WHIP/WHEP requests the duration ends when the upstream
/// response headers arrive; the streamed body is not included.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}
