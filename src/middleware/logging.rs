//! Request logging middleware.
//!
//! One `http_request` span per request; handler logs nest under it.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Path polled by load balancers; not worth a log line per probe.
const HEALTH_PATH: &str = "/api/healthz";

/// `2xx`, `4xx` and so on, for grouping in log queries.
fn status_class(status: u16) -> &'static str {
    match status / 100 {
        1 => "1xx",
        2 => "2xx",
        3 => "3xx",
        4 => "4xx",
        _ => "5xx",
    }
}

/// Only method and path are recorded. Headers (and so bearer tokens and API
/// keys) never reach the log. Rejected credentials (401/403) log at DEBUG
/// since the handler already logged the reason.
pub async fn request_logging_simple(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if path == HEALTH_PATH {
        return next.run(request).await;
    }

    let span = info_span!("http_request", method = %method, path = %path);
    let start = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let latency_ms = start.elapsed().as_millis();

    let status = response.status().as_u16();
    let class = status_class(status);

    span.in_scope(|| match status {
        500.. => warn!(status, class, latency_ms, "Request failed"),
        401 | 403 => debug!(status, class, latency_ms, "Request denied"),
        _ => info!(status, class, latency_ms, "Request completed"),
    });

    response
}
