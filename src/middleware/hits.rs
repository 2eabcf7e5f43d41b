//! File-server hit counter.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Count every request that reaches the wrapped service.
pub async fn count_hits(
    State(hits): State<Arc<AtomicU64>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    hits.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}
