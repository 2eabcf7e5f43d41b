//! Admin and health endpoints

use crate::api::{
    error::{blocking, ApiError},
    AppState,
};
use crate::config::Platform;
use axum::{extract::State, http::StatusCode, response::Html};
use std::sync::atomic::Ordering;
use tracing::{info, warn};

/// GET /api/healthz
pub async fn healthz() -> &'static str {
    "OK"
}

/// GET /admin/metrics
pub async fn metrics(State(state): State<AppState>) -> Html<String> {
    let hits = state.hits.load(Ordering::Relaxed);
    Html(format!(
        "<html>\n  <body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {hits} times!</p>\n  </body>\n</html>"
    ))
}

/// POST /admin/reset
///
/// Development only. Zeroes the hit counter and deletes every user, chirp
/// and refresh token.
pub async fn reset(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    if state.platform != Platform::Dev {
        warn!("Reset attempted outside dev platform");
        return Err(ApiError::Forbidden("Access denied"));
    }

    state.hits.store(0, Ordering::Relaxed);
    let store = state.store.clone();
    blocking(move || Ok(store.reset()?)).await?;

    info!("Database reset");
    Ok(StatusCode::OK)
}
