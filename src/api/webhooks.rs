//! Polka webhooks
//! Mission: Upgrade accounts to Chirpy Red when the payment provider says so

use crate::api::{
    error::{blocking, ApiError},
    AppState,
};
use crate::auth::error::AuthError;
use crate::db::{AccountRepository, StoreError};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

pub const USER_UPGRADED: &str = "user.upgraded";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub user_id: String,
}

/// POST /api/polka/webhooks
///
/// Authenticated with `Authorization: ApiKey <key>`. Events other than
/// `user.upgraded` are acknowledged and ignored. The body is only parsed
/// once the key checks out.
pub async fn polka_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    state.polka.authorize(header).map_err(AuthError::from)?;

    let payload: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "Rejected webhook body");
        ApiError::BadRequest("Invalid request body")
    })?;

    if payload.event != USER_UPGRADED {
        debug!(event = %payload.event, "Ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = Uuid::parse_str(payload.data.user_id.trim())
        .map_err(|_| ApiError::BadRequest("Invalid user_id"))?;

    let store = state.store.clone();
    blocking(move || match store.upgrade_account(user_id) {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound) => Err(ApiError::NotFound("User not found")),
        Err(e) => Err(e.into()),
    })
    .await?;

    info!(user_id = %user_id, "Account upgraded to Chirpy Red");
    Ok(StatusCode::NO_CONTENT)
}
