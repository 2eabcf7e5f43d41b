//! HTTP error responses

use crate::auth::error::{AccountError, AuthError};
use crate::db::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

/// API errors
#[derive(Debug)]
pub enum ApiError {
    /// Any credential or token rejection. The kind is logged, never returned.
    Unauthorized(AuthError),
    IncorrectLogin,
    Forbidden(&'static str),
    NotFound(&'static str),
    BadRequest(&'static str),
    Conflict(&'static str),
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UpstreamFailure(detail) => ApiError::Internal(detail),
            other => ApiError::Unauthorized(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Not found"),
            StoreError::Conflict => ApiError::Conflict("Already exists"),
            StoreError::Upstream(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Password(e) => ApiError::Internal(e.to_string()),
            AccountError::Store(e) => e.into(),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(kind) => {
                debug!(reason = ?kind, "Unauthorized");
                (StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            ApiError::IncorrectLogin => (StatusCode::UNAUTHORIZED, "Incorrect email or password"),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Run synchronous work (argon2, SQLite) off the async workers.
pub async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
