//! Authentication API Endpoints
//! Mission: Provide signup, login, refresh and revoke endpoints

use crate::api::{
    error::{blocking, ApiError},
    extract::ApiJson,
};
use crate::auth::{
    api_key::extract_bearer,
    error::AuthError,
    facade::AuthFacade,
    middleware::AuthenticatedUser,
    models::{CredentialsRequest, LoginRequest, LoginResponse, TokenResponse, UserResponse},
};
use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Json,
};
use tracing::info;

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())
}

/// Signup endpoint - POST /api/users
pub async fn create_user(
    State(auth): State<AuthFacade>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = blocking(move || {
        auth.register(&payload.email, &payload.password)
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| match e {
        ApiError::Conflict(_) => ApiError::Conflict("Email already registered"),
        other => other,
    })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Credential change endpoint - PUT /api/users
pub async fn update_user(
    State(auth): State<AuthFacade>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = blocking(move || {
        auth.update_credentials(user_id, &payload.email, &payload.password)
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| match e {
        ApiError::Conflict(_) => ApiError::Conflict("Email already registered"),
        other => other,
    })?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// Login endpoint - POST /api/login
pub async fn login(
    State(auth): State<AuthFacade>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let policy = auth.codec().policy();
    let ttl = payload
        .expires_in_seconds
        .map(|secs| policy.ttl_from_secs(secs));

    let grant = blocking(move || {
        auth.login(&payload.email, &payload.password, ttl)
            .map_err(|e| match e {
                AuthError::CredentialInvalid => ApiError::IncorrectLogin,
                other => other.into(),
            })
    })
    .await?;

    Ok(Json(LoginResponse {
        user: UserResponse::from_user(&grant.user),
        token: grant.access.token,
        refresh_token: grant.refresh.token,
    }))
}

/// Refresh endpoint - POST /api/refresh
///
/// Expects `Authorization: Bearer <refresh token>`.
pub async fn refresh(
    State(auth): State<AuthFacade>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = extract_bearer(authorization(&headers)).map_err(AuthError::from)?;

    let access = blocking(move || auth.refresh(&token).map_err(ApiError::from)).await?;

    Ok(Json(TokenResponse {
        token: access.token,
    }))
}

/// Revoke endpoint - POST /api/revoke
pub async fn revoke(
    State(auth): State<AuthFacade>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_bearer(authorization(&headers)).map_err(AuthError::from)?;

    blocking(move || auth.revoke(&token).map_err(ApiError::from)).await?;
    info!("Refresh token revoked");

    Ok(StatusCode::NO_CONTENT)
}
