//! Authentication Extractor
//! Mission: Protect API endpoints with bearer access-token validation

use crate::api::error::ApiError;
use crate::auth::{facade::AuthFacade, models::Identity};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

/// Identity proven by a valid `Authorization: Bearer <jwt>` header.
///
/// Taking this as a handler argument makes the route protected; a missing,
/// malformed, mis-signed or expired token rejects the request with 401
/// before the handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AuthFacade: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(*user);
        }

        let auth = AuthFacade::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        let user = AuthenticatedUser(auth.authenticate(header)?);

        // Cache for any later extractor on the same request
        parts.extensions.insert(user);
        Ok(user)
    }
}
