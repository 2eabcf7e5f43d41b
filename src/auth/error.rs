//! Authentication Errors
//! Mission: Give callers a tagged outcome to branch on instead of error text

use crate::db::StoreError;
use thiserror::Error;

/// Failure of the password hashing primitive itself.
///
/// A wrong password is not an error; `verify` returns `Ok(false)` for that.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    HashingFailure(String),
}

/// Access token validation failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("token is expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
}

/// Problems reading a scheme-prefixed credential header.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("credential header missing or empty")]
    MissingCredential,
}

/// Outcome taxonomy surfaced by the auth facade.
///
/// Every credential problem collapses into one of the first three variants so
/// the HTTP layer can answer "unauthorized" without revealing which check
/// failed. `UpstreamFailure` is the only variant that maps to a server error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential invalid")]
    CredentialInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("token malformed")]
    TokenMalformed,
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
}

/// Failures while creating or editing an account.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => AuthError::CredentialInvalid,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed => AuthError::TokenMalformed,
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::UpstreamFailure(err.to_string())
    }
}

impl From<HeaderError> for AuthError {
    fn from(_: HeaderError) -> Self {
        AuthError::CredentialInvalid
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::CredentialInvalid,
            other => AuthError::UpstreamFailure(other.to_string()),
        }
    }
}
