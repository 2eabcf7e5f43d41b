//! Auth Facade
//! Mission: Answer login, bearer, refresh and revoke questions for the HTTP layer

use crate::auth::api_key::extract_bearer;
use crate::auth::error::{AccountError, AuthError};
use crate::auth::jwt::{AccessToken, AccessTokenCodec};
use crate::auth::models::{Identity, RefreshTokenRecord, User};
use crate::auth::password::PasswordCredential;
use crate::auth::refresh::{token_prefix, RefreshTokenStore, Resolution};
use crate::db::{AccountRepository, StoreError};
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a successful login hands back.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub user: User,
    pub access: AccessToken,
    pub refresh: RefreshTokenRecord,
}

/// Orchestrates the credential components. Holds no per-request state.
#[derive(Clone)]
pub struct AuthFacade {
    passwords: PasswordCredential,
    codec: Arc<AccessTokenCodec>,
    refresh_tokens: RefreshTokenStore,
    accounts: Arc<dyn AccountRepository>,
    refresh_ttl: Duration,
}

impl AuthFacade {
    pub fn new(
        passwords: PasswordCredential,
        codec: Arc<AccessTokenCodec>,
        refresh_tokens: RefreshTokenStore,
        accounts: Arc<dyn AccountRepository>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            passwords,
            codec,
            refresh_tokens,
            accounts,
            refresh_ttl,
        }
    }

    pub fn codec(&self) -> &AccessTokenCodec {
        &self.codec
    }

    /// Create an account. A taken email comes back as `StoreError::Conflict`.
    pub fn register(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let hash = self.passwords.hash(password)?;
        let user = self.accounts.create_account(email, &hash)?;
        info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Replace the email and password of an authenticated account.
    pub fn update_credentials(
        &self,
        id: Identity,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        let hash = self.passwords.hash(password)?;
        let user = self.accounts.update_account(id, email, &hash)?;
        info!(user_id = %user.id, "Account credentials updated");
        Ok(user)
    }

    /// Check email + password and mint an access/refresh token pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        ttl_override: Option<Duration>,
    ) -> Result<LoginGrant, AuthError> {
        let user = match self.accounts.get_account_by_email(email) {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                warn!(email, reason = "unknown_email", "Login rejected");
                return Err(AuthError::CredentialInvalid);
            }
            Err(e) => return Err(e.into()),
        };

        if !self.passwords.verify(password, &user.hashed_password)? {
            warn!(user_id = %user.id, reason = "wrong_password", "Login rejected");
            return Err(AuthError::CredentialInvalid);
        }

        let access = self
            .codec
            .issue(user.id, ttl_override)
            .map_err(|e| AuthError::UpstreamFailure(e.to_string()))?;
        let refresh = self.refresh_tokens.issue_for(user.id, self.refresh_ttl)?;

        info!(user_id = %user.id, "Login successful");
        Ok(LoginGrant {
            user,
            access,
            refresh,
        })
    }

    /// Validate a bearer access token taken from an `Authorization` header.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let token = extract_bearer(header)?;
        self.validate_access(&token)
    }

    pub fn validate_access(&self, token: &str) -> Result<Identity, AuthError> {
        self.codec.validate(token).map_err(|e| {
            debug!(reason = ?e, "Access token rejected");
            AuthError::from(e)
        })
    }

    /// Mint a new access token from a still-valid refresh token.
    ///
    /// The refresh token is not consumed or rotated.
    pub fn refresh(&self, refresh_token: &str) -> Result<AccessToken, AuthError> {
        let subject = match self.refresh_tokens.resolve(refresh_token) {
            Ok(Resolution::Valid { subject }) => subject,
            Ok(Resolution::Invalid { subject, reason }) => {
                warn!(
                    user_id = %subject,
                    token = token_prefix(refresh_token),
                    reason = ?reason,
                    "Refresh rejected"
                );
                return Err(AuthError::CredentialInvalid);
            }
            Err(StoreError::NotFound) => {
                warn!(
                    token = token_prefix(refresh_token),
                    reason = "not_found",
                    "Refresh rejected"
                );
                return Err(AuthError::CredentialInvalid);
            }
            Err(e) => return Err(e.into()),
        };

        self.codec
            .issue(subject, None)
            .map_err(|e| AuthError::UpstreamFailure(e.to_string()))
    }

    /// Revoke a refresh token. Always succeeds unless storage fails.
    pub fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        Ok(self.refresh_tokens.revoke(refresh_token)?)
    }
}
