//! Refresh Token Store
//! Mission: Mint opaque long-lived tokens and track their lifecycle

use crate::auth::models::{Identity, InvalidReason, RefreshTokenRecord};
use crate::db::{RefreshTokenRepository, StoreError};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tracing::{debug, info};

/// Random bytes per token; hex doubles it to 64 characters.
pub const TOKEN_BYTES: usize = 32;

/// Policy default lifetime.
pub fn default_ttl() -> Duration {
    Duration::days(60)
}

/// 256 bits from the OS CSPRNG, hex-encoded.
pub fn generate_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Log-safe prefix of a token value.
pub(crate) fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

/// Result of looking up a presented refresh token that exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Valid { subject: Identity },
    Invalid { subject: Identity, reason: InvalidReason },
}

/// Refresh token lifecycle over a persistence collaborator
#[derive(Clone)]
pub struct RefreshTokenStore {
    repo: Arc<dyn RefreshTokenRepository>,
}

impl RefreshTokenStore {
    pub fn new(repo: Arc<dyn RefreshTokenRepository>) -> Self {
        Self { repo }
    }

    /// Generate a token and persist it for `subject`.
    ///
    /// No retry on collision; the repository's unique constraint rejects a
    /// duplicate with `StoreError::Conflict`.
    pub fn issue_for(
        &self,
        subject: Identity,
        ttl: Duration,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let token = generate_token()
            .map_err(|e| StoreError::Upstream(format!("entropy source failed: {e}")))?;
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| StoreError::Upstream(format!("refresh ttl out of range: {ttl}")))?;

        let record = RefreshTokenRecord {
            token,
            user_id: subject,
            issued_at: now,
            expires_at,
            revoked_at: None,
        };

        let record = self.repo.create_refresh_token(&record)?;
        info!(
            user_id = %subject,
            token = token_prefix(&record.token),
            expires_at = %record.expires_at,
            "Refresh token issued"
        );
        Ok(record)
    }

    /// Look up a token. `NotFound` when it was never issued; otherwise the
    /// row's subject together with whether it still grants access.
    pub fn resolve(&self, token: &str) -> Result<Resolution, StoreError> {
        let record = self.repo.get_refresh_token(token)?;

        let resolution = match record.invalid_reason(Utc::now()) {
            None => Resolution::Valid {
                subject: record.user_id,
            },
            Some(reason) => Resolution::Invalid {
                subject: record.user_id,
                reason,
            },
        };

        debug!(
            token = token_prefix(token),
            resolution = ?resolution,
            "Refresh token resolved"
        );
        Ok(resolution)
    }

    /// Mark a token revoked. Unknown or already-revoked tokens are a no-op.
    pub fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.repo.revoke_refresh_token(token, Utc::now())?;
        info!(token = token_prefix(token), "Refresh token revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountRepository, SqliteStore};
    use std::collections::HashSet;

    fn store_with_user() -> (RefreshTokenStore, Identity) {
        let db = Arc::new(SqliteStore::in_memory().unwrap());
        let user = db.create_account("u1@example.com", "hash").unwrap();
        (RefreshTokenStore::new(db), user.id)
    }

    #[test]
    fn test_generate_is_64_hex_chars() {
        let token = generate_token().unwrap();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_is_unique() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_token().unwrap()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn test_issue_then_resolve_valid() {
        let (store, user) = store_with_user();
        let record = store.issue_for(user, default_ttl()).unwrap();

        assert_eq!(record.user_id, user);
        assert_eq!(record.expires_at - record.issued_at, Duration::days(60));
        assert!(record.revoked_at.is_none());

        let resolution = store.resolve(&record.token).unwrap();
        assert_eq!(resolution, Resolution::Valid { subject: user });
    }

    #[test]
    fn test_resolve_unknown_is_not_found() {
        let (store, _) = store_with_user();
        let unknown = generate_token().unwrap();
        assert_eq!(store.resolve(&unknown), Err(StoreError::NotFound));
    }

    #[test]
    fn test_revoked_token_is_invalid() {
        let (store, user) = store_with_user();
        let record = store.issue_for(user, default_ttl()).unwrap();

        store.revoke(&record.token).unwrap();

        let resolution = store.resolve(&record.token).unwrap();
        assert_eq!(
            resolution,
            Resolution::Invalid {
                subject: user,
                reason: InvalidReason::Revoked
            }
        );
    }

    #[test]
    fn test_expired_unrevoked_token_is_invalid() {
        let (store, user) = store_with_user();
        let record = store.issue_for(user, Duration::seconds(-1)).unwrap();

        let resolution = store.resolve(&record.token).unwrap();
        assert_eq!(
            resolution,
            Resolution::Invalid {
                subject: user,
                reason: InvalidReason::Expired
            }
        );
    }

    #[test]
    fn test_unrepresentable_ttl_is_an_error() {
        let (store, user) = store_with_user();
        assert!(matches!(
            store.issue_for(user, Duration::days(100_000_000)),
            Err(StoreError::Upstream(_))
        ));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let (store, user) = store_with_user();
        let record = store.issue_for(user, default_ttl()).unwrap();

        store.revoke(&record.token).unwrap();
        store.revoke(&record.token).unwrap();
        store.revoke("never-issued").unwrap();
    }

    #[test]
    fn test_resolve_does_not_consume_token() {
        let (store, user) = store_with_user();
        let record = store.issue_for(user, default_ttl()).unwrap();

        for _ in 0..3 {
            assert!(matches!(
                store.resolve(&record.token),
                Ok(Resolution::Valid { .. })
            ));
        }
    }

    #[test]
    fn test_token_prefix_short_input() {
        assert_eq!(token_prefix("abc"), "abc");
        assert_eq!(token_prefix(&"f".repeat(64)), "ffffffff");
    }
}
