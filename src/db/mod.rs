//! Persistence Layer
//! Mission: Black-box CRUD for accounts, refresh tokens and chirps

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::auth::models::{Identity, RefreshTokenRecord, User};
use crate::models::{Chirp, SortOrder};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Persistence failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("storage failure: {0}")]
    Upstream(String),
}

/// Account records keyed by id and email.
pub trait AccountRepository: Send + Sync {
    /// `Conflict` when the email is taken.
    fn create_account(&self, email: &str, hashed_password: &str) -> Result<User, StoreError>;

    fn get_account_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Replaces email and password hash wholesale.
    fn update_account(
        &self,
        id: Identity,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError>;

    /// Marks the account as a paid member.
    fn upgrade_account(&self, id: Identity) -> Result<User, StoreError>;
}

/// Refresh token rows keyed by token value.
pub trait RefreshTokenRepository: Send + Sync {
    /// `Conflict` when the token value already exists.
    fn create_refresh_token(
        &self,
        record: &RefreshTokenRecord,
    ) -> Result<RefreshTokenRecord, StoreError>;

    fn get_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError>;

    /// Sets `revoked_at` if unset. Absent tokens are not an error.
    fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Chirp rows.
pub trait ChirpRepository: Send + Sync {
    fn create_chirp(&self, user_id: Identity, body: &str) -> Result<Chirp, StoreError>;

    fn list_chirps(
        &self,
        author: Option<Identity>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError>;

    fn get_chirp(&self, id: uuid::Uuid) -> Result<Chirp, StoreError>;

    fn delete_chirp(&self, id: uuid::Uuid) -> Result<(), StoreError>;
}
