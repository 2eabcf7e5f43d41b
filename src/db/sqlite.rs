//! SQLite Storage
//! Mission: Persist accounts, refresh tokens and chirps in one SQLite file

use crate::auth::models::{Identity, RefreshTokenRecord, User};
use crate::db::{AccountRepository, ChirpRepository, RefreshTokenRepository, StoreError};
use crate::models::{Chirp, SortOrder};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict
            }
            other => StoreError::Upstream(other.to_string()),
        }
    }
}

const USER_COLUMNS: &str = "id, email, hashed_password, is_chirpy_red, created_at, updated_at";
const CHIRP_COLUMNS: &str = "id, created_at, updated_at, body, user_id";

/// SQLite-backed store. One connection, serialized behind a mutex.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and initialize the schema.
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                hashed_password TEXT NOT NULL,
                is_chirpy_red INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS refresh_tokens (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                revoked_at TEXT,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chirps (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                body TEXT NOT NULL,
                user_id TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chirps_user_created ON chirps(user_id, created_at)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Delete every user, chirp and refresh token.
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM refresh_tokens", [])?;
        tx.execute("DELETE FROM chirps", [])?;
        let users = tx.execute("DELETE FROM users", [])?;
        tx.commit()?;

        warn!("Database reset: {} users removed", users);
        Ok(())
    }
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        is_chirpy_red: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn chirp_from_row(row: &Row<'_>) -> rusqlite::Result<Chirp> {
    Ok(Chirp {
        id: uuid_at(row, 0)?,
        created_at: row.get(1)?,
        updated_at: row.get(2)?,
        body: row.get(3)?,
        user_id: uuid_at(row, 4)?,
    })
}

impl AccountRepository for SqliteStore {
    fn create_account(&self, email: &str, hashed_password: &str) -> Result<User, StoreError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, email, hashed_password, is_chirpy_red, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.email,
                user.hashed_password,
                user.is_chirpy_red,
                user.created_at,
                user.updated_at,
            ],
        )?;

        info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    fn get_account_by_email(&self, email: &str) -> Result<User, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;
        Ok(stmt.query_row(params![email], user_from_row)?)
    }

    fn update_account(
        &self,
        id: Identity,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "UPDATE users SET email = ?2, hashed_password = ?3, updated_at = ?4
             WHERE id = ?1 RETURNING {USER_COLUMNS}"
        ))?;
        let user = stmt.query_row(
            params![id.to_string(), email, hashed_password, Utc::now()],
            user_from_row,
        )?;

        info!(user_id = %user.id, "Updated user");
        Ok(user)
    }

    fn upgrade_account(&self, id: Identity) -> Result<User, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "UPDATE users SET is_chirpy_red = 1, updated_at = ?2
             WHERE id = ?1 RETURNING {USER_COLUMNS}"
        ))?;
        let user = stmt.query_row(params![id.to_string(), Utc::now()], user_from_row)?;

        info!(user_id = %user.id, "Upgraded user to Chirpy Red");
        Ok(user)
    }
}

impl RefreshTokenRepository for SqliteStore {
    fn create_refresh_token(
        &self,
        record: &RefreshTokenRecord,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO refresh_tokens (token, user_id, created_at, updated_at, expires_at, revoked_at)
             VALUES (?1, ?2, ?3, ?3, ?4, ?5)",
            params![
                record.token,
                record.user_id.to_string(),
                record.issued_at,
                record.expires_at,
                record.revoked_at,
            ],
        )?;
        Ok(record.clone())
    }

    fn get_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT token, user_id, created_at, expires_at, revoked_at
             FROM refresh_tokens WHERE token = ?1",
        )?;
        let record = stmt.query_row(params![token], |row| {
            Ok(RefreshTokenRecord {
                token: row.get(0)?,
                user_id: uuid_at(row, 1)?,
                issued_at: row.get(2)?,
                expires_at: row.get(3)?,
                revoked_at: row.get::<_, Option<DateTime<Utc>>>(4)?,
            })
        })?;
        Ok(record)
    }

    fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE refresh_tokens SET revoked_at = ?2, updated_at = ?2
             WHERE token = ?1 AND revoked_at IS NULL",
            params![token, at],
        )?;
        Ok(())
    }
}

impl ChirpRepository for SqliteStore {
    fn create_chirp(&self, user_id: Identity, body: &str) -> Result<Chirp, StoreError> {
        let now = Utc::now();
        let chirp = Chirp {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.to_string(),
            user_id,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chirps (id, created_at, updated_at, body, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chirp.id.to_string(),
                chirp.created_at,
                chirp.updated_at,
                chirp.body,
                chirp.user_id.to_string(),
            ],
        )?;
        Ok(chirp)
    }

    fn list_chirps(
        &self,
        author: Option<Identity>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, StoreError> {
        let dir = order.as_sql();
        let conn = self.conn.lock();

        let chirps = match author {
            Some(author) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {CHIRP_COLUMNS} FROM chirps WHERE user_id = ?1
                     ORDER BY created_at {dir}, rowid {dir}"
                ))?;
                let rows = stmt.query_map(params![author.to_string()], chirp_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {CHIRP_COLUMNS} FROM chirps ORDER BY created_at {dir}, rowid {dir}"
                ))?;
                let rows = stmt.query_map([], chirp_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(chirps)
    }

    fn get_chirp(&self, id: Uuid) -> Result<Chirp, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached(&format!("SELECT {CHIRP_COLUMNS} FROM chirps WHERE id = ?1"))?;
        stmt.query_row(params![id.to_string()], chirp_from_row)
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    fn delete_chirp(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM chirps WHERE id = ?1", params![id.to_string()])?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
