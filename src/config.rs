//! Process configuration
//!
//! Built once at start-up from the environment (after `.env` loading) and
//! passed explicitly to everything that needs it.

use crate::auth::jwt::AccessTokenPolicy;
use anyhow::{bail, Context, Result};
use chrono::Duration;
use std::path::PathBuf;

/// Deployment platform. Only `Dev` exposes destructive admin routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Dev,
    Prod,
}

impl Platform {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("dev") {
            Platform::Dev
        } else {
            Platform::Prod
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_path: String,
    pub bind_addr: String,
    pub platform: Platform,
    pub jwt_secret: String,
    pub polka_key: String,
    pub access_token: AccessTokenPolicy,
    pub refresh_token_ttl: Duration,
    pub filepath_root: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("bind_addr", &self.bind_addr)
            .field("platform", &self.platform)
            .field("jwt_secret", &"<redacted>")
            .field("polka_key", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("filepath_root", &self.filepath_root)
            .finish()
    }
}

/// Longest access token lifetime accepted from configuration (30 days).
const ACCESS_TTL_LIMIT_SECS: i64 = 30 * 24 * 60 * 60;
/// Longest refresh token lifetime accepted from configuration (10 years).
const REFRESH_TTL_LIMIT_DAYS: i64 = 3650;

fn parse_int(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> Result<i64> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Invalid {key}: {raw}")),
        None => Ok(default),
    }
}

fn access_ttl(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Duration> {
    let secs = parse_int(lookup, key, 3600)?;
    if !(1..=ACCESS_TTL_LIMIT_SECS).contains(&secs) {
        bail!("{key} must be between 1 and {ACCESS_TTL_LIMIT_SECS}, got {secs}");
    }
    Duration::try_seconds(secs).with_context(|| format!("{key} out of range"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = lookup("DB_PATH").unwrap_or_else(|| "chirpy.db".to_string());
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let platform = Platform::parse(&lookup("PLATFORM").unwrap_or_default());

        let jwt_secret = lookup("SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() {
            bail!("SECRET must be set");
        }
        let polka_key = lookup("POLKA_KEY").unwrap_or_default();
        if polka_key.trim().is_empty() {
            bail!("POLKA_KEY must be set");
        }

        let default_ttl = access_ttl(&lookup, "ACCESS_TOKEN_TTL_SECS")?;
        let max_ttl = access_ttl(&lookup, "ACCESS_TOKEN_MAX_TTL_SECS")?;
        if default_ttl > max_ttl {
            bail!(
                "ACCESS_TOKEN_TTL_SECS ({}) exceeds ACCESS_TOKEN_MAX_TTL_SECS ({})",
                default_ttl.num_seconds(),
                max_ttl.num_seconds()
            );
        }

        let refresh_days = parse_int(&lookup, "REFRESH_TOKEN_TTL_DAYS", 60)?;
        if !(1..=REFRESH_TTL_LIMIT_DAYS).contains(&refresh_days) {
            bail!("REFRESH_TOKEN_TTL_DAYS must be between 1 and {REFRESH_TTL_LIMIT_DAYS}, got {refresh_days}");
        }
        let refresh_token_ttl =
            Duration::try_days(refresh_days).context("REFRESH_TOKEN_TTL_DAYS out of range")?;

        let filepath_root =
            PathBuf::from(lookup("FILEPATH_ROOT").unwrap_or_else(|| ".".to_string()));

        Ok(Self {
            database_path,
            bind_addr,
            platform,
            jwt_secret,
            polka_key,
            access_token: AccessTokenPolicy {
                default_ttl,
                max_ttl,
            },
            refresh_token_ttl,
            filepath_root,
        })
    }
}
