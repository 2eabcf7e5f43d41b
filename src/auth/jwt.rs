//! JWT Token Handler
//! Mission: Sign and verify short-lived HS256 access tokens

use crate::auth::error::TokenError;
use crate::auth::models::{Claims, Identity};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;
use uuid::Uuid;

/// Fixed `iss` claim for every token this service mints.
pub const ISSUER: &str = "chirpy";

/// Lifetime policy for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessTokenPolicy {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
}

impl Default for AccessTokenPolicy {
    fn default() -> Self {
        Self {
            default_ttl: Duration::hours(1),
            max_ttl: Duration::hours(1),
        }
    }
}

impl AccessTokenPolicy {
    /// Resolve a caller-requested TTL against the policy.
    ///
    /// Absent or non-positive requests get the default; anything above the
    /// ceiling is clamped down to it.
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(ttl) if ttl > Duration::zero() => ttl.min(self.max_ttl),
            _ => self.default_ttl,
        }
    }

    /// Turn a client-supplied lifetime in seconds into a requested TTL.
    ///
    /// Clamped as an integer first so any `i64` is representable; negative
    /// values become zero and so fall back to the default.
    pub fn ttl_from_secs(&self, secs: i64) -> Duration {
        Duration::seconds(secs.clamp(0, self.max_ttl.num_seconds()))
    }
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn ttl(&self) -> Duration {
        self.expires_at - self.issued_at
    }
}

/// JWT codec bound to one shared secret and one lifetime policy
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    policy: AccessTokenPolicy,
}

impl AccessTokenCodec {
    pub fn new(secret: &[u8], policy: AccessTokenPolicy) -> Self {
        // Only HS256 is accepted; `exp` is checked by hand so the boundary is
        // `exp <= now` with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            policy,
        }
    }

    pub fn policy(&self) -> AccessTokenPolicy {
        self.policy
    }

    /// Sign a token for `subject`, valid from now.
    pub fn issue(&self, subject: Identity, ttl: Option<Duration>) -> Result<AccessToken> {
        self.issue_at(subject, Utc::now(), ttl)
    }

    /// Sign a token with an explicit issue time.
    pub fn issue_at(
        &self,
        subject: Identity,
        issued_at: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> Result<AccessToken> {
        let ttl = self.policy.effective_ttl(ttl);
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .context("Invalid timestamp")?;

        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        debug!(
            user_id = %subject,
            ttl_secs = ttl.num_seconds(),
            "Generating access token"
        );

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .context("Failed to sign access token")?;

        Ok(AccessToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Verify a token and return its subject.
    pub fn validate(&self, token: &str) -> Result<Identity, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Verify a token against an explicit clock reading.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            },
        )?;

        let claims = decoded.claims;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Malformed)
    }
}
