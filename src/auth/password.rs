//! Password Credential
//! Mission: Salted, memory-hard password hashing and verification

use crate::auth::error::PasswordError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Memory cost in KiB (64 MiB).
pub const MEMORY_COST_KIB: u32 = 64 * 1024;
/// Number of passes over memory.
pub const TIME_COST: u32 = 1;
/// Lanes.
pub const PARALLELISM: u32 = 2;
/// Derived key length in bytes.
pub const OUTPUT_LEN: usize = 32;

/// Argon2id hasher with a fixed parameter set.
///
/// The parameter set only affects newly created hashes. Verification always
/// uses the parameters embedded in the stored PHC string, so hashes created
/// under older settings keep verifying after a change.
#[derive(Debug, Clone)]
pub struct PasswordCredential {
    params: Params,
}

impl PasswordCredential {
    pub fn new() -> Result<Self, PasswordError> {
        Self::with_params(MEMORY_COST_KIB, TIME_COST, PARALLELISM)
    }

    pub fn with_params(
        memory_kib: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, time_cost, parallelism, Some(OUTPUT_LEN))
            .map_err(|e| PasswordError::HashingFailure(e.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailure(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored PHC string.
    ///
    /// Returns `Ok(false)` on mismatch; errors only when the stored value
    /// cannot be parsed or the derivation itself fails.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| PasswordError::HashingFailure(format!("malformed stored hash: {e}")))?;

        match self.hasher().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::HashingFailure(e.to_string())),
        }
    }
}
