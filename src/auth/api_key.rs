//! Credential Header Parsing and API Key Verification
//! Mission: Pull scheme-prefixed credentials out of headers and check the webhook key

use crate::auth::error::HeaderError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

type HmacSha256 = Hmac<Sha256>;

const COMPARE_LABEL: &[u8] = b"chirpy/api-key-compare";

/// Extract the credential following `scheme` in an `Authorization` value.
///
/// The scheme is matched case-sensitively and must be followed by
/// whitespace; surrounding whitespace is dropped. An absent header, an empty
/// credential or a different scheme all yield `MissingCredential`.
pub fn extract_credential(header: Option<&str>, scheme: &str) -> Result<String, HeaderError> {
    let value = header.map(str::trim).unwrap_or_default();
    let rest = value
        .strip_prefix(scheme)
        .ok_or(HeaderError::MissingCredential)?;

    if !rest.starts_with(char::is_whitespace) {
        return Err(HeaderError::MissingCredential);
    }

    let credential = rest.trim();
    if credential.is_empty() {
        return Err(HeaderError::MissingCredential);
    }
    Ok(credential.to_string())
}

pub fn extract_bearer(header: Option<&str>) -> Result<String, HeaderError> {
    extract_credential(header, BEARER_SCHEME)
}

pub fn extract_key(header: Option<&str>) -> Result<String, HeaderError> {
    extract_credential(header, API_KEY_SCHEME)
}

fn compare_tag(value: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(COMPARE_LABEL).ok()?;
    mac.update(value.as_bytes());
    Some(mac)
}

/// Exact match of a presented key against the configured one.
///
/// Both sides go through HMAC-SHA256 first and the tags are compared in
/// constant time, so neither content nor length leaks through timing. An
/// empty configured key never matches.
pub fn verify(presented: &str, configured: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    let (Some(expected), Some(actual)) = (compare_tag(configured), compare_tag(presented)) else {
        return false;
    };
    actual.verify_slice(&expected.finalize().into_bytes()).is_ok()
}

/// Webhook API key checker bound to the configured key
#[derive(Clone)]
pub struct ApiKeyVerifier {
    configured: String,
}

impl ApiKeyVerifier {
    pub fn new(configured: impl Into<String>) -> Self {
        Self {
            configured: configured.into(),
        }
    }

    /// Parse the header and compare; any failure is a plain rejection.
    pub fn authorize(&self, header: Option<&str>) -> Result<(), HeaderError> {
        let presented = extract_key(header)?;
        if verify(&presented, &self.configured) {
            Ok(())
        } else {
            Err(HeaderError::MissingCredential)
        }
    }
}

impl std::fmt::Debug for ApiKeyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyVerifier")
            .field("configured", &"<redacted>")
            .finish()
    }
}
