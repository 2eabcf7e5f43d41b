//! Authentication Module
//! Mission: Password credentials, access/refresh tokens and webhook API keys

pub mod api;
pub mod api_key;
pub mod error;
pub mod facade;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod refresh;

pub use api_key::ApiKeyVerifier;
pub use error::AuthError;
pub use facade::AuthFacade;
pub use jwt::{AccessTokenCodec, AccessTokenPolicy};
pub use middleware::AuthenticatedUser;
pub use password::PasswordCredential;
pub use refresh::RefreshTokenStore;
