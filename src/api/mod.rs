//! HTTP API
//! Mission: Wire the auth subsystem, chirps and webhooks into one axum router

pub mod admin;
pub mod chirps;
pub mod error;
pub mod extract;
pub mod webhooks;

use crate::auth::{
    self, AccessTokenCodec, ApiKeyVerifier, AuthFacade, PasswordCredential, RefreshTokenStore,
};
use crate::config::{Config, Platform};
use crate::db::SqliteStore;
use crate::middleware::{count_hits, request_logging_simple};
use anyhow::{Context, Result};
use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::{atomic::AtomicU64, Arc};
use tower_http::{cors::CorsLayer, services::ServeDir};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthFacade,
    pub store: Arc<SqliteStore>,
    pub polka: ApiKeyVerifier,
    pub hits: Arc<AtomicU64>,
    pub platform: Platform,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<SqliteStore>) -> Result<Self> {
        let passwords = PasswordCredential::new().context("Invalid argon2 parameters")?;
        Ok(Self::with_passwords(config, store, passwords))
    }

    /// Same as `new` with an explicit password hasher.
    pub fn with_passwords(
        config: &Config,
        store: Arc<SqliteStore>,
        passwords: PasswordCredential,
    ) -> Self {
        let codec = Arc::new(AccessTokenCodec::new(
            config.jwt_secret.as_bytes(),
            config.access_token,
        ));
        let auth = AuthFacade::new(
            passwords,
            codec,
            RefreshTokenStore::new(store.clone()),
            store.clone(),
            config.refresh_token_ttl,
        );

        Self {
            auth,
            store,
            polka: ApiKeyVerifier::new(config.polka_key.clone()),
            hits: Arc::new(AtomicU64::new(0)),
            platform: config.platform,
        }
    }
}

impl FromRef<AppState> for AuthFacade {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Build the full application router.
pub fn router(state: AppState, filepath_root: &Path) -> Router {
    let fileserver = Router::new()
        .nest_service("/app", ServeDir::new(filepath_root))
        .layer(middleware::from_fn_with_state(state.hits.clone(), count_hits));

    let api = Router::new()
        .route("/api/healthz", get(admin::healthz))
        .route(
            "/api/users",
            post(auth::api::create_user).put(auth::api::update_user),
        )
        .route("/api/login", post(auth::api::login))
        .route("/api/refresh", post(auth::api::refresh))
        .route("/api/revoke", post(auth::api::revoke))
        .route(
            "/api/chirps",
            post(chirps::create_chirp).get(chirps::list_chirps),
        )
        .route(
            "/api/chirps/:chirp_id",
            get(chirps::get_chirp).delete(chirps::delete_chirp),
        )
        .route("/api/polka/webhooks", post(webhooks::polka_webhook))
        .route("/admin/metrics", get(admin::metrics))
        .route("/admin/reset", post(admin::reset))
        .with_state(state);

    Router::new()
        .merge(api)
        .merge(fileserver)
        .layer(middleware::from_fn(request_logging_simple))
        .layer(CorsLayer::permissive())
}
