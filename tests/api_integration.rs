//! Integration tests for the HTTP API
//!
//! Each test builds the full router over an in-memory SQLite store and drives
//! it with `oneshot` requests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chirpy_backend::{
    api::{self, AppState},
    auth::{models::Claims, PasswordCredential},
    config::Config,
    db::SqliteStore,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";
const SECRET: &str = "integration-test-secret";

fn test_app(platform: &str, static_root: &Path) -> Router {
    let config = Config::from_lookup(|key| match key {
        "SECRET" => Some(SECRET.to_string()),
        "POLKA_KEY" => Some(POLKA_KEY.to_string()),
        "PLATFORM" => Some(platform.to_string()),
        _ => None,
    })
    .unwrap();

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let passwords = PasswordCredential::with_params(1024, 1, 1).unwrap();
    api::router(AppState::with_passwords(&config, store, passwords), static_root)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn signup(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

/// Returns `(access token, refresh token)`.
async fn login(app: &Router, email: &str, password: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        body["token"].as_str().unwrap().to_string(),
        body["refresh_token"].as_str().unwrap().to_string(),
    )
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn test_healthz() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());

    let (status, body) = send(&app, Method::GET, "/api/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".into()));
}

#[tokio::test]
async fn test_signup_and_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());

    let user = signup(&app, "lane@example.com", "04234").await;
    assert_eq!(user["email"], "lane@example.com");
    assert_eq!(user["is_chirpy_red"], false);
    assert!(user.get("hashed_password").is_none());
    assert!(user.get("password").is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "lane@example.com", "password": "other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "lane@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "04234" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({
            "email": "lane@example.com",
            "password": "04234",
            "expires_in_seconds": 999_999,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user["id"]);
    assert!(body["token"].as_str().unwrap().split('.').count() == 3);
    assert_eq!(body["refresh_token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_chirp_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());

    let walt = signup(&app, "walt@breakingbad.com", "123456").await;
    signup(&app, "saul@bettercall.com", "123456").await;
    let (walt_token, _) = login(&app, "walt@breakingbad.com", "123456").await;
    let (saul_token, _) = login(&app, "saul@bettercall.com", "123456").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chirps",
        None,
        Some(json!({ "body": "no token" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&walt_token)),
        Some(json!({ "body": "x".repeat(141) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Chirp is too long");

    let (status, first) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&walt_token)),
        Some(json!({ "body": "What a Kerfuffle that was" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["body"], "What a **** that was");
    assert_eq!(first["user_id"], walt["id"]);

    let (_, second) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&saul_token)),
        Some(json!({ "body": "Better call Saul" })),
    )
    .await;

    let (status, all) = send(&app, Method::GET, "/api/chirps", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&Value> = all.as_array().unwrap().iter().map(|c| &c["id"]).collect();
    assert_eq!(ids, vec![&first["id"], &second["id"]]);

    let (_, desc) = send(&app, Method::GET, "/api/chirps?sort=desc", None, None).await;
    assert_eq!(desc[0]["id"], second["id"]);

    let uri = format!("/api/chirps?author_id={}", walt["id"].as_str().unwrap());
    let (_, mine) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/api/chirps?author_id=bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let chirp_uri = format!("/api/chirps/{}", first["id"].as_str().unwrap());
    let (status, fetched) = send(&app, Method::GET, &chirp_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], first["id"]);
    assert_eq!(fetched["body"], first["body"]);

    let (status, _) = send(&app, Method::GET, "/api/chirps/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &chirp_uri, Some(&bearer(&saul_token)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &chirp_uri, Some(&bearer(&walt_token)), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &chirp_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &chirp_uri, Some(&bearer(&walt_token)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_and_revoke() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());

    signup(&app, "lane@example.com", "04234").await;
    let (_, refresh_token) = login(&app, "lane@example.com", "04234").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/refresh",
        Some(&bearer(&refresh_token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&access)),
        Some(json!({ "body": "fresh token works" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // A refresh token is not an access token.
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&refresh_token)),
        Some(json!({ "body": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/api/refresh", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/api/revoke", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/revoke",
        Some(&bearer(&refresh_token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/refresh",
        Some(&bearer(&refresh_token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    // Revoking twice is still a success.
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/revoke",
        Some(&bearer(&refresh_token)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_update_user_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());

    let user = signup(&app, "walt@breakingbad.com", "123456").await;
    let (token, _) = login(&app, "walt@breakingbad.com", "123456").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/users",
        None,
        Some(json!({ "email": "x@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/users",
        Some(&bearer(&token)),
        Some(json!({ "email": "heisenberg@breakingbad.com", "password": "losPollos" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user["id"]);
    assert_eq!(body["email"], "heisenberg@breakingbad.com");

    login(&app, "heisenberg@breakingbad.com", "losPollos").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "walt@breakingbad.com", "password": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_polka_webhook_upgrades_user() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());

    let user = signup(&app, "saul@bettercall.com", "123456").await;
    let upgrade = json!({ "event": "user.upgraded", "data": { "user_id": user["id"] } });
    let api_key = format!("ApiKey {POLKA_KEY}");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        None,
        Some(upgrade.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some("ApiKey wrong-key"),
        Some(upgrade.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        Some(json!({ "event": "user.payment_failed", "data": { "user_id": user["id"] } })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        Some(json!({
            "event": "user.upgraded",
            "data": { "user_id": uuid::Uuid::new_v4().to_string() }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        Some(upgrade),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "saul@bettercall.com", "password": "123456" })),
    )
    .await;
    assert_eq!(body["is_chirpy_red"], true);
}

#[tokio::test]
async fn test_admin_metrics_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Welcome to Chirpy</h1>").unwrap();

    let prod = test_app("prod", dir.path());
    let (status, _) = send(&prod, Method::POST, "/admin/reset", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let app = test_app("dev", dir.path());
    for _ in 0..2 {
        let (status, body) = send(&app, Method::GET, "/app/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_str().unwrap().contains("Welcome to Chirpy"));
    }

    let (status, body) = send(&app, Method::GET, "/admin/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_str()
        .unwrap()
        .contains("Chirpy has been visited 2 times!"));

    signup(&app, "lane@example.com", "04234").await;
    let (status, _) = send(&app, Method::POST, "/admin/reset", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/admin/metrics", None, None).await;
    assert!(body
        .as_str()
        .unwrap()
        .contains("Chirpy has been visited 0 times!"));

    // The account is gone, so the email is free again.
    signup(&app, "lane@example.com", "04234").await;
}

#[tokio::test]
async fn test_login_extreme_expiry_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());
    signup(&app, "lane@example.com", "04234").await;

    for requested in [i64::MAX, i64::MIN] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({
                "email": "lane@example.com",
                "password": "04234",
                "expires_in_seconds": requested,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&["chirpy"]);
        let claims = decode::<Claims>(
            body["token"].as_str().unwrap(),
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &validation,
        )
        .unwrap()
        .claims;
        assert_eq!(claims.exp - claims.iat, 3600);
    }
}

#[tokio::test]
async fn test_bad_request_bodies_get_json_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "lane@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": 42, "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    signup(&app, "lane@example.com", "04234").await;
    let (token, _) = login(&app, "lane@example.com", "04234").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&token)),
        Some(json!({ "text": "wrong field" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn test_webhook_checks_key_before_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app("prod", dir.path());
    let garbage = Some(json!(["not", "an", "event"]));

    let (status, _) = send(&app, Method::POST, "/api/polka/webhooks", None, garbage.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let api_key = format!("ApiKey {POLKA_KEY}");
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        garbage,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        Some(json!({ "event": "user.upgraded", "data": { "user_id": "nope" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
