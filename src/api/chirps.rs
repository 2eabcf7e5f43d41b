//! Chirp endpoints
//! Mission: Create, list, fetch and delete short posts

use crate::api::{
    error::{blocking, ApiError},
    extract::ApiJson,
    AppState,
};
use crate::auth::AuthenticatedUser;
use crate::db::{ChirpRepository, StoreError};
use crate::models::{censor, Chirp, SortOrder, MAX_CHIRP_LEN};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

/// `GET /api/chirps` query string. Both fields arrive as raw strings so a bad
/// value gets a JSON error instead of the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub author_id: Option<String>,
    pub sort: Option<String>,
}

impl ListQuery {
    fn author(&self) -> Result<Option<Uuid>, ApiError> {
        match self.author_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|_| ApiError::BadRequest("Invalid author_id")),
        }
    }

    /// Anything other than `desc` sorts ascending.
    fn order(&self) -> SortOrder {
        match self.sort.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

/// POST /api/chirps
pub async fn create_chirp(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateChirpRequest>,
) -> Result<(StatusCode, Json<Chirp>), ApiError> {
    let cleaned = clean_body(&payload.body)?;

    let store = state.store.clone();
    let chirp = blocking(move || Ok(store.create_chirp(user_id, &cleaned)?)).await?;

    info!(chirp_id = %chirp.id, user_id = %user_id, "Chirp created");
    Ok((StatusCode::CREATED, Json(chirp)))
}

/// GET /api/chirps
pub async fn list_chirps(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Chirp>>, ApiError> {
    let author = query.author()?;
    let order = query.order();

    let store = state.store.clone();
    let chirps = blocking(move || Ok(store.list_chirps(author, order)?)).await?;

    Ok(Json(chirps))
}

/// GET /api/chirps/:chirp_id
pub async fn get_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<String>,
) -> Result<Json<Chirp>, ApiError> {
    let id = parse_chirp_id(&chirp_id)?;

    let store = state.store.clone();
    let chirp = blocking(move || store.get_chirp(id).map_err(chirp_not_found)).await?;

    Ok(Json(chirp))
}

/// DELETE /api/chirps/:chirp_id
pub async fn delete_chirp(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(chirp_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_chirp_id(&chirp_id)?;

    let store = state.store.clone();
    blocking(move || {
        let chirp = store.get_chirp(id).map_err(chirp_not_found)?;
        if chirp.user_id != user_id {
            return Err(ApiError::Forbidden("Not the author of this chirp"));
        }
        store.delete_chirp(id).map_err(chirp_not_found)
    })
    .await?;

    info!(chirp_id = %id, user_id = %user_id, "Chirp deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Enforce the length limit, counted in characters rather than bytes, then
/// censor.
fn clean_body(body: &str) -> Result<String, ApiError> {
    if body.chars().count() > MAX_CHIRP_LEN {
        return Err(ApiError::BadRequest("Chirp is too long"));
    }
    Ok(censor(body))
}

// An unparseable id can never match a row.
fn parse_chirp_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Chirp not found"))
}

fn chirp_not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("Chirp not found"),
        other => other.into(),
    }
}
