//! Inventory routes. Every handler runs behind the guard and the auth
//! provider layer, and talks to the record store with the session token.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use serde::{Deserialize, Serialize};

use crate::auth::AuthContext;
use crate::backend::NetworkError;
use crate::guard::LOGIN_PATH;
use crate::inventory::{
    BoreGroup, Gear, GearFilter, GearFormData, GearFormError, InventoryStats, SearchHit, group_by_bore, search,
    unique_materials,
};

const RECENT_SORT: &str = "-updated";
const INVENTORY_SORT: &str = "bore_size,diametral_pitch,name";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session, or the record store rejected its token.
    #[error("session expired")]
    SessionExpired,
    #[error(transparent)]
    Invalid(#[from] GearFormError),
    #[error("record not found")]
    NotFound,
    #[error("record store error: {0}")]
    Backend(NetworkError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SessionExpired => return Redirect::to(LOGIN_PATH).into_response(),
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Token and owner id for the current session.
fn credentials(auth: &AuthContext) -> Result<(String, String), ApiError> {
    let store = auth.store();
    match (store.token(), store.current_user()) {
        (Some(token), Some(user)) => Ok((token, user.id)),
        _ => Err(ApiError::SessionExpired),
    }
}

/// Map a record store failure; a rejected token ends the session.
fn backend_failure(auth: &AuthContext, e: NetworkError) -> ApiError {
    if e.is_unauthorized() {
        tracing::info!("record store rejected session token; logging out");
        auth.logout();
        return ApiError::SessionExpired;
    }
    if matches!(e, NetworkError::Status { status: 404, .. }) {
        return ApiError::NotFound;
    }
    tracing::error!(error = %e, "record store request failed");
    ApiError::Backend(e)
}

async fn owned_gears(auth: &AuthContext, sort: &str) -> Result<Vec<Gear>, ApiError> {
    let (token, owner) = credentials(auth)?;
    auth.store()
        .backend()
        .list_gears(&token, &owner, sort)
        .await
        .map_err(|e| backend_failure(auth, e))
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /`: headline inventory numbers.
pub async fn dashboard(auth: AuthContext) -> Result<Json<InventoryStats>, ApiError> {
    let gears = owned_gears(&auth, RECENT_SORT).await?;
    Ok(Json(InventoryStats::from_gears(&gears)))
}

#[derive(Debug, Serialize)]
pub struct InventoryView {
    pub groups: Vec<BoreGroup>,
    pub materials: Vec<String>,
    pub total: usize,
}

/// `GET /gears`: filtered inventory grouped by bore.
pub async fn list(auth: AuthContext, Query(filter): Query<GearFilter>) -> Result<Json<InventoryView>, ApiError> {
    let gears = owned_gears(&auth, INVENTORY_SORT).await?;
    let matching = filter.apply(&gears);
    Ok(Json(InventoryView {
        total: matching.len(),
        groups: group_by_bore(matching),
        materials: unique_materials(&gears),
    }))
}

/// `POST /gears`
pub async fn create(auth: AuthContext, Json(form): Json<GearFormData>) -> Result<(StatusCode, Json<Gear>), ApiError> {
    form.validate()?;
    let (token, owner) = credentials(&auth)?;
    let gear = auth
        .store()
        .backend()
        .create_gear(&token, &owner, &form)
        .await
        .map_err(|e| backend_failure(&auth, e))?;
    tracing::info!(gear_id = %gear.id, "gear created");
    Ok((StatusCode::CREATED, Json(gear)))
}

/// `PATCH /gears/{id}`
pub async fn update(
    auth: AuthContext,
    Path(id): Path<String>,
    Json(form): Json<GearFormData>,
) -> Result<Json<Gear>, ApiError> {
    form.validate()?;
    let (token, _) = credentials(&auth)?;
    let gear = auth
        .store()
        .backend()
        .update_gear(&token, &id, &form)
        .await
        .map_err(|e| backend_failure(&auth, e))?;
    Ok(Json(gear))
}

/// `DELETE /gears/{id}`
pub async fn delete(auth: AuthContext, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let (token, _) = credentials(&auth)?;
    auth.store()
        .backend()
        .delete_gear(&token, &id)
        .await
        .map_err(|e| backend_failure(&auth, e))?;
    tracing::info!(gear_id = %id, "gear deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// `GET /search?q=`: command palette results.
pub async fn search_parts(
    auth: AuthContext,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    if query.q.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    // Most recently updated parts win the limited part slots.
    let gears = owned_gears(&auth, RECENT_SORT).await?;
    Ok(Json(search(&query.q, &gears)))
}

#[cfg(test)]
#[path = "gears_test.rs"]
mod tests;
