//! Exclusion rule handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};

use super::super::types::{
    AddExclusionRequest, DeletedResponse, PreviewExclusionRequest, RemoveExclusionQuery,
};
use super::super::{AppError, AppState, performed_by};
use crate::service::exclusion::{self, Added, ExclusionGroup, Preview};

/// GET /api/exclusions - All rules grouped by type.
pub(crate) async fn list_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExclusionGroup>>, AppError> {
    Ok(Json(exclusion::grouped(&state.store)?))
}

/// POST /api/exclusions/preview - What would this rule block right now?
pub(crate) async fn preview(
    State(state): State<AppState>,
    Json(req): Json<PreviewExclusionRequest>,
) -> Result<Json<Preview>, AppError> {
    Ok(Json(exclusion::preview(&state.store, &req.value)?))
}

/// POST /api/exclusions - Add a custom rule, optionally purging the IOCs
/// it already covers.
pub(crate) async fn add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddExclusionRequest>,
) -> Result<(StatusCode, Json<Added>), AppError> {
    let added = exclusion::add(
        &state.store,
        &req.value,
        req.reason.as_deref(),
        req.purge,
        &performed_by(&headers),
    )?;
    Ok((StatusCode::CREATED, Json(added)))
}

/// DELETE /api/exclusions?value=... - Remove a custom rule.
pub(crate) async fn remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RemoveExclusionQuery>,
) -> Result<Json<DeletedResponse>, AppError> {
    exclusion::remove(&state.store, &query.value, &performed_by(&headers))?;
    Ok(Json(DeletedResponse { deleted: true }))
}
