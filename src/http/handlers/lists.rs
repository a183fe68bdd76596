//! List CRUD handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::super::types::{CreateListRequest, DeletedResponse, ListEnvelope, UpdateListRequest};
use super::super::{AppError, AppState};
use crate::service::list::{self, ListSummary};

fn envelope(state: &AppState, summary: ListSummary) -> ListEnvelope {
    let edl_url = state
        .config
        .edl_base_url()
        .map(|base| format!("{base}/edl/{}", summary.list.slug));
    ListEnvelope { summary, edl_url }
}

/// GET /api/lists - All lists with counts.
pub(crate) async fn list_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListEnvelope>>, AppError> {
    let lists = list::all(&state.store)?;
    Ok(Json(
        lists.into_iter().map(|s| envelope(&state, s)).collect(),
    ))
}

/// POST /api/lists - Create a list.
pub(crate) async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<ListEnvelope>), AppError> {
    let created = list::create(
        &state.store,
        &req.name,
        req.description.as_deref(),
        req.list_type,
        &req.tags,
    )?;
    let summary = list::get(&state.store, &created.slug)?;
    Ok((StatusCode::CREATED, Json(envelope(&state, summary))))
}

/// GET /api/lists/:slug - One list.
pub(crate) async fn get_one(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ListEnvelope>, AppError> {
    let summary = list::get(&state.store, &slug)?;
    Ok(Json(envelope(&state, summary)))
}

/// PATCH /api/lists/:slug - Update metadata. A rename moves the slug.
pub(crate) async fn update(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateListRequest>,
) -> Result<Json<ListEnvelope>, AppError> {
    let updated = list::update(
        &state.store,
        &slug,
        req.name.as_deref(),
        req.description.as_deref(),
        req.tags.as_deref(),
    )?;
    let summary = list::get(&state.store, &updated.slug)?;
    Ok(Json(envelope(&state, summary)))
}

/// DELETE /api/lists/:slug - Delete a list; its IOCs survive.
pub(crate) async fn remove(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    list::delete(&state.store, &slug)?;
    Ok(Json(DeletedResponse { deleted: true }))
}
