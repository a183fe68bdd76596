//! IOC mutation and query handlers. All mutations run the validation
//! pipeline in the service layer.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};

use super::super::types::{
    AddIocRequest, BulkAddRequest, BulkRemoveRequest, CommentRequest, PageQuery, PageResponse,
    RemovedResponse, SearchQuery,
};
use super::super::{AppError, AppState, performed_by};
use crate::model::{AuditEntry, Ioc};
use crate::service::ioc::{self, AddOutcome, BulkRemoveTally, BulkTally, SearchMatch};

/// POST /api/iocs - Add one value to zero or more lists.
pub(crate) async fn add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddIocRequest>,
) -> Result<(StatusCode, Json<AddOutcome>), AppError> {
    let outcome = ioc::add_ioc(
        &state.store,
        &req.value,
        &req.lists,
        req.comment.as_deref(),
        &performed_by(&headers),
    )?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// POST /api/iocs/bulk - Add a batch to one list.
pub(crate) async fn bulk_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkAddRequest>,
) -> Result<Json<BulkTally>, AppError> {
    let tally = ioc::bulk_add(
        &state.store,
        &req.values,
        &req.list,
        req.comment.as_deref(),
        state.config.limits.bulk_max,
        &performed_by(&headers),
    )?;
    Ok(Json(tally))
}

/// POST /api/iocs/bulk-remove - Remove a batch from one list or everywhere.
pub(crate) async fn bulk_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BulkRemoveRequest>,
) -> Result<Json<BulkRemoveTally>, AppError> {
    let tally = ioc::bulk_remove(
        &state.store,
        &req.values,
        req.list.as_deref(),
        req.all_lists,
        state.config.limits.bulk_max,
        &performed_by(&headers),
    )?;
    Ok(Json(tally))
}

/// GET /api/iocs/search?q=&list=&limit=
pub(crate) async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchMatch>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.config.limits.search_limit)
        .min(state.config.limits.search_limit);
    let matches = ioc::search(&state.store, &query.q, query.list.as_deref(), limit)?;
    Ok(Json(matches))
}

/// GET /api/lists/:slug/iocs - One page of a list's members.
pub(crate) async fn page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<Ioc>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.config.limits.page_limit)
        .min(state.config.limits.page_limit);
    let offset = query.offset.unwrap_or(0);
    let (items, total) = ioc::page_for_list(&state.store, &slug, limit, offset)?;
    let has_more = (offset + items.len()) < total as usize;
    Ok(Json(PageResponse {
        items,
        total,
        limit,
        offset,
        has_more,
    }))
}

/// DELETE /api/iocs/:id - Delete an IOC everywhere.
pub(crate) async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if ioc::delete_ioc(&state.store, id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(crate::service::ServiceError::not_found("IOC", id.to_string()).into())
    }
}

/// DELETE /api/iocs/:id/lists/:slug - Remove one membership.
pub(crate) async fn remove_from_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, slug)): Path<(i64, String)>,
) -> Result<Json<RemovedResponse>, AppError> {
    let removed = ioc::remove_from_list(&state.store, id, &slug, &performed_by(&headers))?;
    Ok(Json(RemovedResponse { removed }))
}

/// POST /api/iocs/:id/comments - Append a comment to the audit history.
pub(crate) async fn comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<CommentRequest>,
) -> Result<StatusCode, AppError> {
    ioc::add_comment(&state.store, id, &req.content, &performed_by(&headers))?;
    Ok(StatusCode::CREATED)
}

/// GET /api/iocs/:id/audit - Full history, oldest first.
pub(crate) async fn audit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    Ok(Json(ioc::audit_history(&state.store, id)?))
}
