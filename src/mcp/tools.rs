//! MCP tool implementations.
//!
//! Each tool is a thin adapter over the service layer, the same layer the
//! REST handlers call, so an LLM-driven mutation obeys exactly the same
//! validation pipeline and audit contract as a human one.

use serde_json::{Value, json};

use crate::http::AppState;
use crate::service::exclusion as exclusion_service;
use crate::service::ioc as ioc_service;
use crate::service::list as list_service;
use crate::service::{ServiceError, ServiceResult};

use super::types::*;

fn to_value<T: serde::Serialize>(value: T) -> ServiceResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ServiceError::Storage(anyhow::anyhow!("serialization failed: {e}")))
}

pub fn block_ioc(
    state: &AppState,
    params: BlockIocParams,
    performed_by: &str,
) -> ServiceResult<Value> {
    let outcome = ioc_service::add_ioc(
        &state.store,
        &params.value,
        &params.lists,
        params.comment.as_deref(),
        performed_by,
    )?;
    to_value(outcome)
}

pub fn unblock_ioc(
    state: &AppState,
    params: UnblockIocParams,
    performed_by: &str,
) -> ServiceResult<Value> {
    let Some(ioc) = ioc_service::find_by_value(&state.store, &params.value)? else {
        return Err(ServiceError::not_found("IOC", params.value));
    };
    if params.all_lists {
        ioc_service::delete_ioc(&state.store, ioc.id)?;
        return to_value(Ack::ok(format!(
            "'{}' removed from all lists and deleted",
            ioc.value
        )));
    }
    let Some(slug) = params.list.as_deref() else {
        return Err(ServiceError::InvalidRequest(
            "specify a list or set all_lists".to_string(),
        ));
    };
    let removed = ioc_service::remove_from_list(&state.store, ioc.id, slug, performed_by)?;
    if removed {
        to_value(Ack::ok(format!("'{}' removed from '{slug}'", ioc.value)))
    } else {
        Err(ServiceError::InvalidRequest(format!(
            "'{}' is not a member of '{slug}'",
            ioc.value
        )))
    }
}

pub fn bulk_block_ioc(
    state: &AppState,
    params: BulkBlockParams,
    performed_by: &str,
) -> ServiceResult<Value> {
    let tally = ioc_service::bulk_add(
        &state.store,
        &params.values,
        &params.list,
        params.comment.as_deref(),
        state.config.limits.bulk_max,
        performed_by,
    )?;
    to_value(json!({
        "accepted": tally.accepted_count(),
        "skipped": tally.skipped_count(),
        "failed": tally.failed_count(),
        "detail": tally,
    }))
}

pub fn bulk_unblock_ioc(
    state: &AppState,
    params: BulkUnblockParams,
    performed_by: &str,
) -> ServiceResult<Value> {
    let tally = ioc_service::bulk_remove(
        &state.store,
        &params.values,
        params.list.as_deref(),
        params.all_lists,
        state.config.limits.bulk_max,
        performed_by,
    )?;
    to_value(tally)
}

pub fn search_ioc(state: &AppState, params: SearchIocParams) -> ServiceResult<Value> {
    let limit = params
        .limit
        .unwrap_or(state.config.limits.search_limit)
        .min(state.config.limits.search_limit);
    let matches = ioc_service::search(&state.store, &params.query, params.list.as_deref(), limit)?;
    to_value(matches)
}

pub fn list_lists(state: &AppState) -> ServiceResult<Value> {
    to_value(list_service::all(&state.store)?)
}

pub fn get_list(state: &AppState, params: GetListParams) -> ServiceResult<Value> {
    to_value(list_service::get(&state.store, &params.slug)?)
}

pub fn create_list(state: &AppState, params: CreateListParams) -> ServiceResult<Value> {
    let created = list_service::create(
        &state.store,
        &params.name,
        params.description.as_deref(),
        params.list_type,
        &params.tags,
    )?;
    to_value(created)
}

pub fn update_list(state: &AppState, params: UpdateListParams) -> ServiceResult<Value> {
    let updated = list_service::update(
        &state.store,
        &params.slug,
        params.name.as_deref(),
        params.description.as_deref(),
        params.tags.as_deref(),
    )?;
    to_value(updated)
}

pub fn delete_list(state: &AppState, params: DeleteListParams) -> ServiceResult<Value> {
    list_service::delete(&state.store, &params.slug)?;
    to_value(Ack::ok(format!("list '{}' deleted", params.slug)))
}

pub fn list_iocs(state: &AppState, params: ListIocsParams) -> ServiceResult<Value> {
    let limit = params
        .limit
        .unwrap_or(state.config.limits.page_limit)
        .min(state.config.limits.page_limit);
    let offset = params.offset.unwrap_or(0);
    let (items, total) = ioc_service::page_for_list(&state.store, &params.list, limit, offset)?;
    let has_more = (offset + items.len()) < total as usize;
    to_value(json!({
        "items": items,
        "total": total,
        "limit": limit,
        "offset": offset,
        "has_more": has_more,
    }))
}

/// Appends a comment; the IOC's value and type are immutable.
pub fn update_ioc(
    state: &AppState,
    params: UpdateIocParams,
    performed_by: &str,
) -> ServiceResult<Value> {
    let Some(ioc) = ioc_service::find_by_value(&state.store, &params.value)? else {
        return Err(ServiceError::not_found("IOC", params.value));
    };
    ioc_service::add_comment(&state.store, ioc.id, &params.comment, performed_by)?;
    to_value(Ack::ok(format!("comment added to '{}'", ioc.value)))
}

pub fn list_exclusions(state: &AppState) -> ServiceResult<Value> {
    to_value(exclusion_service::grouped(&state.store)?)
}

pub fn preview_exclusion(state: &AppState, params: PreviewExclusionParams) -> ServiceResult<Value> {
    to_value(exclusion_service::preview(&state.store, &params.value)?)
}

pub fn add_exclusion(
    state: &AppState,
    params: AddExclusionParams,
    performed_by: &str,
) -> ServiceResult<Value> {
    let added = exclusion_service::add(
        &state.store,
        &params.value,
        params.reason.as_deref(),
        params.purge,
        performed_by,
    )?;
    to_value(added)
}

pub fn remove_exclusion(
    state: &AppState,
    params: RemoveExclusionParams,
    performed_by: &str,
) -> ServiceResult<Value> {
    exclusion_service::remove(&state.store, &params.value, performed_by)?;
    to_value(Ack::ok(format!("exclusion '{}' removed", params.value)))
}
