//! List lifecycle: create, update, delete, and summary views.
//!
//! Slugs are derived from names and are the stable external identifier;
//! renaming a list regenerates its slug, and the EDL URL moves with it.

use serde::Serialize;
use tracing::info;

use crate::model::{generate_slug, BlockList, ListType};
use crate::store::{lists, Store};

use super::{ServiceError, ServiceResult};

/// A list plus its membership count, the shape every read endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct ListSummary {
    #[serde(flatten)]
    pub list: BlockList,
    pub ioc_count: i64,
}

/// Create a list. The slug is derived from the name.
///
/// # Errors
///
/// [`ServiceError::InvalidRequest`] when the name yields an empty slug,
/// [`ServiceError::Duplicate`] when the slug is taken.
pub fn create(
    store: &Store,
    name: &str,
    description: Option<&str>,
    list_type: ListType,
    tags: &[String],
) -> ServiceResult<BlockList> {
    let name = name.trim();
    let slug = generate_slug(name);
    if slug.is_empty() {
        return Err(ServiceError::InvalidRequest(
            "list name must contain at least one alphanumeric character".to_string(),
        ));
    }

    let outcome = store.transaction(|tx| {
        if lists::get_by_slug(tx, &slug)?.is_some() {
            return Ok(Err(ServiceError::duplicate("list", slug.clone())));
        }
        Ok(Ok(lists::insert(
            tx,
            &slug,
            name,
            description,
            list_type,
            tags,
        )?))
    })?;
    let list = outcome?;

    info!(target: "audit", event = "list_created", slug = %list.slug, list_type = %list.list_type);
    Ok(list)
}

/// Update a list's metadata. `list_type` is immutable after creation; a
/// rename regenerates the slug and must not collide with another list.
///
/// # Errors
///
/// [`ServiceError::NotFound`], [`ServiceError::Duplicate`] on slug
/// collision, [`ServiceError::InvalidRequest`] for an unusable new name.
pub fn update(
    store: &Store,
    slug: &str,
    name: Option<&str>,
    description: Option<&str>,
    tags: Option<&[String]>,
) -> ServiceResult<BlockList> {
    let outcome = store.transaction(|tx| {
        let Some(current) = lists::get_by_slug(tx, slug)? else {
            return Ok(Err(ServiceError::not_found("list", slug)));
        };

        let new_name = name.map(str::trim).unwrap_or(&current.name);
        let new_slug = if name.is_some() {
            let s = generate_slug(new_name);
            if s.is_empty() {
                return Ok(Err(ServiceError::InvalidRequest(
                    "list name must contain at least one alphanumeric character".to_string(),
                )));
            }
            s
        } else {
            current.slug.clone()
        };
        if new_slug != current.slug && lists::get_by_slug(tx, &new_slug)?.is_some() {
            return Ok(Err(ServiceError::duplicate("list", new_slug)));
        }

        let new_description = match description {
            Some(d) => Some(d),
            None => current.description.as_deref(),
        };
        let new_tags = tags.unwrap_or(&current.tags);
        lists::update(tx, current.id, &new_slug, new_name, new_description, new_tags)?;
        Ok(lists::get_by_id(tx, current.id)?
            .ok_or_else(|| ServiceError::not_found("list", new_slug)))
    })?;
    let list = outcome?;

    info!(target: "audit", event = "list_updated", slug = %list.slug);
    Ok(list)
}

/// Delete a list. Memberships cascade; the IOC rows themselves remain.
///
/// # Errors
///
/// [`ServiceError::NotFound`] for an unknown slug.
pub fn delete(store: &Store, slug: &str) -> ServiceResult<()> {
    let deleted = store.transaction(|tx| lists::delete_by_slug(tx, slug))?;
    if !deleted {
        return Err(ServiceError::not_found("list", slug));
    }
    info!(target: "audit", event = "list_deleted", slug);
    Ok(())
}

/// One list with its count.
///
/// # Errors
///
/// [`ServiceError::NotFound`] for an unknown slug.
pub fn get(store: &Store, slug: &str) -> ServiceResult<ListSummary> {
    store.with(|conn| {
        let Some(list) = lists::get_by_slug(conn, slug)? else {
            return Ok(Err(ServiceError::not_found("list", slug)));
        };
        let ioc_count = lists::ioc_count(conn, list.id)?;
        Ok(Ok(ListSummary { list, ioc_count }))
    })?
}

/// All lists with counts, ordered by name.
pub fn all(store: &Store) -> ServiceResult<Vec<ListSummary>> {
    let rows = store.with(lists::all_with_counts)?;
    Ok(rows
        .into_iter()
        .map(|(list, ioc_count)| ListSummary { list, ioc_count })
        .collect())
}
