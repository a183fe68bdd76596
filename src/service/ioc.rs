//! The IOC mutation service: the single orchestrator behind every caller.
//!
//! State machine per submitted value:
//!
//! ```text
//! SUBMITTED -> CLASSIFY        -> (fail: rejected InvalidFormat)
//!           -> EXCLUDE-CHECK   -> (fail: rejected ExclusionBlocked)
//!           -> RESOLVE-EXISTING-> found | create new (unique on value)
//!           -> COMPAT-CHECK    -> (fail per list: skipped TypeMismatch)
//!           -> COMMIT          -> accepted (membership + audit entries)
//! ```
//!
//! Bulk operations run the pipeline per value with one transaction per
//! item, so a malformed entry never aborts the rest of the batch. Tally
//! invariant: `accepted + skipped + failed == len(input)`.

use serde::Serialize;
use tracing::debug;

use crate::classify::classify;
use crate::exclusion;
use crate::model::{AuditEntry, Exclusion, Ioc};
use crate::store::{exclusions, iocs, lists, Store};

use super::{audit, ServiceError, ServiceResult};

/// Upper bound on bulk operation batch size.
pub const BULK_MAX: usize = 500;

/// A list the pipeline declined to touch for one value, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedList {
    pub slug: String,
    pub reason: String,
}

/// Outcome of a single-value add.
#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub ioc: Ioc,
    /// True if this call created the IOC row (vs. reusing an existing one).
    pub created: bool,
    /// Slugs of lists the IOC was newly added to.
    pub added_to: Vec<String>,
    /// Lists skipped per-list: already a member, or type mismatch.
    pub skipped: Vec<SkippedList>,
}

/// One itemized entry in a bulk tally.
#[derive(Debug, Clone, Serialize)]
pub struct TallyItem {
    pub value: String,
    pub reason: String,
}

/// Three-way tally of a bulk add. Per-item isolation: every input value
/// lands in exactly one bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkTally {
    pub accepted: Vec<String>,
    pub skipped: Vec<TallyItem>,
    pub failed: Vec<TallyItem>,
}

impl BulkTally {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Tally of a bulk remove.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkRemoveTally {
    pub removed: Vec<String>,
    pub not_found: Vec<String>,
}

/// An IOC with the context a search caller wants: memberships and the most
/// recent comments.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    #[serde(flatten)]
    pub ioc: Ioc,
    pub lists: Vec<String>,
    pub comments: Vec<String>,
}

fn excluded_err(value: &str, rule: &Exclusion) -> ServiceError {
    ServiceError::ExclusionBlocked {
        value: value.to_string(),
        rule_id: rule.id,
        rule_value: rule.value.clone(),
        reason: rule
            .reason
            .clone()
            .unwrap_or_else(|| "excluded".to_string()),
    }
}

fn comment_text(comment: Option<&str>) -> Option<&str> {
    comment.map(str::trim).filter(|c| !c.is_empty())
}

fn check_batch_size(len: usize, max_batch: usize) -> ServiceResult<()> {
    let cap = max_batch.min(BULK_MAX);
    if len > cap {
        return Err(ServiceError::InvalidRequest(format!(
            "batch of {len} exceeds the maximum of {cap} values"
        )));
    }
    Ok(())
}

/// Add one value to zero or more lists.
///
/// Runs the full pipeline. Classification and exclusion failures reject the
/// whole call; compatibility failures and existing memberships are recorded
/// per-list in the outcome while the other lists proceed. The IOC row is
/// created (or reused) even when every target list is skipped.
///
/// # Errors
///
/// [`ServiceError::InvalidFormat`], [`ServiceError::ExclusionBlocked`], or
/// [`ServiceError::NotFound`] when a named list does not exist.
pub fn add_ioc(
    store: &Store,
    raw: &str,
    list_slugs: &[String],
    comment: Option<&str>,
    performed_by: &str,
) -> ServiceResult<AddOutcome> {
    let classified = classify(raw)?;
    debug!(value = %classified.value, ioc_type = %classified.ioc_type, "classified IOC");

    let outcome = store.transaction(|tx| {
        let rules = exclusions::all(tx)?;
        if let Some(rule) = exclusion::check(&rules, &classified.value, classified.ioc_type) {
            return Ok(Err(excluded_err(&classified.value, rule)));
        }

        // Every named list must exist before anything is committed.
        let mut targets = Vec::with_capacity(list_slugs.len());
        for slug in list_slugs {
            match lists::get_by_slug(tx, slug)? {
                Some(list) => targets.push(list),
                None => return Ok(Err(ServiceError::not_found("list", slug.clone()))),
            }
        }

        let (ioc, created) = iocs::get_or_create(tx, &classified.value, classified.ioc_type)?;
        if created {
            audit::ioc_created(tx, ioc.id, &ioc.value, performed_by)?;
        }

        let mut added_to = Vec::new();
        let mut skipped = Vec::new();
        for list in &targets {
            if !list.list_type.accepts(ioc.ioc_type) {
                skipped.push(SkippedList {
                    slug: list.slug.clone(),
                    reason: ServiceError::TypeMismatch {
                        ioc_type: ioc.ioc_type,
                        list_type: list.list_type,
                    }
                    .to_string(),
                });
                continue;
            }
            if iocs::add_membership(tx, list.id, ioc.id, performed_by)? {
                audit::added_to_list(tx, ioc.id, list.id, performed_by)?;
                added_to.push(list.slug.clone());
            } else {
                skipped.push(SkippedList {
                    slug: list.slug.clone(),
                    reason: "already a member".to_string(),
                });
            }
        }

        if let Some(content) = comment_text(comment) {
            audit::comment(tx, ioc.id, content, performed_by)?;
        }

        Ok(Ok(AddOutcome {
            ioc,
            created,
            added_to,
            skipped,
        }))
    })?;

    outcome
}

/// Add a batch of values to one list, one transaction per item.
///
/// Exclusion rules and the target list are resolved once up front; each
/// value then runs the pipeline independently and lands in exactly one
/// tally bucket. `max_batch` is the configured cap, itself bounded by
/// [`BULK_MAX`].
///
/// # Errors
///
/// [`ServiceError::InvalidRequest`] for an oversized batch,
/// [`ServiceError::NotFound`] for an unknown list. Per-value failures go
/// into the tally, never abort the batch.
pub fn bulk_add(
    store: &Store,
    values: &[String],
    list_slug: &str,
    comment: Option<&str>,
    max_batch: usize,
    performed_by: &str,
) -> ServiceResult<BulkTally> {
    check_batch_size(values.len(), max_batch)?;

    let (list, rules) = store.with(|conn| {
        let list = lists::get_by_slug(conn, list_slug)?;
        let rules = exclusions::all(conn)?;
        Ok((list, rules))
    })?;
    let list = list.ok_or_else(|| ServiceError::not_found("list", list_slug))?;

    let mut tally = BulkTally::default();
    for raw in values {
        let classified = match classify(raw) {
            Ok(c) => c,
            Err(e) => {
                tally.failed.push(TallyItem {
                    value: raw.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if let Some(rule) = exclusion::check(&rules, &classified.value, classified.ioc_type) {
            tally.failed.push(TallyItem {
                value: raw.clone(),
                reason: excluded_err(&classified.value, rule).to_string(),
            });
            continue;
        }

        if !list.list_type.accepts(classified.ioc_type) {
            tally.skipped.push(TallyItem {
                value: classified.value.clone(),
                reason: ServiceError::TypeMismatch {
                    ioc_type: classified.ioc_type,
                    list_type: list.list_type,
                }
                .to_string(),
            });
            continue;
        }

        // Each item commits on its own; a later failure cannot roll it back.
        let added = store.transaction(|tx| {
            let (ioc, created) = iocs::get_or_create(tx, &classified.value, classified.ioc_type)?;
            if created {
                audit::ioc_created(tx, ioc.id, &ioc.value, performed_by)?;
            }
            if !iocs::add_membership(tx, list.id, ioc.id, performed_by)? {
                return Ok(false);
            }
            audit::added_to_list(tx, ioc.id, list.id, performed_by)?;
            if let Some(content) = comment_text(comment) {
                audit::comment(tx, ioc.id, content, performed_by)?;
            }
            Ok(true)
        })?;

        if added {
            tally.accepted.push(classified.value);
        } else {
            tally.skipped.push(TallyItem {
                value: classified.value,
                reason: "already a member".to_string(),
            });
        }
    }

    debug_assert_eq!(
        tally.accepted.len() + tally.skipped.len() + tally.failed.len(),
        values.len()
    );
    Ok(tally)
}

/// Remove values from one list, or from everywhere (`all_lists`), which
/// deletes the IOC rows outright.
///
/// # Errors
///
/// [`ServiceError::InvalidRequest`] when neither a list nor `all_lists` is
/// given or the batch is oversized; [`ServiceError::NotFound`] for an
/// unknown list.
pub fn bulk_remove(
    store: &Store,
    values: &[String],
    list_slug: Option<&str>,
    all_lists: bool,
    max_batch: usize,
    performed_by: &str,
) -> ServiceResult<BulkRemoveTally> {
    check_batch_size(values.len(), max_batch)?;
    let list = match (list_slug, all_lists) {
        (_, true) => None,
        (Some(slug), false) => Some(
            store
                .with(|conn| lists::get_by_slug(conn, slug))?
                .ok_or_else(|| ServiceError::not_found("list", slug))?,
        ),
        (None, false) => {
            return Err(ServiceError::InvalidRequest(
                "specify a list or set all_lists".to_string(),
            ));
        }
    };

    let mut tally = BulkRemoveTally::default();
    for raw in values {
        // Canonicalize when possible so removals match stored values.
        let canonical = classify(raw)
            .map(|c| c.value)
            .unwrap_or_else(|_| raw.trim().to_ascii_lowercase());

        let removed = store.transaction(|tx| {
            let Some(ioc) = iocs::get_by_value(tx, &canonical)? else {
                return Ok(false);
            };
            match &list {
                Some(list) => {
                    if !iocs::remove_membership(tx, list.id, ioc.id)? {
                        return Ok(false);
                    }
                    audit::removed_from_list(tx, ioc.id, list.id, performed_by)?;
                    Ok(true)
                }
                // All-lists removal deletes the row; memberships and audit
                // history cascade with it.
                None => iocs::delete(tx, ioc.id),
            }
        })?;

        if removed {
            tally.removed.push(canonical);
        } else {
            tally.not_found.push(raw.clone());
        }
    }
    Ok(tally)
}

/// Remove one IOC from one list. Never deletes the IOC itself.
///
/// Returns false if the IOC was not a member of the list.
///
/// # Errors
///
/// [`ServiceError::NotFound`] for an unknown list.
pub fn remove_from_list(
    store: &Store,
    ioc_id: i64,
    list_slug: &str,
    performed_by: &str,
) -> ServiceResult<bool> {
    let removed = store.transaction(|tx| {
        let Some(list) = lists::get_by_slug(tx, list_slug)? else {
            return Ok(None);
        };
        if !iocs::remove_membership(tx, list.id, ioc_id)? {
            return Ok(Some(false));
        }
        audit::removed_from_list(tx, ioc_id, list.id, performed_by)?;
        Ok(Some(true))
    })?;
    removed.ok_or_else(|| ServiceError::not_found("list", list_slug))
}

/// Delete an IOC entirely: all memberships and audit rows cascade.
pub fn delete_ioc(store: &Store, ioc_id: i64) -> ServiceResult<bool> {
    Ok(store.transaction(|tx| iocs::delete(tx, ioc_id))?)
}

/// Append a comment to an IOC's audit history. No membership side effects.
///
/// # Errors
///
/// [`ServiceError::InvalidRequest`] for empty content,
/// [`ServiceError::NotFound`] for an unknown IOC.
pub fn add_comment(
    store: &Store,
    ioc_id: i64,
    content: &str,
    performed_by: &str,
) -> ServiceResult<()> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::InvalidRequest(
            "comment content cannot be empty".to_string(),
        ));
    }
    store.transaction(|tx| {
        if iocs::get_by_id(tx, ioc_id)?.is_none() {
            return Ok(Err(ServiceError::not_found("IOC", ioc_id.to_string())));
        }
        audit::comment(tx, ioc_id, content, performed_by)?;
        Ok(Ok(()))
    })?
}

/// Look up an IOC by raw value (canonicalized first when it classifies).
pub fn find_by_value(store: &Store, raw: &str) -> ServiceResult<Option<Ioc>> {
    let canonical = classify(raw)
        .map(|c| c.value)
        .unwrap_or_else(|_| raw.trim().to_ascii_lowercase());
    Ok(store.with(|conn| iocs::get_by_value(conn, &canonical))?)
}

/// Substring search over stored IOCs, optionally scoped to one list.
///
/// # Errors
///
/// [`ServiceError::NotFound`] when a scope list does not exist.
pub fn search(
    store: &Store,
    query: &str,
    list_slug: Option<&str>,
    limit: usize,
) -> ServiceResult<Vec<SearchMatch>> {
    store.with(|conn| {
        let list_id = match list_slug {
            Some(slug) => match lists::get_by_slug(conn, slug)? {
                Some(list) => Some(list.id),
                None => return Ok(Err(ServiceError::not_found("list", slug))),
            },
            None => None,
        };
        let mut out = Vec::new();
        for ioc in iocs::search(conn, query, list_id, limit)? {
            let lists = iocs::memberships(conn, ioc.id)?
                .into_iter()
                .map(|(_, slug)| slug)
                .collect();
            let comments = iocs::recent_comments(conn, ioc.id, 3)?;
            out.push(SearchMatch {
                ioc,
                lists,
                comments,
            });
        }
        Ok(Ok(out))
    })?
}

/// One page of a list's IOCs plus the total count.
///
/// # Errors
///
/// [`ServiceError::NotFound`] for an unknown list.
pub fn page_for_list(
    store: &Store,
    list_slug: &str,
    limit: usize,
    offset: usize,
) -> ServiceResult<(Vec<Ioc>, i64)> {
    store.with(|conn| {
        let Some(list) = lists::get_by_slug(conn, list_slug)? else {
            return Ok(Err(ServiceError::not_found("list", list_slug)));
        };
        Ok(Ok(iocs::page_for_list(conn, list.id, limit, offset)?))
    })?
}

/// Full audit history for one IOC, oldest first.
///
/// # Errors
///
/// [`ServiceError::NotFound`] for an unknown IOC.
pub fn audit_history(store: &Store, ioc_id: i64) -> ServiceResult<Vec<AuditEntry>> {
    store.with(|conn| {
        if iocs::get_by_id(conn, ioc_id)?.is_none() {
            return Ok(Err(ServiceError::not_found("IOC", ioc_id.to_string())));
        }
        Ok(Ok(iocs::audit_history(conn, ioc_id)?))
    })?
}
