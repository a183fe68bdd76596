//! Exclusion rule management: list, preview, add (with optional purge of
//! conflicting IOCs), and remove. Built-in rules can never be removed.

use serde::Serialize;
use tracing::info;

use crate::exclusion::{detect_exclusion_type, matches};
use crate::model::{Exclusion, ExclusionType, Ioc};
use crate::store::{exclusions, iocs, Store};

use super::{ServiceError, ServiceResult};

/// Rules grouped by pattern type, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct ExclusionGroup {
    pub excl_type: ExclusionType,
    pub rules: Vec<Exclusion>,
}

/// What a proposed rule would do, before it exists.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub value: String,
    pub excl_type: ExclusionType,
    /// Stored IOCs the rule would block.
    pub conflicts: Vec<Ioc>,
}

/// A newly added rule, plus the values purged alongside it (if requested).
#[derive(Debug, Clone, Serialize)]
pub struct Added {
    pub exclusion: Exclusion,
    pub purged: Vec<String>,
}

pub fn all(store: &Store) -> ServiceResult<Vec<Exclusion>> {
    Ok(store.with(exclusions::all)?)
}

/// All rules grouped by type, in the type enum's order. Empty groups are
/// omitted.
pub fn grouped(store: &Store) -> ServiceResult<Vec<ExclusionGroup>> {
    let rules = all(store)?;
    let mut groups = Vec::new();
    for excl_type in [
        ExclusionType::Ip,
        ExclusionType::Cidr,
        ExclusionType::Domain,
        ExclusionType::Wildcard,
    ] {
        let matching: Vec<Exclusion> = rules
            .iter()
            .filter(|r| r.excl_type == excl_type)
            .cloned()
            .collect();
        if !matching.is_empty() {
            groups.push(ExclusionGroup {
                excl_type,
                rules: matching,
            });
        }
    }
    Ok(groups)
}

/// A transient rule for matching before anything is stored.
fn probe(value: &str, excl_type: ExclusionType) -> Exclusion {
    Exclusion {
        id: 0,
        value: value.to_string(),
        excl_type,
        reason: None,
        is_builtin: false,
        created_at: crate::store::now(),
    }
}

fn conflicting(all_iocs: &[Ioc], rule: &Exclusion) -> Vec<Ioc> {
    all_iocs
        .iter()
        .filter(|ioc| matches(rule, &ioc.value, ioc.ioc_type))
        .cloned()
        .collect()
}

/// Show which stored IOCs a proposed rule would block, without storing it.
///
/// # Errors
///
/// [`ServiceError::InvalidRequest`] when the value is not a usable pattern.
pub fn preview(store: &Store, value: &str) -> ServiceResult<Preview> {
    let value = value.trim().to_ascii_lowercase();
    let Some(excl_type) = detect_exclusion_type(&value) else {
        return Err(ServiceError::InvalidRequest(format!(
            "'{value}' is not a valid exclusion pattern"
        )));
    };
    let rule = probe(&value, excl_type);
    let conflicts = store.with(|conn| {
        let all_iocs = iocs::all(conn)?;
        Ok(conflicting(&all_iocs, &rule))
    })?;
    Ok(Preview {
        value,
        excl_type,
        conflicts,
    })
}

/// Add a custom exclusion rule.
///
/// With `purge`, stored IOCs the new rule covers are deleted in the same
/// transaction; their memberships and audit history cascade away. Without
/// it, existing IOCs stay and only future submissions are blocked.
///
/// # Errors
///
/// [`ServiceError::InvalidRequest`] for an unusable pattern,
/// [`ServiceError::Duplicate`] when the rule already exists.
pub fn add(
    store: &Store,
    value: &str,
    reason: Option<&str>,
    purge: bool,
    performed_by: &str,
) -> ServiceResult<Added> {
    let value = value.trim().to_ascii_lowercase();
    let Some(excl_type) = detect_exclusion_type(&value) else {
        return Err(ServiceError::InvalidRequest(format!(
            "'{value}' is not a valid exclusion pattern"
        )));
    };
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());

    let outcome = store.transaction(|tx| {
        if exclusions::get_by_value(tx, &value)?.is_some() {
            return Ok(Err(ServiceError::duplicate("exclusion", value.clone())));
        }
        let exclusion = exclusions::insert(tx, &value, excl_type, reason, false)?;

        let mut purged = Vec::new();
        if purge {
            for ioc in conflicting(&iocs::all(tx)?, &exclusion) {
                if iocs::delete(tx, ioc.id)? {
                    purged.push(ioc.value);
                }
            }
        }
        Ok(Ok(Added { exclusion, purged }))
    })?;
    let added = outcome?;

    info!(
        target: "audit",
        event = "exclusion_added",
        value = %added.exclusion.value,
        excl_type = %added.exclusion.excl_type,
        purged = added.purged.len(),
        performed_by,
    );
    Ok(added)
}

/// Remove a custom rule by value.
///
/// # Errors
///
/// [`ServiceError::NotFound`] for an unknown rule,
/// [`ServiceError::BuiltinProtected`] for a built-in one.
pub fn remove(store: &Store, value: &str, performed_by: &str) -> ServiceResult<()> {
    let value = value.trim().to_ascii_lowercase();
    let outcome = store.transaction(|tx| {
        let Some(rule) = exclusions::get_by_value(tx, &value)? else {
            return Ok(Err(ServiceError::not_found("exclusion", value.clone())));
        };
        if rule.is_builtin {
            return Ok(Err(ServiceError::BuiltinProtected(value.clone())));
        }
        exclusions::delete_by_value(tx, &value)?;
        Ok(Ok(()))
    })?;
    outcome?;

    info!(target: "audit", event = "exclusion_removed", value = %value, performed_by);
    Ok(())
}
