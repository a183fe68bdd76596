//! Audit log writes.
//!
//! Each mutation writes exactly one entry synchronously within the same
//! transaction as the mutation itself, so the log is never missing an event
//! for a change that is visible to readers. Entries are immutable; no
//! update or delete path exists. A structured tracing event mirrors each
//! write for operational log streams.

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use crate::model::AuditAction;
use crate::store::iocs;

pub fn ioc_created(conn: &Connection, ioc_id: i64, value: &str, performed_by: &str) -> Result<()> {
    info!(target: "audit", event = "ioc_created", ioc_id, %value, %performed_by);
    iocs::append_audit(conn, ioc_id, AuditAction::Created, None, None, performed_by)
}

pub fn added_to_list(
    conn: &Connection,
    ioc_id: i64,
    list_id: i64,
    performed_by: &str,
) -> Result<()> {
    info!(target: "audit", event = "ioc_added_to_list", ioc_id, list_id, %performed_by);
    iocs::append_audit(
        conn,
        ioc_id,
        AuditAction::AddedToList,
        Some(list_id),
        None,
        performed_by,
    )
}

pub fn removed_from_list(
    conn: &Connection,
    ioc_id: i64,
    list_id: i64,
    performed_by: &str,
) -> Result<()> {
    info!(target: "audit", event = "ioc_removed_from_list", ioc_id, list_id, %performed_by);
    iocs::append_audit(
        conn,
        ioc_id,
        AuditAction::RemovedFromList,
        Some(list_id),
        None,
        performed_by,
    )
}

pub fn comment(conn: &Connection, ioc_id: i64, content: &str, performed_by: &str) -> Result<()> {
    info!(target: "audit", event = "ioc_comment", ioc_id, %performed_by);
    iocs::append_audit(
        conn,
        ioc_id,
        AuditAction::Comment,
        None,
        Some(content),
        performed_by,
    )
}
