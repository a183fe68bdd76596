//! IOC, membership, and audit table queries.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{AuditAction, AuditEntry, Ioc, IocType};

use super::now;

fn row_to_ioc(row: &Row<'_>) -> rusqlite::Result<Ioc> {
    Ok(Ioc {
        id: row.get("id")?,
        value: row.get("value")?,
        ioc_type: row.get("ioc_type")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_audit(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get("id")?,
        ioc_id: row.get("ioc_id")?,
        action: row.get("action")?,
        list_id: row.get("list_id")?,
        content: row.get("content")?,
        performed_by: row.get("performed_by")?,
        created_at: row.get("created_at")?,
    })
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Ioc>> {
    Ok(conn
        .query_row("SELECT * FROM iocs WHERE id = ?1", [id], row_to_ioc)
        .optional()?)
}

/// Exact-match lookup on the canonical value. This is the dedup contract:
/// callers canonicalize first, then resolve.
pub fn get_by_value(conn: &Connection, value: &str) -> Result<Option<Ioc>> {
    Ok(conn
        .query_row("SELECT * FROM iocs WHERE value = ?1", [value], row_to_ioc)
        .optional()?)
}

/// Get or create the IOC row for a canonical value.
///
/// The insert races through the UNIQUE constraint on `value`: `ON CONFLICT
/// DO NOTHING` followed by a re-select, so concurrent duplicate submissions
/// converge on one row. Returns the row and whether this call created it.
pub fn get_or_create(conn: &Connection, value: &str, ioc_type: IocType) -> Result<(Ioc, bool)> {
    let ts = now();
    let inserted = conn.execute(
        "INSERT INTO iocs (value, ioc_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(value) DO NOTHING",
        params![value, ioc_type, ts],
    )?;
    let ioc = get_by_value(conn, value)?
        .ok_or_else(|| anyhow::anyhow!("IOC '{value}' missing after upsert"))?;
    Ok((ioc, inserted > 0))
}

/// Delete an IOC row outright; memberships and audit rows cascade.
pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let n = conn.execute("DELETE FROM iocs WHERE id = ?1", [id])?;
    Ok(n > 0)
}

/// Substring search over canonical values, optionally scoped to one list.
pub fn search(
    conn: &Connection,
    query: &str,
    list_id: Option<i64>,
    limit: usize,
) -> Result<Vec<Ioc>> {
    let pattern = format!(
        "%{}%",
        query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
    );
    let mut out = Vec::new();
    match list_id {
        Some(list_id) => {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT i.* FROM iocs i
                 JOIN list_iocs li ON li.ioc_id = i.id
                 WHERE li.list_id = ?2 AND i.value LIKE ?1 ESCAPE '\\'
                 ORDER BY i.value LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![pattern, list_id, limit as i64], row_to_ioc)?;
            for row in rows {
                out.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT * FROM iocs WHERE value LIKE ?1 ESCAPE '\\'
                 ORDER BY value LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![pattern, limit as i64], row_to_ioc)?;
            for row in rows {
                out.push(row?);
            }
        }
    }
    Ok(out)
}

/// One page of a list's IOCs ordered by value, plus the total count.
pub fn page_for_list(
    conn: &Connection,
    list_id: i64,
    limit: usize,
    offset: usize,
) -> Result<(Vec<Ioc>, i64)> {
    let total = super::lists::ioc_count(conn, list_id)?;
    let mut stmt = conn.prepare(
        "SELECT i.* FROM iocs i
         JOIN list_iocs li ON li.ioc_id = i.id
         WHERE li.list_id = ?1
         ORDER BY i.value LIMIT ?2 OFFSET ?3",
    )?;
    let rows = stmt.query_map(params![list_id, limit as i64, offset as i64], row_to_ioc)?;
    Ok((rows.collect::<rusqlite::Result<_>>()?, total))
}

pub fn total_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM iocs", [], |r| r.get(0))?)
}

// --- memberships ---

/// Insert a membership row. Idempotent: re-adding an existing member is a
/// no-op and returns false.
pub fn add_membership(
    conn: &Connection,
    list_id: i64,
    ioc_id: i64,
    added_by: &str,
) -> Result<bool> {
    let n = conn.execute(
        "INSERT INTO list_iocs (list_id, ioc_id, added_by, added_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(list_id, ioc_id) DO NOTHING",
        params![list_id, ioc_id, added_by, now()],
    )?;
    Ok(n > 0)
}

pub fn remove_membership(conn: &Connection, list_id: i64, ioc_id: i64) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM list_iocs WHERE list_id = ?1 AND ioc_id = ?2",
        [list_id, ioc_id],
    )?;
    Ok(n > 0)
}

/// Slugs of every list this IOC belongs to, with list ids.
pub fn memberships(conn: &Connection, ioc_id: i64) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.slug FROM lists l
         JOIN list_iocs li ON li.list_id = l.id
         WHERE li.ioc_id = ?1 ORDER BY l.slug",
    )?;
    let rows = stmt.query_map([ioc_id], |r| Ok((r.get(0)?, r.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

// --- audit log ---

/// Append one audit entry. Always called within the same transaction as the
/// mutation it records, so the log is never missing a visible event.
pub fn append_audit(
    conn: &Connection,
    ioc_id: i64,
    action: AuditAction,
    list_id: Option<i64>,
    content: Option<&str>,
    performed_by: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO ioc_audit (ioc_id, action, list_id, content, performed_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![ioc_id, action, list_id, content, performed_by, now()],
    )?;
    Ok(())
}

/// Full history for one IOC, oldest first.
pub fn audit_history(conn: &Connection, ioc_id: i64) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM ioc_audit WHERE ioc_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt.query_map([ioc_id], row_to_audit)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Most recent comment contents for one IOC, newest first.
pub fn recent_comments(conn: &Connection, ioc_id: i64, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT content FROM ioc_audit
         WHERE ioc_id = ?1 AND action = 'comment' AND content IS NOT NULL
         ORDER BY created_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![ioc_id, limit as i64], |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// The newest audit entries across all IOCs, for the dashboard.
pub fn recent_audit(conn: &Connection, limit: usize) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM ioc_audit ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit as i64], row_to_audit)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

/// Every stored IOC. Used by exclusion preview, which must test the whole
/// corpus against a candidate pattern.
pub fn all(conn: &Connection) -> Result<Vec<Ioc>> {
    let mut stmt = conn.prepare("SELECT * FROM iocs ORDER BY value")?;
    let rows = stmt.query_map([], row_to_ioc)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}
