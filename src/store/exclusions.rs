//! Exclusion table queries.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{Exclusion, ExclusionType};

use super::now;

fn row_to_exclusion(row: &Row<'_>) -> rusqlite::Result<Exclusion> {
    Ok(Exclusion {
        id: row.get("id")?,
        value: row.get("value")?,
        excl_type: row.get("excl_type")?,
        reason: row.get("reason")?,
        is_builtin: row.get("is_builtin")?,
        created_at: row.get("created_at")?,
    })
}

/// Every rule, built-in and custom, ordered by value.
pub fn all(conn: &Connection) -> Result<Vec<Exclusion>> {
    let mut stmt = conn.prepare("SELECT * FROM exclusions ORDER BY value")?;
    let rows = stmt.query_map([], row_to_exclusion)?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

pub fn get_by_value(conn: &Connection, value: &str) -> Result<Option<Exclusion>> {
    Ok(conn
        .query_row(
            "SELECT * FROM exclusions WHERE value = ?1",
            [value],
            row_to_exclusion,
        )
        .optional()?)
}

pub fn insert(
    conn: &Connection,
    value: &str,
    excl_type: ExclusionType,
    reason: Option<&str>,
    is_builtin: bool,
) -> Result<Exclusion> {
    conn.execute(
        "INSERT INTO exclusions (value, excl_type, reason, is_builtin, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![value, excl_type, reason, is_builtin, now()],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row("SELECT * FROM exclusions WHERE id = ?1", [id], row_to_exclusion)
        .map_err(Into::into)
}

/// Delete a rule by value. The caller has already rejected builtins.
pub fn delete_by_value(conn: &Connection, value: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM exclusions WHERE value = ?1", [value])?;
    Ok(n > 0)
}

pub fn builtin_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM exclusions WHERE is_builtin = 1",
        [],
        |r| r.get(0),
    )?)
}

pub fn total_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM exclusions", [], |r| r.get(0))?)
}
