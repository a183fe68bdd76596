//! List table queries.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::{BlockList, ListType};

use super::now;

fn row_to_list(row: &Row<'_>) -> rusqlite::Result<BlockList> {
    let tags: String = row.get("tags")?;
    Ok(BlockList {
        id: row.get("id")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        description: row.get("description")?,
        list_type: row.get("list_type")?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Insert a new list. The caller has already checked slug uniqueness inside
/// the same transaction; the UNIQUE constraint is the backstop.
pub fn insert(
    conn: &Connection,
    slug: &str,
    name: &str,
    description: Option<&str>,
    list_type: ListType,
    tags: &[String],
) -> Result<BlockList> {
    let ts = now();
    conn.execute(
        "INSERT INTO lists (slug, name, description, list_type, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            slug,
            name,
            description,
            list_type,
            serde_json::to_string(tags)?,
            ts
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_by_id(conn, id)?.ok_or_else(|| anyhow::anyhow!("just-inserted list missing"))
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<BlockList>> {
    Ok(conn
        .query_row("SELECT * FROM lists WHERE id = ?1", [id], row_to_list)
        .optional()?)
}

pub fn get_by_slug(conn: &Connection, slug: &str) -> Result<Option<BlockList>> {
    Ok(conn
        .query_row("SELECT * FROM lists WHERE slug = ?1", [slug], row_to_list)
        .optional()?)
}

/// All lists ordered by name, each with its IOC count.
pub fn all_with_counts(conn: &Connection) -> Result<Vec<(BlockList, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT l.*, (SELECT COUNT(*) FROM list_iocs li WHERE li.list_id = l.id) AS ioc_count
         FROM lists l ORDER BY l.name",
    )?;
    let rows = stmt.query_map([], |row| Ok((row_to_list(row)?, row.get("ioc_count")?)))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}

pub fn ioc_count(conn: &Connection, list_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM list_iocs WHERE list_id = ?1",
        [list_id],
        |r| r.get(0),
    )?)
}

/// Apply a metadata update. `slug` changes only on rename.
pub fn update(
    conn: &Connection,
    id: i64,
    slug: &str,
    name: &str,
    description: Option<&str>,
    tags: &[String],
) -> Result<()> {
    conn.execute(
        "UPDATE lists SET slug = ?2, name = ?3, description = ?4, tags = ?5, updated_at = ?6
         WHERE id = ?1",
        params![id, slug, name, description, serde_json::to_string(tags)?, now()],
    )?;
    Ok(())
}

/// Delete a list by slug; membership rows cascade. Returns false if absent.
pub fn delete_by_slug(conn: &Connection, slug: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM lists WHERE slug = ?1", [slug])?;
    Ok(n > 0)
}

/// Canonical IOC values for a list, lexicographically sorted. This is the
/// EDL data contract: stable across repeated calls with no membership change.
pub fn edl_values(conn: &Connection, list_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT i.value FROM iocs i
         JOIN list_iocs li ON li.ioc_id = i.id
         WHERE li.list_id = ?1
         ORDER BY i.value",
    )?;
    let rows = stmt.query_map([list_id], |r| r.get(0))?;
    Ok(rows.collect::<rusqlite::Result<_>>()?)
}
