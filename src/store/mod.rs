//! SQLite persistence.
//!
//! A [`Store`] wraps one rusqlite connection behind a mutex. Query logic
//! lives in per-entity modules (`lists`, `iocs`, `exclusions`) as free
//! functions over `&Connection`, so service code can compose them inside a
//! single transaction.
//!
//! The schema is created idempotently at open. Uniqueness is enforced at
//! the storage layer: `iocs.value`, `lists.slug`, `exclusions.value`, and
//! the `(list_id, ioc_id)` membership pair all carry UNIQUE constraints,
//! which are the authoritative guard against concurrent duplicates.

pub mod exclusions;
pub mod iocs;
pub mod lists;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS lists (
    id          INTEGER PRIMARY KEY,
    slug        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    description TEXT,
    list_type   TEXT NOT NULL DEFAULT 'mixed',
    tags        TEXT NOT NULL DEFAULT '[]',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS iocs (
    id         INTEGER PRIMARY KEY,
    value      TEXT NOT NULL UNIQUE,
    ioc_type   TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS list_iocs (
    id       INTEGER PRIMARY KEY,
    list_id  INTEGER NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
    ioc_id   INTEGER NOT NULL REFERENCES iocs(id) ON DELETE CASCADE,
    added_by TEXT,
    added_at TEXT NOT NULL,
    UNIQUE (list_id, ioc_id)
);

CREATE TABLE IF NOT EXISTS exclusions (
    id         INTEGER PRIMARY KEY,
    value      TEXT NOT NULL UNIQUE,
    excl_type  TEXT NOT NULL,
    reason     TEXT,
    is_builtin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ioc_audit (
    id           INTEGER PRIMARY KEY,
    ioc_id       INTEGER NOT NULL REFERENCES iocs(id) ON DELETE CASCADE,
    action       TEXT NOT NULL,
    list_id      INTEGER REFERENCES lists(id) ON DELETE SET NULL,
    content      TEXT,
    performed_by TEXT,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_list_iocs_ioc ON list_iocs(ioc_id);
CREATE INDEX IF NOT EXISTS idx_ioc_audit_ioc ON ioc_audit(ioc_id);
";

/// Handle to the embedded database. `Clone` and thread-safe; the single
/// connection is serialized behind a mutex, which is adequate for the
/// request-per-operation concurrency this daemon sees.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) a file-backed store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create data dir {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store. Used by tests and `edld serve --ephemeral`.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)
            .context("failed to apply database schema")?;
        Ok(())
    }

    /// Run read-only or single-statement work against the connection.
    ///
    /// # Errors
    ///
    /// Propagates any error from the closure.
    pub fn with<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run work inside a transaction; commits on `Ok`, rolls back on `Err`.
    ///
    /// # Errors
    ///
    /// Propagates any error from the closure or from commit.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit().context("transaction commit failed")?;
        Ok(out)
    }
}

/// Current UTC timestamp in the fixed textual form stored in the database.
pub fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn schema_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("edld.db");
        {
            let _store = Store::open(&path).unwrap();
        }
        // Reopening reapplies the schema without error.
        let _store = Store::open(&path).unwrap();
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = Store::memory().unwrap();
        let res: Result<()> = store.transaction(|tx| {
            tx.execute(
                "INSERT INTO iocs (value, ioc_type, created_at, updated_at)
                 VALUES ('x.com', 'domain', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [],
            )?;
            anyhow::bail!("boom");
        });
        assert!(res.is_err());
        let count: i64 = store
            .with(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM iocs", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
