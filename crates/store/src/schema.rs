//! SQLite schema DDL.

use rusqlite::Connection;

use crate::StoreError;

/// Schema version recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

/// DDL replayed on every open; all statements are idempotent.
///
/// `seq` is the insertion order. Listings sort on it rather than on
/// `created_at` so two uploads within the same clock tick keep their order.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS bundles (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        platform TEXT NOT NULL,
        name TEXT NOT NULL,
        bundle_id TEXT NOT NULL,
        version TEXT NOT NULL,
        build TEXT NOT NULL,
        size_bytes INTEGER NOT NULL DEFAULT 0,
        changelog TEXT NOT NULL DEFAULT '',
        downloads INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );",
    "CREATE INDEX IF NOT EXISTS idx_bundles_group
        ON bundles(bundle_id, platform, version, seq);",
];

/// Applies connection pragmas and creates missing tables.
pub(crate) fn init(conn: &Connection) -> Result<(), StoreError> {
    // `journal_mode` reports the resulting mode as a row; in-memory
    // databases answer "memory".
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")?;

    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }

    let current: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if current < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        tracing::debug!(from = current, to = SCHEMA_VERSION, "schema version updated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        init(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn group_index_exists() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_bundles_group';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
