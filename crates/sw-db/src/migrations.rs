//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use sw_core::{Error, Result};

/// V1: segment table and its item lookup index.
const V1_INITIAL: &str = r#"
CREATE TABLE segments (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id    TEXT NOT NULL,
    start_secs REAL NOT NULL,
    end_secs   REAL NOT NULL,
    created_at TEXT NOT NULL,
    CHECK (start_secs < end_secs)
);

CREATE INDEX idx_segments_item ON segments(item_id, start_secs);
"#;

/// V2: optional display label for each segment.
const V2_REASON: &str = r#"
ALTER TABLE segments ADD COLUMN reason TEXT;
"#;

/// All migrations in order. Each entry is `(version, sql)`.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_REASON)];

/// Run all pending migrations against the given connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::debug!(version, "Applied database migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        // second call is a no-op
        run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_v1_database_gains_reason_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (
                version    INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .unwrap();
        conn.execute_batch(V1_INITIAL).unwrap();
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO segments (item_id, start_secs, end_secs, created_at)
             VALUES ('a', 1.0, 2.0, 'then')",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let reason: Option<String> = conn
            .query_row("SELECT reason FROM segments WHERE item_id = 'a'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(reason, None);
    }

    #[test]
    fn test_check_constraint_rejects_inverted_range() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO segments (item_id, start_secs, end_secs, created_at)
             VALUES ('a', 50.0, 40.0, 'now')",
            [],
        );
        assert!(result.is_err());
    }
}
