//! Database schema for the persistent cache store

/// SQL schema for the cache database
pub const SCHEMA_SQL: &str = r#"
-- One row per cached aggregated result
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_key TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    raw_count INTEGER NOT NULL,
    unique_count INTEGER NOT NULL,
    total_pages INTEGER NOT NULL,
    failed_pages INTEGER NOT NULL,
    probe_truncated INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);

-- Unique item URLs in first-occurrence order
CREATE TABLE IF NOT EXISTS cache_urls (
    cache_key TEXT NOT NULL REFERENCES cache_entries(cache_key) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    PRIMARY KEY (cache_key, position)
);

-- Per-listing-page statistics in page order
CREATE TABLE IF NOT EXISTS cache_pages (
    cache_key TEXT NOT NULL REFERENCES cache_entries(cache_key) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    url_count INTEGER NOT NULL,
    failure TEXT,
    PRIMARY KEY (cache_key, position)
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["cache_entries", "cache_urls", "cache_pages"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
