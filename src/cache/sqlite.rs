//! SQLite cache store
//!
//! Persists aggregated results so they survive process restarts. Each
//! entry is written inside a single transaction, so readers never observe a
//! partially written entry.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::cache::{CacheEntry, CacheKey};
use crate::output::{AggregatedResult, PageStat};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite cache backend
pub struct SqliteCacheStore {
    conn: Connection,
}

impl SqliteCacheStore {
    /// Opens (or creates) the cache database at `path`
    pub fn new(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_urls(&self, key: &CacheKey) -> CacheResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM cache_urls WHERE cache_key = ?1 ORDER BY position")?;
        let urls = stmt
            .query_map(params![key.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn load_pages(&self, key: &CacheKey) -> CacheResult<Vec<PageStat>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, url_count, failure FROM cache_pages WHERE cache_key = ?1 ORDER BY position",
        )?;
        let pages = stmt
            .query_map(params![key.as_str()], |row| {
                Ok(PageStat {
                    url: row.get(0)?,
                    url_count: row.get::<_, i64>(1)? as usize,
                    failure: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }
}

/// Row of `cache_entries` before the child tables are attached
struct EntryRow {
    created_at: String,
    expires_at: String,
    raw_count: i64,
    unique_count: i64,
    total_pages: i64,
    failed_pages: i64,
    probe_truncated: bool,
}

fn parse_timestamp(key: &CacheKey, value: &str) -> CacheResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            message: format!("bad timestamp '{}': {}", value, e),
        })
}

impl CacheStore for SqliteCacheStore {
    fn load(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT created_at, expires_at, raw_count, unique_count, total_pages,
                        failed_pages, probe_truncated
                 FROM cache_entries WHERE cache_key = ?1",
                params![key.as_str()],
                |row| {
                    Ok(EntryRow {
                        created_at: row.get(0)?,
                        expires_at: row.get(1)?,
                        raw_count: row.get(2)?,
                        unique_count: row.get(3)?,
                        total_pages: row.get(4)?,
                        failed_pages: row.get(5)?,
                        probe_truncated: row.get(6)?,
                    })
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let urls = self.load_urls(key)?;
        if urls.len() as i64 != row.unique_count {
            return Err(CacheError::Corrupt {
                key: key.to_string(),
                message: format!(
                    "expected {} urls, found {}",
                    row.unique_count,
                    urls.len()
                ),
            });
        }

        let result = AggregatedResult {
            urls,
            raw_count: row.raw_count as usize,
            unique_count: row.unique_count as usize,
            total_pages: row.total_pages as usize,
            failed_pages: row.failed_pages as usize,
            probe_truncated: row.probe_truncated,
            pages: self.load_pages(key)?,
            created_at: parse_timestamp(key, &row.created_at)?,
        };

        Ok(Some(CacheEntry {
            key: key.clone(),
            result,
            expires_at: parse_timestamp(key, &row.expires_at)?,
        }))
    }

    fn save(&mut self, entry: &CacheEntry) -> CacheResult<()> {
        let key = entry.key.as_str();
        let result = &entry.result;
        let tx = self.conn.transaction()?;

        // Child rows go with the parent via ON DELETE CASCADE
        tx.execute("DELETE FROM cache_entries WHERE cache_key = ?1", params![key])?;
        tx.execute(
            "INSERT INTO cache_entries (cache_key, created_at, expires_at, raw_count,
                                        unique_count, total_pages, failed_pages, probe_truncated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                key,
                result.created_at.to_rfc3339(),
                entry.expires_at.to_rfc3339(),
                result.raw_count as i64,
                result.unique_count as i64,
                result.total_pages as i64,
                result.failed_pages as i64,
                result.probe_truncated,
            ],
        )?;

        {
            let mut insert_url = tx.prepare(
                "INSERT INTO cache_urls (cache_key, position, url) VALUES (?1, ?2, ?3)",
            )?;
            for (position, url) in result.urls.iter().enumerate() {
                insert_url.execute(params![key, position as i64, url])?;
            }

            let mut insert_page = tx.prepare(
                "INSERT INTO cache_pages (cache_key, position, url, url_count, failure)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, page) in result.pages.iter().enumerate() {
                insert_page.execute(params![
                    key,
                    position as i64,
                    page.url,
                    page.url_count as i64,
                    page.failure,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn remove(&mut self, key: &CacheKey) -> CacheResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM cache_entries WHERE cache_key = ?1",
            params![key.as_str()],
        )?;
        Ok(removed > 0)
    }

    fn clear(&mut self) -> CacheResult<usize> {
        let removed = self.conn.execute("DELETE FROM cache_entries", [])?;
        Ok(removed)
    }

    fn len(&self) -> CacheResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
