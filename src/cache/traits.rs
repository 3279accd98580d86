//! Cache store traits and error types
//!
//! This module defines the trait interface for cache backends and
//! associated error types.

use crate::cache::{CacheEntry, CacheKey};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt cache entry {key}: {message}")]
    Corrupt { key: String, message: String },

    #[error("Cache lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for cache backend implementations
///
/// Stores hold entries as-is; expiry is decided by `CrawlCache`, which owns
/// the clock. Implementations must replace an existing entry atomically on
/// `save`.
pub trait CacheStore: Send {
    /// Loads the entry stored under `key`, expired or not
    fn load(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>>;

    /// Stores `entry`, replacing any entry with the same key
    fn save(&mut self, entry: &CacheEntry) -> CacheResult<()>;

    /// Removes the entry under `key`, returning whether one existed
    fn remove(&mut self, key: &CacheKey) -> CacheResult<bool>;

    /// Removes every entry, returning how many were removed
    fn clear(&mut self) -> CacheResult<usize>;

    /// Number of stored entries
    fn len(&self) -> CacheResult<usize>;

    /// Returns true if the store holds no entries
    fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}
