//! Result cache for aggregated crawl runs
//!
//! Aggregated results are stored under a key derived from the target's
//! pagination configuration and its extraction rules, and expire after a
//! time-to-live. Expiry is
//! decided against an injected [`Clock`], never the system time directly.
//!
//! # Components
//!
//! - `CrawlCache`: TTL-aware front end used by the engine
//! - `CacheStore`: backend trait, with in-memory and SQLite implementations
//! - `CacheKey`: configuration-derived identity of a target

mod clock;
mod key;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use memory::MemoryCacheStore;
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteCacheStore;
pub use traits::{CacheError, CacheResult, CacheStore};

use crate::output::AggregatedResult;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

/// Longest time-to-live accepted for a cached result (ten years)
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A stored aggregated result together with its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Key the entry is stored under
    pub key: CacheKey,

    /// The cached result
    pub result: AggregatedResult,

    /// Instant from which the entry is no longer served
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Returns true once `now` has reached the expiry instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// TTL cache of aggregated results
///
/// Safe to share between concurrent runs; every operation takes the store
/// lock for its whole duration, so a reader never sees a half-written
/// entry.
pub struct CrawlCache {
    store: Mutex<Box<dyn CacheStore>>,
    clock: Arc<dyn Clock>,
}

impl CrawlCache {
    /// Creates a cache over `store` using `clock` for expiry
    pub fn new(store: Box<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(store),
            clock,
        }
    }

    /// Creates an in-memory cache on the system clock
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryCacheStore::new()), Arc::new(SystemClock))
    }

    /// The clock this cache measures expiry with
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Box<dyn CacheStore>>> {
        self.store.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Returns the unexpired result stored under `key`
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> CacheResult<Option<AggregatedResult>> {
        let mut store = self.lock()?;
        let Some(entry) = store.load(key)? else {
            return Ok(None);
        };

        if entry.is_expired(self.clock.now()) {
            tracing::debug!("Cache entry {} expired at {}", key.short(), entry.expires_at);
            store.remove(key)?;
            return Ok(None);
        }

        Ok(Some(entry.result))
    }

    /// Stores `result` under `key`, replacing any existing entry
    ///
    /// The entry expires `ttl` after the result's `created_at`; longer
    /// lifetimes are capped at [`MAX_TTL_SECS`].
    pub fn put(
        &self,
        key: &CacheKey,
        result: &AggregatedResult,
        ttl: std::time::Duration,
    ) -> CacheResult<()> {
        let ttl_secs = ttl.as_secs().min(MAX_TTL_SECS) as i64;
        let expires_at = result
            .created_at
            .checked_add_signed(Duration::seconds(ttl_secs))
            .unwrap_or(result.created_at);

        let entry = CacheEntry {
            key: key.clone(),
            result: result.clone(),
            expires_at,
        };

        self.lock()?.save(&entry)?;
        tracing::debug!("Cached {} URLs under {} until {}", result.unique_count, key.short(), expires_at);
        Ok(())
    }

    /// Removes the entry under `key`, returning whether one existed
    pub fn remove(&self, key: &CacheKey) -> CacheResult<bool> {
        self.lock()?.remove(key)
    }

    /// Removes every entry, returning how many were removed
    pub fn clear(&self) -> CacheResult<usize> {
        self.lock()?.clear()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> CacheResult<usize> {
        self.lock()?.len()
    }

    /// Returns true if no entries are stored
    pub fn is_empty(&self) -> CacheResult<bool> {
        self.lock()?.is_empty()
    }
}
