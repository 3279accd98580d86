//! In-process cache store

use crate::cache::traits::{CacheResult, CacheStore};
use crate::cache::{CacheEntry, CacheKey};
use std::collections::HashMap;

/// Cache store backed by a `HashMap`; entries live as long as the process
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl MemoryCacheStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, key: &CacheKey) -> CacheResult<Option<CacheEntry>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, entry: &CacheEntry) -> CacheResult<()> {
        self.entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&mut self, key: &CacheKey) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&mut self) -> CacheResult<usize> {
        let count = self.entries.len();
        self.entries.clear();
        Ok(count)
    }

    fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.len())
    }
}
