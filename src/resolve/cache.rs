use crate::model::ResourceType;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Bounded id → key cache shared by every draft of a sync run
///
/// Entries are evicted least-recently-used once `capacity` is reached.
/// Lookups and inserts take an internal lock, so one cache can be shared
/// between concurrently running drafts and between chained `sync` calls.
/// Nothing is invalidated automatically: keys of resources created during a
/// run only become resolvable if the caller seeds them.
pub struct ReferenceCache {
    entries: Mutex<LruCache<(ResourceType, String), String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
    pub capacity: usize,
}

impl ReferenceCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<(ResourceType, String), String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Key cached for `id`, marking the entry as recently used
    pub fn get(&self, resource_type: ResourceType, id: &str) -> Option<String> {
        let found = self.lock().get(&(resource_type, id.to_string())).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, resource_type: ResourceType, id: impl Into<String>, key: impl Into<String>) {
        self.lock().put((resource_type, id.into()), key.into());
    }

    /// Pre-seed entries before a run, e.g. keys of resources created earlier
    pub fn seed<I, S>(&self, resource_type: ResourceType, pairs: I)
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut entries = self.lock();
        for (id, key) in pairs {
            entries.put((resource_type, id.into()), key.into());
        }
    }

    pub fn contains(&self, resource_type: ResourceType, id: &str) -> bool {
        self.lock().contains(&(resource_type, id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}
