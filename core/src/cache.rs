//! In-process result caches
//!
//! Two policies:
//! - [`LogCache`]: keyed by log id, LRU-bounded, never expires (uploaded logs
//!   are immutable)
//! - [`TtlCache`]: short-lived memoization for values that grow over time
//!   (upload listings, assembled datasets)
//!
//! Both are read-through: the value is computed outside the lock, so two
//! threads missing the same key at once may both compute it. The last
//! writer wins and both results are equivalent.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use lru::LruCache;

use crate::error::FightInvalid;
use crate::model::{LogId, RowSet};

/// Memoized per-log outcome. Transport failures are never stored.
pub type CachedLog = Result<Arc<RowSet>, FightInvalid>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves the map itself intact
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct LogCache {
    entries: Mutex<LruCache<LogId, CachedLog>>,
}

impl LogCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, id: &LogId) -> Option<CachedLog> {
        lock(&self.entries).get(id).cloned()
    }

    pub fn insert(&self, id: LogId, value: CachedLog) {
        lock(&self.entries).put(id, value);
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct TtlEntry<V> {
    inserted: Instant,
    value: V,
}

/// Time-bounded cache with an entry cap. When full, the oldest entry goes.
pub struct TtlCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<K, TtlEntry<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Return the cached value or compute and store it. Errors are not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) {
        lock(&self.entries).remove(key);
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut entries = lock(&self.entries);
        let expired = match entries.get(key) {
            Some(entry) if now.duration_since(entry.inserted) < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn insert_at(&self, key: K, value: V, now: Instant) {
        let mut entries = lock(&self.entries);
        entries.retain(|_, e| now.duration_since(e.inserted) < self.ttl);
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(key, TtlEntry { inserted: now, value });
    }
}
