//! ConcurrentCache: one exclusive lock around one LRU

use std::borrow::Borrow;
use std::hash::Hash;
use parking_lot::Mutex;

use crate::error::Result;
use crate::lru::LruCache;
use crate::stats::CacheStats;

/// Thread-safe LRU facade
///
/// Every operation takes the lock for its full duration, including the
/// recency update on `get`, so the LRU is never observed half-updated.
pub struct ConcurrentCache<K, V> {
    /// LRU holding the entries
    lru: Mutex<LruCache<K, V>>,

    /// Cache statistics
    stats: CacheStats,
}

impl<K, V> ConcurrentCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries
    ///
    /// The LRU is built here so a bad capacity is reported to the caller
    /// instead of surfacing on the first write.
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            lru: Mutex::new(LruCache::new(capacity)?),
            stats: CacheStats::new(),
        })
    }

    /// Insert or update a value
    pub fn add(&self, key: K, value: V) {
        let mut lru = self.lru.lock();
        if lru.add(key, value).is_some() {
            self.stats.record_eviction();
        }
        self.stats.record_insert();
    }

    /// Get a copy of a value, marking it as most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut lru = self.lru.lock();
        match lru.get(key) {
            Some(value) => {
                self.stats.record_hit();
                Some(value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Get a copy of a value without touching recency or statistics
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lru.lock().peek(key).cloned()
    }

    /// Remove a value
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lru.lock().remove(key)
    }

    /// Evict the least recently used entry
    pub fn remove_oldest(&self) -> Option<(K, V)> {
        let evicted = self.lru.lock().remove_oldest();
        if evicted.is_some() {
            self.stats.record_eviction();
        }
        evicted
    }

    /// Get current number of entries
    pub fn len(&self) -> usize {
        self.lru.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.lru.lock().is_empty()
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.lru.lock().capacity()
    }

    /// Keys from most to least recently used, taken under one lock
    pub fn keys(&self) -> Vec<K> {
        self.lru.lock().keys().cloned().collect()
    }

    /// Drop every entry and reset statistics
    pub fn clear(&self) {
        self.lru.lock().clear();
        self.stats.reset();
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_cache_rejects_zero_capacity() {
        let result = ConcurrentCache::<String, Vec<u8>>::new(0);
        assert_eq!(result.err(), Some(Error::InvalidCapacity(0)));
    }

    #[test]
    fn test_cache_empty_get() {
        let cache = ConcurrentCache::<String, Vec<u8>>::new(4).unwrap();

        assert_eq!(cache.get(&"missing".to_string()), None);
        assert_eq!(cache.stats().misses(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_hit() {
        let cache = ConcurrentCache::new(10).unwrap();

        cache.add("k".to_string(), b"test data".to_vec());

        assert_eq!(cache.get(&"k".to_string()), Some(b"test data".to_vec()));
        assert_eq!(cache.get(&"k".to_string()), Some(b"test data".to_vec()));
        assert_eq!(cache.stats().hits(), 2);
        assert_eq!(cache.stats().inserts(), 1);
    }

    #[test]
    fn test_cache_eviction() {
        let cache = ConcurrentCache::new(2).unwrap();

        cache.add(0, "data 0");
        cache.add(1, "data 1");
        cache.add(2, "data 2");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&0), None);
        assert_eq!(cache.stats().evictions(), 1);
        assert_eq!(cache.keys(), vec![2, 1]);
    }

    #[test]
    fn test_cache_remove_and_oldest() {
        let cache = ConcurrentCache::new(3).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(3, "c");

        assert_eq!(cache.remove(&2), Some("b"));
        assert_eq!(cache.remove_oldest(), Some((1, "a")));
        assert_eq!(cache.keys(), vec![3]);
    }

    #[test]
    fn test_cache_clear() {
        let cache = ConcurrentCache::new(10).unwrap();

        cache.add(0, "data 0");
        cache.add(1, "data 1");
        cache.get(&0);
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().hits(), 0);
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn test_cache_concurrent_invariants() {
        let cache = Arc::new(ConcurrentCache::new(16).unwrap());
        let mut handles = Vec::new();

        for t in 0..8u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for i in 0..2_000u64 {
                    let key = (t * 7 + i) % 64;
                    if i % 3 == 0 {
                        cache.get(&key);
                    } else {
                        cache.add(key, i);
                    }

                    let keys = cache.keys();
                    assert!(keys.len() <= 16);
                    let unique: HashSet<_> = keys.iter().collect();
                    assert_eq!(unique.len(), keys.len());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
        assert_eq!(cache.keys().len(), cache.len());
    }
}
