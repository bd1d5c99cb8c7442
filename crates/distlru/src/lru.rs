//! LRU (Least Recently Used) cache implementation
//!
//! Entries live in a slab of nodes linked into a recency list: head is the
//! most recently used entry, tail is the next eviction victim. Freed slots
//! are recycled through a free list so steady-state inserts do not allocate.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use ahash::RandomState;

use crate::error::{Error, Result};

/// Node in the LRU doubly-linked list
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU cache with fixed capacity
///
/// Invariant: `map.len()` equals the number of linked nodes and never
/// exceeds `capacity`.
pub struct LruCache<K, V> {
    map: HashMap<K, usize, RandomState>,
    nodes: Vec<Option<Node<K, V>>>,
    head: Option<usize>,
    tail: Option<usize>,
    free_list: Vec<usize>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache holding at most `capacity` entries
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` - if `capacity` is zero
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        Ok(Self {
            map: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            nodes: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            free_list: Vec::new(),
            capacity,
        })
    }

    /// Get a value and mark it as most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Get a value without touching its recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.nodes[idx].as_ref().map(|node| &node.value)
    }

    /// Insert or update an entry and mark it as most recently used
    ///
    /// When a new key arrives at a full cache the least recently used entry
    /// is evicted first and handed back to the caller.
    pub fn add(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(node) = &mut self.nodes[idx] {
                node.value = value;
            }
            self.move_to_front(idx);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity {
            self.remove_oldest()
        } else {
            None
        };

        let idx = self.alloc_node();
        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            prev: None,
            next: self.head,
        });

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }

        self.map.insert(key, idx);
        evicted
    }

    /// Remove a key from the cache, leaving the order of the others intact
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        self.free_node(idx);
        self.nodes[idx].take().map(|node| node.value)
    }

    /// Evict the least recently used entry
    pub fn remove_oldest(&mut self) -> Option<(K, V)> {
        let tail_idx = self.tail?;
        self.unlink(tail_idx);
        self.free_node(tail_idx);
        let node = self.nodes[tail_idx].take()?;
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Get the current size of the cache
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free_list.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate keys from most to least recently used
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            nodes: &self.nodes,
            cursor: self.head,
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }

        self.unlink(idx);

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = self.head;
        }

        if let Some(head_idx) = self.head {
            if let Some(head) = &mut self.nodes[head_idx] {
                head.prev = Some(idx);
            }
        }

        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match &self.nodes[idx] {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = &mut self.nodes[prev_idx] {
                    prev_node.next = next;
                }
            }
            None => self.head = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = &mut self.nodes[next_idx] {
                    next_node.prev = prev;
                }
            }
            None => self.tail = prev,
        }

        if let Some(node) = &mut self.nodes[idx] {
            node.prev = None;
            node.next = None;
        }
    }

    fn alloc_node(&mut self) -> usize {
        if let Some(idx) = self.free_list.pop() {
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(None);
            idx
        }
    }

    fn free_node(&mut self, idx: usize) {
        self.free_list.push(idx);
    }
}

/// Iterator over cache keys in recency order, see [`LruCache::keys`]
pub struct Keys<'a, K, V> {
    nodes: &'a [Option<Node<K, V>>],
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes[self.cursor?].as_ref()?;
        self.cursor = node.next;
        Some(&node.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_of(cache: &LruCache<i32, &str>) -> Vec<i32> {
        cache.keys().copied().collect()
    }

    #[test]
    fn test_lru_zero_capacity() {
        assert_eq!(
            LruCache::<i32, i32>::new(0).err(),
            Some(Error::InvalidCapacity(0))
        );
    }

    #[test]
    fn test_lru_basic() {
        let mut cache = LruCache::new(2).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");

        assert_eq!(cache.get(&1), Some(&"a"));
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = LruCache::new(2).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");
        let evicted = cache.add(3, "c");

        assert_eq!(evicted, Some((1, "a")));
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(cache.get(&3), Some(&"c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_survivors_are_most_recent() {
        let mut cache = LruCache::new(5).unwrap();

        for i in 0..12 {
            cache.add(i, "v");
            assert!(cache.len() <= 5);
        }

        let mut survivors = keys_of(&cache);
        survivors.sort();
        assert_eq!(survivors, vec![7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_lru_get_promotes() {
        let mut cache = LruCache::new(2).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");
        for _ in 0..10 {
            cache.get(&1);
        }
        cache.add(3, "c"); // Should evict 2

        assert_eq!(cache.peek(&1), Some(&"a"));
        assert_eq!(cache.peek(&2), None);
        assert_eq!(cache.peek(&3), Some(&"c"));
    }

    #[test]
    fn test_lru_peek_keeps_order() {
        let mut cache = LruCache::new(2).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");
        for _ in 0..10 {
            assert_eq!(cache.peek(&1), Some(&"a"));
        }
        cache.add(3, "c"); // 1 was never promoted

        assert_eq!(cache.peek(&1), None);
        assert_eq!(keys_of(&cache), vec![3, 2]);
    }

    #[test]
    fn test_lru_get_miss_leaves_order() {
        let mut cache = LruCache::new(3).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");
        assert_eq!(cache.get(&9), None);

        assert_eq!(keys_of(&cache), vec![2, 1]);
    }

    #[test]
    fn test_lru_remove() {
        let mut cache = LruCache::new(3).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");
        cache.add(3, "c");
        cache.get(&2);

        assert_eq!(cache.remove(&2), Some("b"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&2), None);
        assert_eq!(keys_of(&cache), vec![3, 1]);
    }

    #[test]
    fn test_lru_remove_missing_is_noop() {
        let mut cache = LruCache::new(3).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");

        assert_eq!(cache.remove(&7), None);
        assert_eq!(keys_of(&cache), vec![2, 1]);
    }

    #[test]
    fn test_lru_remove_oldest() {
        let mut cache = LruCache::new(3).unwrap();
        assert_eq!(cache.remove_oldest(), None);

        cache.add(1, "a");
        cache.add(2, "b");
        cache.get(&1);

        assert_eq!(cache.remove_oldest(), Some((2, "b")));
        assert_eq!(cache.remove_oldest(), Some((1, "a")));
        assert_eq!(cache.remove_oldest(), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_slot_reuse() {
        let mut cache = LruCache::new(2).unwrap();

        for i in 0..100 {
            cache.add(i, "v");
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.nodes.len() <= 3);
        assert_eq!(keys_of(&cache), vec![99, 98]);
    }

    #[test]
    fn test_lru_clear() {
        let mut cache = LruCache::new(3).unwrap();

        cache.add(1, "a");
        cache.add(2, "b");
        cache.clear();

        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(keys_of(&cache), Vec::<i32>::new());
    }

    #[test]
    fn test_lru_overwrite() {
        let mut cache = LruCache::new(2).unwrap();

        cache.add(1, "a");
        cache.add(2, "x");
        cache.add(1, "b"); // Overwrite moves 1 to the front

        assert_eq!(cache.peek(&1), Some(&"b"));
        assert_eq!(cache.len(), 2);
        assert_eq!(keys_of(&cache), vec![1, 2]);
    }

    #[test]
    fn test_lru_single_slot() {
        let mut cache = LruCache::new(1).unwrap();

        cache.add(1, "a");
        cache.get(&1);
        cache.add(2, "b");

        assert_eq!(cache.peek(&1), None);
        assert_eq!(cache.get(&2), Some(&"b"));
        assert_eq!(keys_of(&cache), vec![2]);
    }
}
