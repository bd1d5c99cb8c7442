//! Consistent-hash ring with virtual nodes
//!
//! Each peer is placed on the ring `replicas` times at
//! `hash("{i}{peer}")`. A key belongs to the first virtual node clockwise
//! from `hash(key)`, so adding or removing one peer only moves the keys
//! adjacent to its virtual nodes.

use ahash::AHashMap;
use xxhash_rust::xxh32::xxh32;

/// Seed of the ring hash
///
/// Every node in a cluster must hash with the same function and seed or
/// they disagree on key ownership; this is fixed, not configurable.
pub const RING_SEED: u32 = 0;

/// Virtual nodes per peer when none is configured
pub const DEFAULT_REPLICAS: usize = 50;

/// Hash function placing keys and virtual nodes on the ring
pub type HashFn = fn(&[u8]) -> u32;

/// Canonical ring hash: xxHash32 seeded with [`RING_SEED`]
pub fn ring_hash(data: &[u8]) -> u32 {
    xxh32(data, RING_SEED)
}

/// Consistent-hash ring mapping keys to peer ids
#[derive(Clone)]
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Sorted virtual node positions
    keys: Vec<u32>,
    owners: AHashMap<u32, String>,
}

impl HashRing {
    /// Create an empty ring using [`ring_hash`]
    pub fn new(replicas: usize) -> Self {
        Self::with_hash(replicas, ring_hash)
    }

    /// Create an empty ring with a custom hash function
    pub fn with_hash(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            keys: Vec::new(),
            owners: AHashMap::new(),
        }
    }

    /// Place peers on the ring
    ///
    /// Adding a peer twice places it twice; de-duplicate before calling.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let hash = (self.hash)(format!("{}{}", i, peer).as_bytes());
                self.keys.push(hash);
                self.owners.insert(hash, peer.to_string());
            }
        }
        self.keys.sort_unstable();
    }

    /// Find the peer owning `key`, or `None` if the ring is empty
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = self.keys.partition_point(|&k| k < hash);
        let position = self.keys[idx % self.keys.len()];
        self.owners.get(&position).map(String::as_str)
    }

    /// Check if no peer has been added
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of virtual nodes
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Virtual nodes per peer
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Distinct peers on the ring, sorted
    pub fn peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.owners.values().cloned().collect();
        peers.sort();
        peers.dedup();
        peers
    }
}
