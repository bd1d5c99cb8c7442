//! # distlru
//!
//! Bounded LRU cache used by every distcache group.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to slab slot (O(1))
//! - **LRU List**: Doubly-linked list threaded through the slab (O(1) touch/evict)
//! - **ConcurrentCache**: one exclusive lock around one `LruCache`
//!
//! Capacity is an entry count and is validated when the cache is built.

#![warn(missing_docs)]

mod cache;
mod error;
mod lru;
mod stats;

pub use cache::ConcurrentCache;
pub use error::{Error, Result};
pub use lru::{Keys, LruCache};
pub use stats::{CacheStats, CacheStatsSnapshot};
