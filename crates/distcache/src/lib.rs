//! # distcache
//!
//! Distributed read-through cache. Every node keeps one bounded LRU per named
//! group; a miss is answered by the peer that owns the key on the
//! consistent-hash ring, or by the group's loader when this node owns it.
//!
//! ## Get protocol
//! 1. Local cache hit: return it
//! 2. Miss: join or start the key's in-flight fetch
//! 3. Remote owner: fetch over HTTP within the group's peer budget
//! 4. Local owner (or no peers): call the loader
//! 5. Populate the local cache with whatever succeeded
//!
//! ```no_run
//! use std::sync::Arc;
//! use distcache::{HttpPool, LoadError, Registry};
//!
//! # async fn run() -> distcache::Result<()> {
//! let pool = Arc::new(HttpPool::new("http://10.0.0.1:8001"));
//! pool.set_peers(["http://10.0.0.1:8001", "http://10.0.0.2:8001"])?;
//!
//! let registry = Registry::with_peers(pool);
//! let scores = registry.register_group("scores", 1024, |key: &str| {
//!     Ok::<_, LoadError>(format!("score of {}", key).into_bytes())
//! })?;
//!
//! let value = scores.get("alice").await?;
//! assert_eq!(value.as_slice(), b"score of alice");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod byteview;
mod consistenthash;
mod error;
mod group;
pub mod http;
mod peers;
mod registry;
mod singleflight;
mod stats;

pub use byteview::ByteView;
pub use distlru::{CacheStats, CacheStatsSnapshot};
pub use consistenthash::{ring_hash, HashFn, HashRing, DEFAULT_REPLICAS, RING_SEED};
pub use error::{Error, Result};
pub use group::{
    Group, GroupOptions, LoadError, Loader, PeerFailurePolicy, DEFAULT_PEER_TIMEOUT,
};
pub use http::{peer_router, HttpPeer, HttpPool, DEFAULT_BASE_PATH};
pub use peers::{PeerGetter, PeerPicker};
pub use registry::Registry;
pub use stats::{GroupStats, GroupStatsSnapshot};
