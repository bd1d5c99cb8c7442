//! Group coordinator: the read-through get protocol
//!
//! A get is answered from the local cache when possible. On a miss the
//! group's peer picker decides who owns the key: a remote owner is asked over
//! the peer boundary, otherwise the group's loader reads the source of truth.
//! Whatever comes back is written into the local cache before it is returned.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use distlru::{CacheStats, ConcurrentCache};
use tracing::{debug, warn};

use crate::byteview::ByteView;
use crate::error::{Error, Result};
use crate::peers::{PeerGetter, PeerPicker};
use crate::singleflight::SingleFlight;
use crate::stats::GroupStats;

/// Budget for one peer fetch when none is configured
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(2);

/// Failure reported by a [`Loader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The source of truth has no value for the key
    NotFound,
    /// The source of truth could not be read
    Failed(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound => write!(f, "not found"),
            LoadError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

/// Resolves a cache miss against the source of truth
///
/// Loaders run on tokio's blocking pool, so they may do blocking I/O.
pub trait Loader: Send + Sync {
    /// Produce the value for `key`
    fn load(&self, key: &str) -> std::result::Result<Vec<u8>, LoadError>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> std::result::Result<Vec<u8>, LoadError> + Send + Sync,
{
    fn load(&self, key: &str) -> std::result::Result<Vec<u8>, LoadError> {
        self(key)
    }
}

/// What a get does when the owning peer fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerFailurePolicy {
    /// Return the peer error to the caller
    #[default]
    Fail,
    /// Log the peer error and call the local loader instead
    FallbackToLoader,
}

/// Per-group settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOptions {
    /// Maximum number of cached entries
    pub capacity: usize,
    /// Budget for one peer fetch
    pub peer_timeout: Duration,
    /// Behaviour when the owning peer fails
    pub peer_failure: PeerFailurePolicy,
}

impl GroupOptions {
    /// Options with the given capacity and default peer settings
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            peer_failure: PeerFailurePolicy::default(),
        }
    }

    /// Set the peer fetch budget
    pub fn peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }

    /// Set the peer failure policy
    pub fn peer_failure(mut self, policy: PeerFailurePolicy) -> Self {
        self.peer_failure = policy;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.peer_timeout.is_zero() {
            return Err(Error::Config("peer timeout must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Handle to one named group
///
/// Cheap to clone; every clone drives the same cache and loader.
#[derive(Clone)]
pub struct Group {
    inner: Arc<GroupInner>,
}

struct GroupInner {
    name: String,
    loader: Arc<dyn Loader>,
    cache: ConcurrentCache<String, ByteView>,
    peers: Option<Arc<dyn PeerPicker>>,
    options: GroupOptions,
    stats: GroupStats,
    /// Misses on the full protocol
    loads: SingleFlight,
    /// Misses on the local-only path served to peers
    local_loads: SingleFlight,
}

impl Group {
    /// Build a group; the cache is created and its capacity checked here
    pub(crate) fn new(
        name: String,
        options: GroupOptions,
        loader: Arc<dyn Loader>,
        peers: Option<Arc<dyn PeerPicker>>,
    ) -> Result<Self> {
        options.validate()?;
        let cache = ConcurrentCache::new(options.capacity)?;

        Ok(Self {
            inner: Arc::new(GroupInner {
                name,
                loader,
                cache,
                peers,
                options,
                stats: GroupStats::new(),
                loads: SingleFlight::new(),
                local_loads: SingleFlight::new(),
            }),
        })
    }

    /// Get a value, fetching it from its owner on a miss
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        let inner = &self.inner;
        inner.stats.record_get();
        if let Some(value) = inner.lookup_cache(key) {
            return Ok(value);
        }

        inner.stats.record_load();
        let owner = Arc::clone(inner);
        let owned = key.to_string();
        let (result, joined) = inner
            .loads
            .run(key, move || async move { owner.load(&owned).await })
            .await;
        if joined {
            inner.stats.record_load_deduped();
        }
        result
    }

    /// Get a value using only the local cache and loader
    ///
    /// This is what peers reach over HTTP; it never forwards to another peer,
    /// so two nodes with different views of the ring cannot bounce a request
    /// between them.
    pub async fn get_local(&self, key: &str) -> Result<ByteView> {
        let inner = &self.inner;
        inner.stats.record_get();
        if let Some(value) = inner.lookup_cache(key) {
            return Ok(value);
        }

        inner.stats.record_load();
        let owner = Arc::clone(inner);
        let owned = key.to_string();
        let (result, joined) = inner
            .local_loads
            .run(key, move || async move {
                if let Some(value) = owner.cache.peek(owned.as_str()) {
                    return Ok(value);
                }
                owner.load_locally(&owned).await
            })
            .await;
        if joined {
            inner.stats.record_load_deduped();
        }
        result
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Group settings
    pub fn options(&self) -> &GroupOptions {
        &self.inner.options
    }

    /// Request counters
    pub fn stats(&self) -> &GroupStats {
        &self.inner.stats
    }

    /// Local cache counters
    pub fn cache_stats(&self) -> &CacheStats {
        self.inner.cache.stats()
    }

    /// Number of cached entries
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Cached value without touching recency
    pub fn peek(&self, key: &str) -> Option<ByteView> {
        self.inner.cache.peek(key)
    }

    /// Drop a cached value; the next get fetches it again
    pub fn evict(&self, key: &str) -> Option<ByteView> {
        self.inner.cache.remove(key)
    }

    /// Keys with a fetch in progress
    pub fn in_flight(&self) -> usize {
        self.inner.loads.in_flight() + self.inner.local_loads.in_flight()
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .field("cached", &self.inner.cache.len())
            .finish()
    }
}

impl GroupInner {
    fn lookup_cache(&self, key: &str) -> Option<ByteView> {
        let value = self.cache.get(key)?;
        self.stats.record_cache_hit();
        debug!("[{}] cache hit for {}", self.name, key);
        Some(value)
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        // A flight that finished just before ours started may have filled it
        if let Some(value) = self.cache.peek(key) {
            return Ok(value);
        }

        if let Some(peer) = self.peers.as_ref().and_then(|picker| picker.pick_peer(key)) {
            debug!("[{}] {} is owned by {}", self.name, key, peer.addr());
            match self.get_from_peer(peer.as_ref(), key).await {
                Ok(value) => {
                    self.stats.record_peer_load();
                    self.populate(key, value.clone());
                    return Ok(value);
                }
                Err(err @ Error::NotFound { .. }) => {
                    self.stats.record_peer_not_found();
                    return Err(err);
                }
                Err(err) => {
                    self.stats.record_peer_error();
                    match self.options.peer_failure {
                        PeerFailurePolicy::Fail => return Err(err),
                        PeerFailurePolicy::FallbackToLoader => {
                            warn!("[{}] {}; loading {} locally", self.name, err, key);
                        }
                    }
                }
            }
        }

        self.load_locally(key).await
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let budget = self.options.peer_timeout;
        match tokio::time::timeout(budget, peer.get(&self.name, key)).await {
            Ok(Ok(bytes)) => Ok(ByteView::from(bytes)),
            Ok(Err(err)) => {
                if matches!(err, Error::PeerTimeout { .. }) {
                    self.stats.record_peer_timeout();
                }
                warn!("[{}] peer fetch of {} failed: {}", self.name, key, err);
                Err(err)
            }
            Err(_) => {
                self.stats.record_peer_timeout();
                warn!(
                    "[{}] peer {} did not answer for {} within {:?}",
                    self.name,
                    peer.addr(),
                    key,
                    budget
                );
                Err(Error::PeerTimeout {
                    peer: peer.addr().to_string(),
                    timeout: budget,
                })
            }
        }
    }

    async fn load_locally(&self, key: &str) -> Result<ByteView> {
        let loader = Arc::clone(&self.loader);
        let owned = key.to_string();
        let loaded = tokio::task::spawn_blocking(move || loader.load(&owned)).await;

        match loaded {
            Ok(Ok(bytes)) => {
                self.stats.record_local_load();
                let value = ByteView::from(bytes);
                self.populate(key, value.clone());
                Ok(value)
            }
            Ok(Err(LoadError::NotFound)) => {
                self.stats.record_local_load_err();
                Err(Error::NotFound {
                    key: key.to_string(),
                })
            }
            Ok(Err(LoadError::Failed(message))) => {
                self.stats.record_local_load_err();
                warn!("[{}] loader failed for {}: {}", self.name, key, message);
                Err(Error::Load {
                    key: key.to_string(),
                    message,
                })
            }
            Err(join_err) => {
                self.stats.record_local_load_err();
                warn!("[{}] loader for {} did not finish: {}", self.name, key, join_err);
                Err(Error::Load {
                    key: key.to_string(),
                    message: "loader panicked".to_string(),
                })
            }
        }
    }

    fn populate(&self, key: &str, value: ByteView) {
        self.cache.add(key.to_string(), value);
    }
}
