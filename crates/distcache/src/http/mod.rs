//! HTTP peer boundary
//!
//! - [`HttpPool`]: ring of peer URLs; picks the owner of a key
//! - [`HttpPeer`]: fetches from one remote node
//! - [`peer_router`]: serves `GET {base_path}{group}/{key}` from local data

mod client;
mod path;
mod server;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::RwLock;
use tracing::info;

use crate::consistenthash::{HashRing, DEFAULT_REPLICAS};
use crate::error::{Error, Result};
use crate::group::DEFAULT_PEER_TIMEOUT;
use crate::peers::{PeerGetter, PeerPicker};

pub use client::HttpPeer;
pub use path::{normalize_base_path, parse_peer_path, peer_path, PathError, PeerPath};
pub use server::{error_response, peer_router, status_for};

/// Base path peers serve under when none is configured
pub const DEFAULT_BASE_PATH: &str = "/_distcache/";

/// Peer set of one node, routed by consistent hashing
pub struct HttpPool {
    /// This node's own base URL, e.g. `http://10.0.0.1:8001`
    self_url: String,
    base_path: String,
    replicas: usize,
    timeout: Duration,
    client: reqwest::Client,
    state: RwLock<PoolState>,
}

struct PoolState {
    ring: HashRing,
    getters: HashMap<String, Arc<HttpPeer>>,
}

impl HttpPool {
    /// Create a pool for the node reachable at `self_url`
    pub fn new(self_url: &str) -> Self {
        Self {
            self_url: trim_url(self_url),
            base_path: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            timeout: DEFAULT_PEER_TIMEOUT,
            client: reqwest::Client::new(),
            state: RwLock::new(PoolState {
                ring: HashRing::new(DEFAULT_REPLICAS),
                getters: HashMap::new(),
            }),
        }
    }

    /// Serve and fetch under another base path
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }

    /// Virtual nodes per peer; takes effect on the next `set_peers`
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Per-request timeout of the HTTP client
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the peer set
    ///
    /// The list should contain this node's own URL. Duplicates are dropped
    /// before the ring is rebuilt.
    pub fn set_peers<I, S>(&self, peers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.replicas == 0 {
            return Err(Error::Config("replicas must be greater than 0".to_string()));
        }

        let mut urls: Vec<String> = peers.into_iter().map(|p| trim_url(p.as_ref())).collect();
        urls.sort();
        urls.dedup();
        if urls.iter().any(|url| url.is_empty()) {
            return Err(Error::Config("peer URL must not be empty".to_string()));
        }

        let mut ring = HashRing::new(self.replicas);
        ring.add(&urls);

        let getters = urls
            .iter()
            .filter(|url| **url != self.self_url)
            .map(|url| {
                let peer = HttpPeer::new(url, &self.base_path, self.client.clone(), self.timeout);
                (url.clone(), Arc::new(peer))
            })
            .collect();

        *self.state.write() = PoolState { ring, getters };
        info!("[{}] peer set: {:?}", self.self_url, urls);
        Ok(())
    }

    /// URL of the node owning `key`, self included
    pub fn owner(&self, key: &str) -> Option<String> {
        self.state.read().ring.get(key).map(str::to_string)
    }

    /// Current peers, sorted
    pub fn peers(&self) -> Vec<String> {
        self.state.read().ring.peers()
    }

    /// This node's URL
    pub fn self_url(&self) -> &str {
        &self.self_url
    }

    /// Base path served and requested
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.read();
        let owner = state.ring.get(key)?;
        if owner == self.self_url {
            return None;
        }
        state
            .getters
            .get(owner)
            .map(|getter| Arc::clone(getter) as Arc<dyn PeerGetter>)
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
