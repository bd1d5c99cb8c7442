//! Peer routing seams
//!
//! A group asks its `PeerPicker` who owns a key and, when the owner is
//! remote, fetches through the returned `PeerGetter`. The HTTP pool in
//! [`crate::http`] implements both; tests substitute in-process fakes.

use std::sync::Arc;
use async_trait::async_trait;

use crate::error::Result;

/// Fetches a value from one remote peer
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Fetch `key` of `group` from the peer's local-only path
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>>;

    /// Address identifying the peer in logs and errors
    fn addr(&self) -> &str;
}

/// Chooses the peer that owns a key
pub trait PeerPicker: Send + Sync {
    /// Remote owner of `key`
    ///
    /// `None` means this node owns the key, or no peers are known.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}
