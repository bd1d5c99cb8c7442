//! Name to group lookup
//!
//! The registry is an ordinary owned value: build it at startup, register the
//! groups, then share it (usually behind an `Arc`) with whoever serves
//! requests. Lookups take a read lock; only registration writes.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{Error, Result};
use crate::group::{Group, GroupOptions, Loader};
use crate::peers::PeerPicker;

/// All groups served by one node
#[derive(Default)]
pub struct Registry {
    groups: RwLock<HashMap<String, Group>>,
    peers: Option<Arc<dyn PeerPicker>>,
}

impl Registry {
    /// Registry for a standalone node; every miss goes to the loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose groups route misses through `peers`
    pub fn with_peers(peers: Arc<dyn PeerPicker>) -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            peers: Some(peers),
        }
    }

    /// Register a group with default peer settings
    ///
    /// # Arguments
    /// * `name` - Unique group name
    /// * `capacity` - Maximum number of cached entries
    /// * `loader` - Source of truth for misses
    pub fn register_group<L>(&self, name: &str, capacity: usize, loader: L) -> Result<Group>
    where
        L: Loader + 'static,
    {
        self.register_group_with(name, GroupOptions::new(capacity), loader)
    }

    /// Register a group with explicit options
    ///
    /// # Errors
    /// * `Error::Config` - empty name, duplicate name, or invalid options
    pub fn register_group_with<L>(&self, name: &str, options: GroupOptions, loader: L) -> Result<Group>
    where
        L: Loader + 'static,
    {
        if name.is_empty() {
            return Err(Error::Config("group name must not be empty".to_string()));
        }

        let mut groups = self.groups.write();
        if groups.contains_key(name) {
            return Err(Error::Config(format!("group {} is already registered", name)));
        }

        let group = Group::new(name.to_string(), options, Arc::new(loader), self.peers.clone())?;
        groups.insert(name.to_string(), group.clone());
        info!(
            "Registered group {} (capacity {}, peer timeout {:?}, on peer failure {:?})",
            name,
            group.options().capacity,
            group.options().peer_timeout,
            group.options().peer_failure
        );

        Ok(group)
    }

    /// Look up a group by name
    pub fn group(&self, name: &str) -> Result<Group> {
        self.groups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))
    }

    /// Registered group names, sorted
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered groups
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Check if no group is registered
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Peer picker shared by every group, if any
    pub fn peers(&self) -> Option<&Arc<dyn PeerPicker>> {
        self.peers.as_ref()
    }
}
