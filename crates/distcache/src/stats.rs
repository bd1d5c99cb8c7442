//! Per-group request counters

use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Counters describing how a group resolved its requests
#[derive(Debug, Default)]
pub struct GroupStats {
    gets: AtomicU64,
    cache_hits: AtomicU64,
    peer_loads: AtomicU64,
    peer_not_found: AtomicU64,
    peer_errors: AtomicU64,
    peer_timeouts: AtomicU64,
    loads: AtomicU64,
    loads_deduped: AtomicU64,
    local_loads: AtomicU64,
    local_load_errs: AtomicU64,
    server_requests: AtomicU64,
}

/// Point-in-time copy of [`GroupStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GroupStatsSnapshot {
    /// Any get request, including peer requests
    pub gets: u64,
    /// Requests answered from the local cache
    pub cache_hits: u64,
    /// Values fetched from the owning peer
    pub peer_loads: u64,
    /// Keys the owning peer reported as missing
    pub peer_not_found: u64,
    /// Failed peer fetches, timeouts included
    pub peer_errors: u64,
    /// Peer fetches that exceeded their budget
    pub peer_timeouts: u64,
    /// Misses that went past the cache
    pub loads: u64,
    /// Misses that joined another caller's fetch
    pub loads_deduped: u64,
    /// Successful loader calls
    pub local_loads: u64,
    /// Failed loader calls
    pub local_load_errs: u64,
    /// Requests that arrived from peers over HTTP
    pub server_requests: u64,
}

macro_rules! counters {
    ($($record:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $record(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl GroupStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    counters! {
        record_get => gets,
        record_cache_hit => cache_hits,
        record_peer_load => peer_loads,
        record_peer_not_found => peer_not_found,
        record_peer_error => peer_errors,
        record_peer_timeout => peer_timeouts,
        record_load => loads,
        record_load_deduped => loads_deduped,
        record_local_load => local_loads,
        record_local_load_err => local_load_errs,
        record_server_request => server_requests,
    }

    /// Copy the current values
    pub fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_not_found: self.peer_not_found.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            peer_timeouts: self.peer_timeouts.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            loads_deduped: self.loads_deduped.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errs: self.local_load_errs.load(Ordering::Relaxed),
            server_requests: self.server_requests.load(Ordering::Relaxed),
        }
    }
}
