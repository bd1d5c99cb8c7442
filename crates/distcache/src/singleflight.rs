//! Per-key de-duplication of in-progress fetches
//!
//! The first caller for a key starts the fetch; callers arriving while it is
//! running await the same shared future and receive the same result, errors
//! included. A finished flight is forgotten at once, so later callers start a
//! fresh fetch. If every waiter leaves first, the flight is forgotten and the
//! running fetch dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::error::Result;

type Flight = Shared<BoxFuture<'static, Result<ByteView>>>;
type Calls = Mutex<HashMap<String, Call>>;

struct Call {
    id: u64,
    flight: Flight,
    waiters: usize,
}

/// Table of in-progress fetches keyed by cache key
#[derive(Default)]
pub(crate) struct SingleFlight {
    calls: Arc<Calls>,
    next_id: AtomicU64,
}

impl SingleFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `fetch` for `key` unless a fetch for it is already in flight
    ///
    /// Returns the result and whether it came from another caller's flight.
    pub(crate) async fn run<F, Fut>(&self, key: &str, fetch: F) -> (Result<ByteView>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ByteView>> + Send + 'static,
    {
        let (id, flight, joined) = {
            let mut calls = self.calls.lock();
            match calls.get_mut(key) {
                Some(call) => {
                    call.waiters += 1;
                    (call.id, call.flight.clone(), true)
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let fetch = fetch();
                    let table = Arc::clone(&self.calls);
                    let owned = key.to_string();
                    let flight = async move {
                        let result = fetch.await;
                        forget(&table, &owned, id);
                        result
                    }
                    .boxed()
                    .shared();
                    calls.insert(
                        key.to_string(),
                        Call {
                            id,
                            flight: flight.clone(),
                            waiters: 1,
                        },
                    );
                    (id, flight, false)
                }
            }
        };

        let _waiter = Waiter {
            calls: self.calls.as_ref(),
            key,
            id,
        };
        (flight.await, joined)
    }

    /// Number of keys with a fetch in progress
    pub(crate) fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    #[cfg(test)]
    fn waiters(&self, key: &str) -> usize {
        self.calls.lock().get(key).map_or(0, |call| call.waiters)
    }
}

/// Remove flight `id` for `key` if it is still the registered one
fn forget(calls: &Calls, key: &str, id: u64) {
    let mut calls = calls.lock();
    if calls.get(key).is_some_and(|call| call.id == id) {
        calls.remove(key);
    }
}

/// Deregisters one waiter on drop, removing the flight with the last one
struct Waiter<'a> {
    calls: &'a Calls,
    key: &'a str,
    id: u64,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let mut calls = self.calls.lock();
        if let Some(call) = calls.get_mut(self.key) {
            // A newer flight may have replaced ours
            if call.id != self.id {
                return;
            }
            call.waiters -= 1;
            if call.waiters == 0 {
                calls.remove(self.key);
            }
        }
    }
}
