//! Lock-free counters for one `ConcurrentCache`

use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

macro_rules! cache_counters {
    ($($field:ident => $record:ident),* $(,)?) => {
        /// Hit, miss, insert and eviction counters of one cache
        #[derive(Debug, Default)]
        pub struct CacheStats {
            $($field: AtomicU64,)*
        }

        /// Point-in-time copy of [`CacheStats`]
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
        pub struct CacheStatsSnapshot {
            $(
                #[doc = concat!("Total ", stringify!($field))]
                pub $field: u64,
            )*
            /// `hits / (hits + misses)`, 0.0 before the first lookup
            pub hit_ratio: f64,
        }

        impl CacheStats {
            $(
                #[doc = concat!("Count one more of `", stringify!($field), "`")]
                pub fn $record(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }

                #[doc = concat!("Current `", stringify!($field), "`")]
                pub fn $field(&self) -> u64 {
                    self.$field.load(Ordering::Relaxed)
                }
            )*

            /// Zero every counter
            pub fn reset(&self) {
                $(self.$field.store(0, Ordering::Relaxed);)*
            }

            /// Copy the current values
            pub fn snapshot(&self) -> CacheStatsSnapshot {
                let mut snap = CacheStatsSnapshot {
                    $($field: self.$field(),)*
                    hit_ratio: 0.0,
                };
                snap.hit_ratio = ratio(snap.hits, snap.misses);
                snap
            }
        }
    };
}

cache_counters! {
    hits => record_hit,
    misses => record_miss,
    inserts => record_insert,
    evictions => record_eviction,
}

fn ratio(hits: u64, misses: u64) -> f64 {
    match hits + misses {
        0 => 0.0,
        total => hits as f64 / total as f64,
    }
}

impl CacheStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of lookups that hit, 0.0 to 1.0
    pub fn hit_ratio(&self) -> f64 {
        ratio(self.hits(), self.misses())
    }
}
