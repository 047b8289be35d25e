//! Expiry Index Module
//!
//! Orders cache keys by deadline for eviction and expired-entry purging.

use std::collections::BTreeMap;

// == Expiry Index ==
/// Keys ordered by `(expires_at, seq)`.
///
/// The front of the map is always the entry nearest to expiration; among
/// equal deadlines the earlier insertion comes first.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    order: BTreeMap<(u64, u64), String>,
}

impl ExpiryIndex {
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
        }
    }

    // == Insert ==
    /// Tracks `key` under the given deadline and sequence number.
    pub fn insert(&mut self, expires_at: u64, seq: u64, key: String) {
        self.order.insert((expires_at, seq), key);
    }

    // == Remove ==
    /// Stops tracking the entry stored under `(expires_at, seq)`.
    pub fn remove(&mut self, expires_at: u64, seq: u64) -> Option<String> {
        self.order.remove(&(expires_at, seq))
    }

    // == Pop Earliest ==
    /// Removes and returns the key nearest to expiration.
    pub fn pop_earliest(&mut self) -> Option<String> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Drain Expired ==
    /// Removes and returns every key whose deadline is `<= now_ms`.
    pub fn drain_expired(&mut self, now_ms: u64) -> Vec<String> {
        let live = match now_ms.checked_add(1) {
            Some(bound) => self.order.split_off(&(bound, 0)),
            None => BTreeMap::new(),
        };
        let expired = std::mem::replace(&mut self.order, live);
        expired.into_values().collect()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
    }
}
