//! Cache Store Module
//!
//! Bounded key/value storage with per-entry deadlines. A time-ordered index
//! sits beside the map so both capacity eviction and expiry purging take the
//! entry nearest to expiration first.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats, ExpiryIndex};
use crate::clock::{Clock, SystemClock};
use crate::error::SnapshotError;
use crate::snapshot::Persistent;

// == Expiring Store ==
/// Capacity-bounded map whose entries become invisible at their deadline.
///
/// Expired entries are reclaimed lazily: a `get` that finds one removes it,
/// and [`ExpiringStore::purge_expired`] sweeps the rest. When a new key would
/// exceed capacity, the entry with the earliest deadline is evicted; equal
/// deadlines fall back to insertion order.
#[derive(Debug)]
pub struct ExpiringStore<V, C = SystemClock> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Deadline ordering of every key in `entries`
    expiry: ExpiryIndex,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Next insertion sequence number
    next_seq: u64,
    clock: C,
}

impl<V: Clone> ExpiringStore<V, SystemClock> {
    // == Constructor ==
    /// Creates a store on the wall clock holding at most `max_entries`.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, SystemClock)
    }
}

impl<V: Clone, C: Clock> ExpiringStore<V, C> {
    /// Creates a store reading time from `clock`.
    ///
    /// A capacity of zero is raised to one so that `put` can always succeed.
    pub fn with_clock(max_entries: usize, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            expiry: ExpiryIndex::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            next_seq: 0,
            clock,
        }
    }

    // == Put ==
    /// Inserts or overwrites `key`, expiring `ttl_seconds` from now.
    ///
    /// Overwriting resets the deadline. Inserting a new key into a full store
    /// evicts the entry nearest to expiration first.
    pub fn put(&mut self, key: String, value: V, ttl_seconds: u64) {
        let now = self.clock.now_ms();
        let seq = self.take_seq();
        let entry = CacheEntry::new(value, now, ttl_seconds, seq);
        self.insert_entry(key, entry, now);
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// An expired entry found here is removed immediately.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(entry) if entry.is_expired(now) => entry.expiry_key(),
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                return Some(value);
            }
        };

        self.entries.remove(key);
        self.expiry.remove(expired.0, expired.1);
        self.stats.record_expirations(1);
        self.stats.record_miss();
        self.stats.set_total_entries(self.entries.len());
        None
    }

    // == Purge Expired ==
    /// Removes every entry whose deadline has passed.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired = self.expiry.drain_expired(now);
        let count = expired.len();

        for key in expired {
            self.entries.remove(&key);
        }

        self.stats.record_expirations(count);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Length ==
    /// Returns the number of entries physically held.
    ///
    /// Entries past their deadline but not yet reclaimed are still counted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Snapshot ==
    /// Captures every live entry in insertion order.
    pub fn snapshot(&self) -> CacheImage<V> {
        let now = self.clock.now_ms();
        let mut live: Vec<(&String, &CacheEntry<V>)> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .collect();
        live.sort_by_key(|(_, entry)| entry.seq);

        CacheImage {
            entries: live
                .into_iter()
                .map(|(key, entry)| ImageEntry {
                    key: key.clone(),
                    value: entry.value.clone(),
                    expires_at: entry.expires_at,
                })
                .collect(),
        }
    }

    // == Restore ==
    /// Replaces the whole contents with `image`.
    ///
    /// Entries already past their deadline are dropped and capacity is
    /// enforced as if the entries were put in image order. Returns the number
    /// of entries held afterwards.
    pub fn restore(&mut self, image: CacheImage<V>) -> usize {
        self.entries.clear();
        self.expiry.clear();
        self.next_seq = 0;

        let now = self.clock.now_ms();
        for item in image.entries {
            if now >= item.expires_at {
                continue;
            }
            let seq = self.take_seq();
            let entry = CacheEntry {
                value: item.value,
                expires_at: item.expires_at,
                seq,
            };
            self.insert_entry(item.key, entry, now);
        }

        self.stats.set_total_entries(self.entries.len());
        self.entries.len()
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn insert_entry(&mut self, key: String, entry: CacheEntry<V>, now: u64) {
        if let Some(previous) = self.entries.remove(&key) {
            self.expiry.remove(previous.expires_at, previous.seq);
        } else if self.entries.len() >= self.max_entries {
            self.evict_earliest(now);
        }

        self.expiry.insert(entry.expires_at, entry.seq, key.clone());
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    fn evict_earliest(&mut self, now: u64) {
        let Some(victim) = self.expiry.pop_earliest() else {
            return;
        };

        match self.entries.remove(&victim) {
            Some(entry) if entry.is_expired(now) => self.stats.record_expirations(1),
            Some(_) => {
                self.stats.record_eviction();
                debug!(key = %victim, "evicted entry nearest to expiry");
            }
            None => {}
        }
    }
}

// == Snapshot Image ==
/// Serialized form of an [`ExpiringStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheImage<V> {
    pub entries: Vec<ImageEntry<V>>,
}

/// One entry of a [`CacheImage`], with its absolute deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry<V> {
    pub key: String,
    pub value: V,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

#[async_trait]
impl<V, C> Persistent for RwLock<ExpiringStore<V, C>>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    C: Clock + 'static,
{
    type Image = CacheImage<V>;

    async fn snapshot(&self) -> CacheImage<V> {
        self.read().await.snapshot()
    }

    async fn restore(&self, image: CacheImage<V>) -> Result<(), SnapshotError> {
        let offered = image.entries.len();
        let restored = self.write().await.restore(image);
        info!(offered, restored, "cache entries restored from snapshot");
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn manual_store(max_entries: usize) -> (ExpiringStore<Value, ManualClock>, ManualClock) {
        let clock = ManualClock::starting_at(1_700_000_000_000);
        (ExpiringStore::with_clock(max_entries, clock.clone()), clock)
    }

    #[test]
    fn test_store_new() {
        let store: ExpiringStore<String> = ExpiringStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let (mut store, _) = manual_store(0);
        store.put("a".to_string(), json!(1), 60);
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.get("a"), Some(json!(1)));
    }

    #[test]
    fn test_put_then_get_until_ttl_elapses() {
        let (mut store, clock) = manual_store(100);

        store.put("a".to_string(), json!({"x": 1}), 600);
        assert_eq!(store.get("a"), Some(json!({"x": 1})));

        clock.advance(Duration::from_secs(599));
        assert_eq!(store.get("a"), Some(json!({"x": 1})));

        clock.advance(Duration::from_secs(2));
        assert_eq!(store.get("a"), None);
        assert!(store.is_empty(), "expired entry should be reclaimed on access");
    }

    #[test]
    fn test_get_nonexistent() {
        let (mut store, _) = manual_store(100);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_overwrite_refreshes_deadline() {
        let (mut store, clock) = manual_store(100);

        store.put("key".to_string(), json!("v1"), 10);
        clock.advance(Duration::from_secs(8));
        store.put("key".to_string(), json!("v2"), 10);
        clock.advance(Duration::from_secs(8));

        assert_eq!(store.get("key"), Some(json!("v2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_eviction_takes_earliest_deadline() {
        let (mut store, _) = manual_store(3);

        store.put("long".to_string(), json!(1), 300);
        store.put("short".to_string(), json!(2), 10);
        store.put("medium".to_string(), json!(3), 100);

        store.put("new".to_string(), json!(4), 50);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("short"), None);
        assert!(store.get("long").is_some());
        assert!(store.get("medium").is_some());
        assert!(store.get("new").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_eviction_ties_broken_by_insertion_order() {
        let (mut store, _) = manual_store(3);

        store.put("key1".to_string(), json!(1), 300);
        store.put("key2".to_string(), json!(2), 300);
        store.put("key3".to_string(), json!(3), 300);
        store.put("key4".to_string(), json!(4), 300);

        assert_eq!(store.get("key1"), None);
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
        assert!(store.get("key4").is_some());
    }

    #[test]
    fn test_get_does_not_change_eviction_order() {
        let (mut store, _) = manual_store(2);

        store.put("a".to_string(), json!(1), 300);
        store.put("b".to_string(), json!(2), 300);
        store.get("a");
        store.put("c".to_string(), json!(3), 300);

        assert_eq!(store.get("a"), None);
        assert!(store.get("b").is_some());
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let (mut store, _) = manual_store(2);

        store.put("a".to_string(), json!(1), 300);
        store.put("b".to_string(), json!(2), 300);
        store.put("a".to_string(), json!(10), 300);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(json!(10)));
        assert_eq!(store.get("b"), Some(json!(2)));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_full_store_with_expired_entry_reclaims_it_first() {
        let (mut store, clock) = manual_store(2);

        store.put("stale".to_string(), json!(1), 1);
        store.put("fresh".to_string(), json!(2), 300);
        clock.advance(Duration::from_secs(5));
        store.put("next".to_string(), json!(3), 300);

        let stats = store.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn test_purge_expired() {
        let (mut store, clock) = manual_store(100);

        store.put("key1".to_string(), json!(1), 1);
        store.put("key2".to_string(), json!(2), 10);
        clock.advance(Duration::from_secs(2));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get("key2").is_some());
        assert_eq!(store.purge_expired(), 0);
    }

    #[test]
    fn test_stats() {
        let (mut store, _) = manual_store(100);

        store.put("key1".to_string(), json!(1), 60);
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let (mut store, clock) = manual_store(10);
        store.put("a".to_string(), json!({"x": 1}), 60);
        store.put("b".to_string(), json!([1, 2]), 120);

        let image = store.snapshot();
        assert_eq!(image.entries.len(), 2);
        assert_eq!(image.entries[0].key, "a");

        let mut restored = ExpiringStore::with_clock(10, clock.clone());
        assert_eq!(restored.restore(image), 2);
        assert_eq!(restored.get("a"), Some(json!({"x": 1})));
        assert_eq!(restored.get("b"), Some(json!([1, 2])));

        clock.advance(Duration::from_secs(61));
        assert_eq!(restored.get("a"), None);
        assert!(restored.get("b").is_some());
    }

    #[test]
    fn test_snapshot_skips_expired_entries() {
        let (mut store, clock) = manual_store(10);
        store.put("gone".to_string(), json!(1), 1);
        store.put("kept".to_string(), json!(2), 60);
        clock.advance(Duration::from_secs(1));

        let image = store.snapshot();
        assert_eq!(image.entries.len(), 1);
        assert_eq!(image.entries[0].key, "kept");
    }

    #[test]
    fn test_restore_drops_expired_and_applies_capacity() {
        let (mut store, clock) = manual_store(2);
        let now = clock.now_ms();
        let image = CacheImage {
            entries: vec![
                ImageEntry {
                    key: "old".to_string(),
                    value: json!(0),
                    expires_at: now - 1,
                },
                ImageEntry {
                    key: "a".to_string(),
                    value: json!(1),
                    expires_at: now + 1_000,
                },
                ImageEntry {
                    key: "b".to_string(),
                    value: json!(2),
                    expires_at: now + 5_000,
                },
                ImageEntry {
                    key: "c".to_string(),
                    value: json!(3),
                    expires_at: now + 9_000,
                },
            ],
        };

        assert_eq!(store.restore(image), 2);
        assert_eq!(store.get("old"), None);
        assert_eq!(store.get("a"), None);
        assert!(store.get("b").is_some());
        assert!(store.get("c").is_some());
    }

    #[tokio::test]
    async fn test_persistent_impl_round_trip() {
        let clock = ManualClock::starting_at(5_000);
        let source = RwLock::new(ExpiringStore::with_clock(10, clock.clone()));
        source.write().await.put("k".to_string(), json!({"v": true}), 30);

        let image = Persistent::snapshot(&source).await;
        let target: RwLock<ExpiringStore<Value, ManualClock>> =
            RwLock::new(ExpiringStore::with_clock(10, clock));
        Persistent::restore(&target, image).await.unwrap();

        assert_eq!(target.write().await.get("k"), Some(json!({"v": true})));
    }
}
