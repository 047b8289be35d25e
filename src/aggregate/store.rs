//! Aggregate Store Module
//!
//! Counters, gauges and identity multisets shared by concurrent handlers.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tracing::{debug, info};

use crate::aggregate::{MetricDescriptor, MetricKind};
use crate::error::{Result, SnapshotError, StoreError};
use crate::snapshot::Persistent;

// == Direction ==
/// Which way a gauge moves. Each adjustment is exactly one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    /// Negative values decrease, everything else increases.
    ///
    /// Only the sign is used; the magnitude is discarded.
    pub fn from_signed(value: f64) -> Self {
        if value < 0.0 {
            Direction::Decrease
        } else {
            Direction::Increase
        }
    }
}

// == Aggregate Store ==
/// State held under one name. A name has exactly one kind for its lifetime.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Counter(u64),
    Gauge(i64),
    /// identity -> count (always >= 1)
    Members(HashMap<String, u64>),
}

impl Slot {
    fn describe(&self) -> &'static str {
        match self {
            Slot::Counter(_) => "a counter",
            Slot::Gauge(_) => "a gauge",
            Slot::Members(_) => "an identity set",
        }
    }
}

/// Named counters, gauges and identity multisets.
///
/// All names share one `DashMap`, so the kind check and the update of a name
/// happen under the same shard lock while unrelated names proceed
/// independently. Every method takes `&self`; share the store behind an
/// `Arc`.
#[derive(Debug, Default)]
pub struct AggregateStore {
    slots: DashMap<String, Slot>,
    catalog: HashMap<String, MetricDescriptor>,
    declared_sets: Vec<String>,
}

impl AggregateStore {
    /// Creates an empty store with no catalogued metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `metrics` at zero and empty `sets`.
    pub fn with_catalog(metrics: &[MetricDescriptor], sets: &[&str]) -> Self {
        let store = Self {
            catalog: metrics
                .iter()
                .map(|descriptor| (descriptor.name.to_string(), *descriptor))
                .collect(),
            declared_sets: sets.iter().map(|set| set.to_string()).collect(),
            ..Self::default()
        };
        store.seed();
        store
    }

    fn seed(&self) {
        for descriptor in self.catalog.values() {
            let slot = match descriptor.kind {
                MetricKind::Counter => Slot::Counter(0),
                MetricKind::Gauge => Slot::Gauge(0),
            };
            self.slots.insert(descriptor.name.to_string(), slot);
        }
        for set in &self.declared_sets {
            self.slots.insert(set.clone(), Slot::Members(HashMap::new()));
        }
    }

    fn wrong_kind(name: &str, slot: &Slot, wanted: &str) -> StoreError {
        StoreError::InvalidArgument(format!(
            "'{}' is {}, not {}",
            name,
            slot.describe(),
            wanted
        ))
    }

    // == Counters ==
    /// Adds `delta` to the counter `name`, creating it at zero if needed.
    ///
    /// Negative deltas and names already used by another kind are rejected
    /// with `InvalidArgument`, leaving the store unchanged. Returns the new
    /// value.
    pub fn counter_add(&self, name: &str, delta: i64) -> Result<u64> {
        if delta < 0 {
            return Err(StoreError::InvalidArgument(format!(
                "counter '{}' cannot be decreased (delta {})",
                name, delta
            )));
        }

        let mut slot = self
            .slots
            .entry(name.to_string())
            .or_insert(Slot::Counter(0));
        match &mut *slot {
            Slot::Counter(value) => {
                *value = value.saturating_add(delta as u64);
                Ok(*value)
            }
            other => Err(Self::wrong_kind(name, other, "a counter")),
        }
    }

    pub fn counter(&self, name: &str) -> Option<u64> {
        match *self.slots.get(name)? {
            Slot::Counter(value) => Some(value),
            _ => None,
        }
    }

    // == Gauges ==
    /// Moves the gauge `name` by one unit. There is no lower bound.
    ///
    /// Returns the new value.
    pub fn gauge_adjust(&self, name: &str, direction: Direction) -> Result<i64> {
        let mut slot = self
            .slots
            .entry(name.to_string())
            .or_insert(Slot::Gauge(0));
        match &mut *slot {
            Slot::Gauge(value) => {
                *value = match direction {
                    Direction::Increase => value.saturating_add(1),
                    Direction::Decrease => value.saturating_sub(1),
                };
                Ok(*value)
            }
            other => Err(Self::wrong_kind(name, other, "a gauge")),
        }
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        match *self.slots.get(name)? {
            Slot::Gauge(value) => Some(value),
            _ => None,
        }
    }

    /// Kind of `name`, from the catalog or from live state.
    ///
    /// `None` for unknown names and identity sets.
    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        if let Some(descriptor) = self.catalog.get(name) {
            return Some(descriptor.kind);
        }
        match *self.slots.get(name)? {
            Slot::Counter(_) => Some(MetricKind::Counter),
            Slot::Gauge(_) => Some(MetricKind::Gauge),
            Slot::Members(_) => None,
        }
    }

    /// Help text for exposition; uncatalogued metrics reuse their name.
    pub fn help_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.catalog
            .get(name)
            .map(|descriptor| descriptor.help)
            .unwrap_or(name)
    }

    /// All counters, sorted by name.
    pub fn counters(&self) -> Vec<(String, u64)> {
        let mut all: Vec<(String, u64)> = self
            .slots
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::Counter(value) => Some((entry.key().clone(), *value)),
                _ => None,
            })
            .collect();
        all.sort();
        all
    }

    /// All gauges, sorted by name.
    pub fn gauges(&self) -> Vec<(String, i64)> {
        let mut all: Vec<(String, i64)> = self
            .slots
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::Gauge(value) => Some((entry.key().clone(), *value)),
                _ => None,
            })
            .collect();
        all.sort();
        all
    }

    // == Identity Sets ==
    /// Increments `identity`'s count in `set`, starting at 1 when absent.
    ///
    /// A `set` name already used by a counter or gauge is rejected with
    /// `InvalidArgument`. Returns the new count.
    pub fn identity_enter(&self, set: &str, identity: &str) -> Result<u64> {
        let mut slot = self
            .slots
            .entry(set.to_string())
            .or_insert_with(|| Slot::Members(HashMap::new()));
        match &mut *slot {
            Slot::Members(members) => {
                let count = members.entry(identity.to_string()).or_insert(0);
                *count += 1;
                Ok(*count)
            }
            other => Err(Self::wrong_kind(set, other, "an identity set")),
        }
    }

    /// Decrements `identity`'s count in `set`, dropping it at zero.
    ///
    /// Leaving an absent identity is a no-op and returns `None`; otherwise
    /// returns the remaining count, 0 meaning the identity was removed.
    pub fn identity_leave(&self, set: &str, identity: &str) -> Option<u64> {
        let mut slot = self.slots.get_mut(set)?;
        let Slot::Members(members) = &mut *slot else {
            return None;
        };
        let Some(count) = members.get_mut(identity) else {
            debug!(set, identity, "leave for absent identity ignored");
            return None;
        };

        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            members.remove(identity);
        }
        Some(remaining)
    }

    /// Current members of `set` with their counts; empty if unknown.
    pub fn identities(&self, set: &str) -> BTreeMap<String, u64> {
        match self.slots.get(set).as_deref() {
            Some(Slot::Members(members)) => members
                .iter()
                .map(|(identity, count)| (identity.clone(), *count))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    // == Snapshot ==
    /// Captures all counters, gauges and identity sets as one flat image.
    ///
    /// Every name holds a single kind, so each becomes exactly one field.
    pub fn snapshot(&self) -> MetricsImage {
        let fields = self
            .slots
            .iter()
            .map(|entry| {
                let value = match entry.value() {
                    Slot::Counter(value) => ImageValue::Number(Number::from(*value)),
                    Slot::Gauge(value) => ImageValue::Number(Number::from(*value)),
                    Slot::Members(members) => ImageValue::Members(
                        members
                            .iter()
                            .map(|(identity, count)| (identity.clone(), *count))
                            .collect(),
                    ),
                };
                (entry.key().clone(), value)
            })
            .collect();

        MetricsImage(fields)
    }

    /// Replaces all state with `image`.
    ///
    /// The image is validated in full before anything is applied, so a
    /// rejected image leaves the store untouched. Catalogued metrics missing
    /// from the image come back at zero.
    pub fn restore(&self, image: MetricsImage) -> std::result::Result<(), SnapshotError> {
        let mut slots = Vec::with_capacity(image.0.len());

        for (name, value) in image.0 {
            let slot = match value {
                ImageValue::Members(members) => {
                    if let Some(descriptor) = self.catalog.get(&name) {
                        return Err(SnapshotError::Invalid(format!(
                            "'{}' is a {:?} but holds identity members",
                            name, descriptor.kind
                        )));
                    }
                    Slot::Members(members.into_iter().filter(|(_, count)| *count > 0).collect())
                }
                ImageValue::Number(number) => {
                    if self.declared_sets.contains(&name) {
                        return Err(SnapshotError::Invalid(format!(
                            "identity set '{}' holds a number",
                            name
                        )));
                    }
                    match self.classify(&name, &number) {
                        MetricKind::Counter => {
                            Slot::Counter(number_as_u64(&number).ok_or_else(|| {
                                SnapshotError::Invalid(format!(
                                    "counter '{}' has invalid value {}",
                                    name, number
                                ))
                            })?)
                        }
                        MetricKind::Gauge => Slot::Gauge(number_as_i64(&number).ok_or_else(|| {
                            SnapshotError::Invalid(format!(
                                "gauge '{}' has invalid value {}",
                                name, number
                            ))
                        })?),
                    }
                }
            };
            slots.push((name, slot));
        }

        self.slots.clear();
        self.seed();

        info!(names = slots.len(), "aggregates restored from snapshot");

        for (name, slot) in slots {
            self.slots.insert(name, slot);
        }
        Ok(())
    }

    /// Catalog kind, else a negative number is a gauge and anything else a
    /// counter. Live state is not consulted; the image replaces it.
    fn classify(&self, name: &str, number: &Number) -> MetricKind {
        match self.catalog.get(name) {
            Some(descriptor) => descriptor.kind,
            None if number.as_f64().is_some_and(|value| value < 0.0) => MetricKind::Gauge,
            None => MetricKind::Counter,
        }
    }
}

/// Non-negative integer, accepting whole or fractional floats (truncated).
fn number_as_u64(number: &Number) -> Option<u64> {
    number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|value| value.is_finite() && *value >= 0.0 && *value < u64::MAX as f64)
            .map(|value| value.trunc() as u64)
    })
}

fn number_as_i64(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
            .map(|value| value.trunc() as i64)
    })
}

// == Snapshot Image ==
/// Persisted form of an [`AggregateStore`]: one top-level field per metric
/// or identity set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsImage(pub BTreeMap<String, ImageValue>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageValue {
    /// Counter or gauge value
    Number(Number),
    /// Identity set members and their counts
    Members(BTreeMap<String, u64>),
}

#[async_trait]
impl Persistent for AggregateStore {
    type Image = MetricsImage;

    async fn snapshot(&self) -> MetricsImage {
        AggregateStore::snapshot(self)
    }

    async fn restore(&self, image: MetricsImage) -> std::result::Result<(), SnapshotError> {
        AggregateStore::restore(self, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{
        ACTIVE_REQUESTS, ACTIVE_USERS, DEFAULT_CATALOG, DEFAULT_IDENTITY_SETS, TOTAL_REQUESTS,
    };
    use std::sync::Arc;

    fn default_store() -> AggregateStore {
        AggregateStore::with_catalog(DEFAULT_CATALOG, DEFAULT_IDENTITY_SETS)
    }

    #[test]
    fn test_catalog_seeds_zeroes() {
        let store = default_store();
        assert_eq!(store.counter(TOTAL_REQUESTS), Some(0));
        assert_eq!(store.gauge(ACTIVE_REQUESTS), Some(0));
        assert!(store.identities(ACTIVE_USERS).is_empty());
        assert_eq!(store.counters().len(), 4);
    }

    #[test]
    fn test_counter_add() {
        let store = default_store();
        assert_eq!(store.counter_add(TOTAL_REQUESTS, 3).unwrap(), 3);
        assert_eq!(store.counter_add(TOTAL_REQUESTS, 0).unwrap(), 3);
        assert_eq!(store.counter_add(TOTAL_REQUESTS, 4).unwrap(), 7);
        assert_eq!(store.counter_add("uploads", 2).unwrap(), 2);
    }

    #[test]
    fn test_negative_delta_rejected() {
        let store = default_store();
        store.counter_add(TOTAL_REQUESTS, 5).unwrap();

        let result = store.counter_add(TOTAL_REQUESTS, -1);
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
        assert_eq!(store.counter(TOTAL_REQUESTS), Some(5));
    }

    #[test]
    fn test_kinds_do_not_mix() {
        let store = default_store();
        assert!(matches!(
            store.counter_add(ACTIVE_REQUESTS, 1),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.gauge_adjust(TOTAL_REQUESTS, Direction::Increase),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_identity_sets_and_metrics_do_not_share_names() {
        let store = default_store();
        store.counter_add("uploads", 5).unwrap();

        assert!(matches!(
            store.identity_enter("uploads", "u1"),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.counter_add(ACTIVE_USERS, 1),
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.gauge_adjust(ACTIVE_USERS, Direction::Increase),
            Err(StoreError::InvalidArgument(_))
        ));
        assert_eq!(store.identity_leave("uploads", "u1"), None);

        let restored = default_store();
        restored.restore(store.snapshot()).unwrap();
        assert_eq!(restored.counter("uploads"), Some(5));
        assert!(restored.identities("uploads").is_empty());
    }

    #[test]
    fn test_concurrent_mixed_kinds_settle_on_one_kind() {
        const NAMES: usize = 2_000;
        let store = Arc::new(AggregateStore::new());

        let counting = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..NAMES {
                    let _ = store.counter_add(&format!("n{}", i), 1);
                }
            })
        };
        let gauging = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..NAMES {
                    let _ = store.gauge_adjust(&format!("n{}", i), Direction::Decrease);
                }
            })
        };
        counting.join().unwrap();
        gauging.join().unwrap();

        let counters = store.counters();
        let gauges = store.gauges();
        assert_eq!(counters.len() + gauges.len(), NAMES);
        for (name, _) in &counters {
            assert_eq!(store.gauge(name), None);
            assert_eq!(store.kind_of(name), Some(MetricKind::Counter));
        }
        assert_eq!(store.snapshot().0.len(), NAMES);
    }

    #[test]
    fn test_gauge_moves_by_one_and_may_go_negative() {
        let store = default_store();
        assert_eq!(store.gauge_adjust(ACTIVE_REQUESTS, Direction::Increase).unwrap(), 1);
        assert_eq!(store.gauge_adjust(ACTIVE_REQUESTS, Direction::Decrease).unwrap(), 0);
        assert_eq!(store.gauge_adjust(ACTIVE_REQUESTS, Direction::Decrease).unwrap(), -1);
    }

    #[test]
    fn test_direction_from_signed() {
        assert_eq!(Direction::from_signed(-0.5), Direction::Decrease);
        assert_eq!(Direction::from_signed(0.0), Direction::Increase);
        assert_eq!(Direction::from_signed(250.0), Direction::Increase);
    }

    #[test]
    fn test_identity_enter_then_leave_removes() {
        let store = default_store();
        store.identity_enter(ACTIVE_USERS, "u1").unwrap();

        assert_eq!(store.identity_leave(ACTIVE_USERS, "u1"), Some(0));
        assert!(!store.identities(ACTIVE_USERS).contains_key("u1"));
        assert_eq!(store.identity_leave(ACTIVE_USERS, "u1"), None);
        assert!(store.identities(ACTIVE_USERS).is_empty());
    }

    #[test]
    fn test_identity_reference_counting() {
        let store = default_store();
        assert_eq!(store.identity_enter(ACTIVE_USERS, "u1").unwrap(), 1);
        assert_eq!(store.identity_enter(ACTIVE_USERS, "u1").unwrap(), 2);

        assert_eq!(store.identity_leave(ACTIVE_USERS, "u1"), Some(1));
        assert_eq!(store.identities(ACTIVE_USERS).get("u1"), Some(&1));

        assert_eq!(store.identity_leave(ACTIVE_USERS, "u1"), Some(0));
        assert!(store.identities(ACTIVE_USERS).is_empty());
    }

    #[test]
    fn test_leave_unknown_set_is_noop() {
        let store = default_store();
        assert_eq!(store.identity_leave("nobody_here", "u1"), None);
        assert!(store.identities("nobody_here").is_empty());
    }

    #[test]
    fn test_snapshot_is_flat() {
        let store = default_store();
        store.counter_add(TOTAL_REQUESTS, 9).unwrap();
        store.gauge_adjust(ACTIVE_REQUESTS, Direction::Decrease).unwrap();
        store.identity_enter(ACTIVE_USERS, "alice").unwrap();

        let json = serde_json::to_value(store.snapshot()).unwrap();
        assert_eq!(json[TOTAL_REQUESTS], 9);
        assert_eq!(json[ACTIVE_REQUESTS], -1);
        assert_eq!(json[ACTIVE_USERS]["alice"], 1);
        assert_eq!(json["total_caching_data"], 0);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let store = default_store();
        store.counter_add(TOTAL_REQUESTS, 12).unwrap();
        store.counter_add("custom_bytes", 1024).unwrap();
        store.gauge_adjust(ACTIVE_REQUESTS, Direction::Increase).unwrap();
        store.gauge_adjust("queue_depth", Direction::Decrease).unwrap();
        store.identity_enter(ACTIVE_USERS, "u1").unwrap();
        store.identity_enter(ACTIVE_USERS, "u1").unwrap();

        let restored = default_store();
        restored.restore(store.snapshot()).unwrap();

        assert_eq!(restored.counters(), store.counters());
        assert_eq!(restored.gauges(), store.gauges());
        assert_eq!(restored.identities(ACTIVE_USERS), store.identities(ACTIVE_USERS));
    }

    #[test]
    fn test_restore_accepts_float_values() {
        let image: MetricsImage = serde_json::from_str(
            r#"{"total_requests": 17.0, "total_caching_data": 2.75, "active_requests": -2.0}"#,
        )
        .unwrap();

        let store = default_store();
        store.restore(image).unwrap();

        assert_eq!(store.counter(TOTAL_REQUESTS), Some(17));
        assert_eq!(store.counter("total_caching_data"), Some(2));
        assert_eq!(store.gauge(ACTIVE_REQUESTS), Some(-2));
        assert_eq!(store.counter("total_recived_online_data"), Some(0));
    }

    #[test]
    fn test_restore_rejects_negative_counter_without_applying() {
        let store = default_store();
        store.counter_add(TOTAL_REQUESTS, 3).unwrap();

        let image: MetricsImage =
            serde_json::from_str(r#"{"active_requests": 4, "total_requests": -5}"#).unwrap();
        let result = store.restore(image);

        assert!(matches!(result, Err(SnapshotError::Invalid(_))));
        assert_eq!(store.counter(TOTAL_REQUESTS), Some(3));
        assert_eq!(store.gauge(ACTIVE_REQUESTS), Some(0));
    }

    #[test]
    fn test_restore_rejects_mismatched_kinds() {
        let store = default_store();
        store.counter_add(TOTAL_REQUESTS, 3).unwrap();

        for raw in [
            r#"{"total_requests": {"u1": 1}}"#,
            r#"{"active_users": 4}"#,
        ] {
            let image: MetricsImage = serde_json::from_str(raw).unwrap();
            assert!(matches!(store.restore(image), Err(SnapshotError::Invalid(_))));
        }
        assert_eq!(store.counter(TOTAL_REQUESTS), Some(3));
    }

    #[test]
    fn test_restore_replaces_existing_state() {
        let store = default_store();
        store.counter_add("stale_counter", 1).unwrap();
        store.identity_enter(ACTIVE_USERS, "old").unwrap();

        store.restore(MetricsImage::default()).unwrap();

        assert_eq!(store.counter("stale_counter"), None);
        assert_eq!(store.counter(TOTAL_REQUESTS), Some(0));
        assert!(store.identities(ACTIVE_USERS).is_empty());
    }

    #[test]
    fn test_concurrent_counter_adds() {
        let store = Arc::new(default_store());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        store.counter_add(TOTAL_REQUESTS, 1).unwrap();
                        store.identity_enter(ACTIVE_USERS, "shared").unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.counter(TOTAL_REQUESTS), Some(8000));
        assert_eq!(store.identities(ACTIVE_USERS).get("shared"), Some(&8000));
    }
}
