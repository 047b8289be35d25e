//! Shared Application State
//!
//! The stores created by the composition root, handed to every router.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::aggregate::{AggregateStore, DEFAULT_CATALOG, DEFAULT_IDENTITY_SETS};
use crate::cache::CacheStore;
use crate::config::Config;
use crate::limits::LimitStore;

/// Application state shared across all handlers.
///
/// `&mut self` stores sit behind `Arc<RwLock<_>>`; the aggregate store
/// synchronizes internally and is shared as a plain `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Expiring key/value cache
    pub cache: Arc<RwLock<CacheStore>>,
    /// TTL in seconds applied when a request does not carry one
    pub cache_ttl: u64,
    /// Byte-size limits
    pub limits: Arc<RwLock<LimitStore>>,
    /// Counters, gauges and identity sets
    pub metrics: Arc<AggregateStore>,
}

impl AppState {
    /// Creates a new AppState owning the given stores.
    pub fn new(
        cache: CacheStore,
        cache_ttl: u64,
        limits: LimitStore,
        metrics: AggregateStore,
    ) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            cache_ttl,
            limits: Arc::new(RwLock::new(limits)),
            metrics: Arc::new(metrics),
        }
    }

    /// Creates a new AppState from configuration, with default limits and
    /// the default metric catalog.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CacheStore::new(config.cache_max_entries),
            config.cache_ttl,
            LimitStore::new(),
            AggregateStore::with_catalog(DEFAULT_CATALOG, DEFAULT_IDENTITY_SETS),
        )
    }
}
