//! Cache Module
//!
//! In-memory key/value storage with TTL expiration and earliest-deadline
//! eviction.

mod entry;
mod expiry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use expiry::ExpiryIndex;
pub use stats::CacheStats;
pub use store::{CacheImage, ExpiringStore, ImageEntry};

/// The cache service's store: JSON objects on the wall clock.
pub type CacheStore = ExpiringStore<serde_json::Value>;
