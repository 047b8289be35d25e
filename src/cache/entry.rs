//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with a hard deadline.

// == Cache Entry ==
/// A stored value together with its expiry metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Insertion sequence number, breaks ties between equal deadlines
    pub seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry that expires `ttl_seconds` after `now_ms`.
    pub fn new(value: V, now_ms: u64, ttl_seconds: u64, seq: u64) -> Self {
        let expires_at = now_ms.saturating_add(ttl_seconds.saturating_mul(1000));
        Self {
            value,
            expires_at,
            seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its deadline, so a TTL of zero is expired immediately.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Index key of this entry in the expiry order.
    pub fn expiry_key(&self) -> (u64, u64) {
        (self.expires_at, self.seq)
    }
}
