//! Request DTOs for the service APIs
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

/// Maximum allowed cache key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for storing a cache entry (POST /cache)
#[derive(Debug, Clone, Deserialize)]
pub struct CacheItemRequest {
    /// The cache key
    pub key: String,
    /// The JSON object to store
    pub data: Map<String, Value>,
    /// Optional TTL in seconds, the service default when absent
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl CacheItemRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Query string for fetching a cache entry (GET /cache?key=...)
#[derive(Debug, Clone, Deserialize)]
pub struct CacheQuery {
    pub key: Option<String>,
}

/// Request body for setting a limit
#[derive(Debug, Clone, Deserialize)]
pub struct LimitSetRequest {
    pub value: i64,
}

impl LimitSetRequest {
    /// Returns the limit as an unsigned value, or an error message if negative.
    pub fn limit(&self) -> Result<u64, String> {
        u64::try_from(self.value)
            .map_err(|_| format!("Limit must be non-negative, got {}", self.value))
    }
}

/// Request body for counter and gauge updates.
///
/// A missing or null `value` makes the update a no-op.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricUpdateRequest {
    #[serde(default)]
    pub value: Option<Number>,
}

impl MetricUpdateRequest {
    /// Interprets `value` as a counter increment.
    ///
    /// Fractional numbers are refused; negative numbers pass through so the
    /// store can reject them.
    pub fn amount(&self) -> Option<Result<i64, String>> {
        let number = self.value.as_ref()?;
        Some(number.as_i64().ok_or_else(|| {
            if number.as_u64().is_some() {
                format!("Amount {} is too large", number)
            } else {
                format!("Amount must be an integer, got {}", number)
            }
        }))
    }

    /// The numeric value as a float, used for its sign only.
    pub fn signed(&self) -> Option<f64> {
        self.value.as_ref().and_then(Number::as_f64)
    }
}

/// Request body naming an identity (POST/DELETE /metrics/active_users)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityRequest {
    #[serde(default)]
    pub value: Option<String>,
}
