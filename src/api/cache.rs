//! Cache Handlers
//!
//! HTTP handlers for the expiring key/value cache.

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::api::AppState;
use crate::error::{Result, StoreError};
use crate::models::{CacheItemRequest, CacheQuery, StatsResponse};

/// Handler for POST /cache
///
/// Stores a JSON object under `key`, replying with `0`.
pub async fn store_handler(
    State(state): State<AppState>,
    Json(req): Json<CacheItemRequest>,
) -> Result<Json<u8>> {
    if let Some(error_msg) = req.validate() {
        return Err(StoreError::InvalidArgument(error_msg));
    }

    let ttl = req.ttl.unwrap_or(state.cache_ttl);
    debug!(key = %req.key, ttl, "caching entry");
    state
        .cache
        .write()
        .await
        .put(req.key, Value::Object(req.data), ttl);

    Ok(Json(0))
}

/// Handler for GET /cache?key=...
///
/// Returns the stored object, or 404 if the key is absent or expired.
/// A missing `key` parameter is treated as a miss.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<CacheQuery>,
) -> Result<Json<Value>> {
    let key = query.key.unwrap_or_default();

    // Write lock: an expired hit is removed on the spot
    let value = state.cache.write().await.get(&key);

    value.map(Json).ok_or(StoreError::NotFound(key))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(StatsResponse::new(&cache.stats(), cache.capacity()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::{json, Map};

    fn test_state() -> AppState {
        AppState::from_config(&Config::default())
    }

    fn item(key: &str, data: Value, ttl: Option<u64>) -> CacheItemRequest {
        let Value::Object(data) = data else {
            panic!("test data must be an object");
        };
        CacheItemRequest {
            key: key.to_string(),
            data,
            ttl,
        }
    }

    #[tokio::test]
    async fn test_store_and_fetch() {
        let state = test_state();

        let request = item("a", json!({"x": 1}), None);
        let result = store_handler(State(state.clone()), Json(request)).await;
        assert_eq!(result.unwrap().0, 0);

        let query = CacheQuery {
            key: Some("a".to_string()),
        };
        let response = fetch_handler(State(state), Query(query)).await.unwrap();
        assert_eq!(response.0, json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_fetch_missing_key() {
        let state = test_state();

        let query = CacheQuery {
            key: Some("nonexistent".to_string()),
        };
        let result = fetch_handler(State(state.clone()), Query(query)).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        let result = fetch_handler(State(state), Query(CacheQuery { key: None })).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_uses_configured_ttl() {
        let state = test_state();
        let stored = store_handler(State(state.clone()), Json(item("a", json!({}), None)))
            .await
            .unwrap();
        assert_eq!(stored.0, 0);

        let image = state.cache.read().await.snapshot();
        let remaining = image.entries[0].expires_at - crate::clock::current_timestamp_ms();
        assert!(remaining > 590_000 && remaining <= 600_000);
    }

    #[tokio::test]
    async fn test_store_invalid_key() {
        let state = test_state();
        let req = CacheItemRequest {
            key: String::new(),
            data: Map::new(),
            ttl: None,
        };

        let result = store_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.capacity, 1000);
    }
}
