//! API Module
//!
//! HTTP handlers and routing for the cache, limits and metrics services.
//!
//! # Services
//! - Cache: `POST /cache`, `GET /cache?key=...`, `GET /cache/stats`
//! - Limits: `GET|POST /<limit>`, `GET|POST /user_limit/:username`
//! - Metrics: `POST /metrics/:metric`, `/metrics/active_users`, `GET /metrics`
//!
//! Every service also answers `GET /health`.

pub mod cache;
pub mod limits;
pub mod metrics;
pub mod routes;
mod state;

pub use routes::{cache_router, limits_router, metrics_router};
pub use state::AppState;
