//! Statekeeper - in-memory state services with periodic snapshots
//!
//! Hosts an expiring key/value cache, byte-size limits and a metrics
//! aggregator. Each keeps its state in memory and, where durable, writes a
//! JSON snapshot on a fixed interval that is restored at startup.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod limits;
pub mod models;
pub mod snapshot;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use snapshot::{Persistent, SnapshotManager};
pub use tasks::spawn_cleanup_task;
