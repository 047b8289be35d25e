//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//!
//! Snapshot loops live with their manager in [`crate::snapshot`].

mod cleanup;

pub use cleanup::spawn_cleanup_task;
