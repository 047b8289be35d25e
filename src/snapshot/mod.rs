//! Snapshot Module
//!
//! Periodic JSON snapshots of store state, restored once at startup.
//!
//! Stores never touch the filesystem. They implement [`Persistent`] and a
//! [`SnapshotManager`] owns the file, the restore-on-start and the save loop.

mod manager;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SnapshotError;

pub use manager::{LoadOutcome, SnapshotManager};

// == Persistent Trait ==
/// A store whose full state can be captured and replaced.
#[async_trait]
pub trait Persistent: Send + Sync + 'static {
    /// Serialized form of the full state.
    type Image: Serialize + DeserializeOwned + Send + 'static;

    /// Captures the current state. Concurrent writers may or may not be
    /// reflected; the image is best-effort, not transactional.
    async fn snapshot(&self) -> Self::Image;

    /// Replaces the current state with `image`.
    ///
    /// On error the store must be left exactly as it was.
    async fn restore(&self, image: Self::Image) -> Result<(), SnapshotError>;
}
