//! Snapshot Manager
//!
//! Restores a store from its snapshot file once, then rewrites the file on a
//! fixed interval for the life of the process.
//!
//! The loop is either idle (waiting for the next tick) or persisting (taking
//! the image and writing it). A failed write is logged and the next tick
//! tries again. Writes overwrite the file in place; there is no final flush
//! on shutdown, so up to one interval of changes can be lost.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::SnapshotError;
use crate::snapshot::Persistent;

/// Shortest allowed interval between snapshot writes.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

// == Load Outcome ==
/// What happened when the snapshot file was read at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was applied to the store
    Restored,
    /// No file yet; the store keeps its defaults
    Missing,
    /// The file was unreadable or rejected; the store keeps its defaults
    Discarded,
}

// == Snapshot Manager ==
/// Owns the snapshot file of one store.
#[derive(Debug)]
pub struct SnapshotManager<T> {
    /// Name used in log lines
    label: &'static str,
    target: Arc<T>,
    path: PathBuf,
    interval: Duration,
}

impl<T: Persistent> SnapshotManager<T> {
    /// Creates a manager for `target` writing to `path` every `interval`.
    pub fn new(
        label: &'static str,
        target: Arc<T>,
        path: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            label,
            target,
            path: path.into(),
            interval: interval.max(MIN_INTERVAL),
        }
    }

    // == Start ==
    /// Restores the store from disk, then spawns the periodic save loop.
    ///
    /// The restore completes before this returns, so callers can start
    /// serving requests knowing the store holds its recovered state. The
    /// first save happens immediately after.
    pub async fn start(self) -> JoinHandle<()> {
        self.load().await;
        tokio::spawn(self.run())
    }

    // == Load ==
    /// Reads the snapshot file and applies it to the store.
    ///
    /// Never fails: a missing file is expected on first boot, and a corrupt
    /// or rejected file is discarded as a whole.
    pub async fn load(&self) -> LoadOutcome {
        let image = match self.read_image().await {
            Ok(Some(image)) => image,
            Ok(None) => {
                info!(
                    store = self.label,
                    path = %self.path.display(),
                    "no snapshot found, starting from defaults"
                );
                return LoadOutcome::Missing;
            }
            Err(e) => {
                warn!(
                    store = self.label,
                    path = %self.path.display(),
                    error = %e,
                    "unable to read snapshot, starting from defaults"
                );
                return LoadOutcome::Discarded;
            }
        };

        match self.target.restore(image).await {
            Ok(()) => {
                info!(
                    store = self.label,
                    path = %self.path.display(),
                    "snapshot restored"
                );
                LoadOutcome::Restored
            }
            Err(e) => {
                warn!(
                    store = self.label,
                    path = %self.path.display(),
                    error = %e,
                    "snapshot rejected, starting from defaults"
                );
                LoadOutcome::Discarded
            }
        }
    }

    async fn read_image(&self) -> Result<Option<T::Image>, SnapshotError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    // == Persist ==
    /// Writes the store's current image to the snapshot file.
    ///
    /// Creates missing parent directories. Returns the number of bytes written.
    pub async fn persist(&self) -> Result<usize, SnapshotError> {
        let bytes = {
            let image = self.target.snapshot().await;
            serde_json::to_vec(&image)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, &bytes).await?;
        Ok(bytes.len())
    }

    async fn run(self) {
        info!(
            store = self.label,
            "Starting snapshot task with interval of {:?}", self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.persist().await {
                Ok(bytes) => debug!(store = self.label, bytes, "snapshot written"),
                Err(e) => error!(
                    store = self.label,
                    path = %self.path.display(),
                    error = %e,
                    "failed to write snapshot"
                ),
            }
        }
    }
}
