//! Limit Store Module
//!
//! Byte-size limits: three global scalars plus per-user overrides of the
//! default user limit.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::SnapshotError;
use crate::limits::{
    LimitKind, DEFAULT_FILE_LIMIT, DEFAULT_FOLDER_LIMIT, DEFAULT_USER_LIMIT_SIZE,
};
use crate::snapshot::Persistent;

// == Limit Store ==
/// Mutable limit values. No expiry; values change only when overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitStore {
    file: u64,
    default_user: u64,
    folder: u64,
    /// Per-user overrides of `default_user`
    per_user: HashMap<String, u64>,
}

impl Default for LimitStore {
    fn default() -> Self {
        Self {
            file: DEFAULT_FILE_LIMIT,
            default_user: DEFAULT_USER_LIMIT_SIZE,
            folder: DEFAULT_FOLDER_LIMIT,
            per_user: HashMap::new(),
        }
    }
}

impl LimitStore {
    /// Creates a store holding the built-in default limits.
    pub fn new() -> Self {
        Self::default()
    }

    // == Scalar Limits ==
    pub fn get(&self, kind: LimitKind) -> u64 {
        match kind {
            LimitKind::File => self.file,
            LimitKind::DefaultUser => self.default_user,
            LimitKind::Folder => self.folder,
        }
    }

    pub fn set(&mut self, kind: LimitKind, value: u64) {
        let slot = match kind {
            LimitKind::File => &mut self.file,
            LimitKind::DefaultUser => &mut self.default_user,
            LimitKind::Folder => &mut self.folder,
        };
        *slot = value;
    }

    // == Per-User Limits ==
    /// Returns the override for `username`, or the default user limit.
    pub fn user_limit(&self, username: &str) -> u64 {
        self.per_user
            .get(username)
            .copied()
            .unwrap_or(self.default_user)
    }

    /// Sets an override that shadows the default user limit for `username` only.
    pub fn set_user_limit(&mut self, username: impl Into<String>, value: u64) {
        self.per_user.insert(username.into(), value);
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> LimitsImage {
        LimitsImage {
            default_file_limit: self.file,
            default_user_limit_size: self.default_user,
            default_folder_limit: self.folder,
            user_limit_size: self.per_user.clone(),
        }
    }

    /// Replaces every limit with the values in `image`.
    pub fn restore(&mut self, image: LimitsImage) {
        self.file = image.default_file_limit;
        self.default_user = image.default_user_limit_size;
        self.folder = image.default_folder_limit;
        self.per_user = image.user_limit_size;
    }
}

// == Snapshot Image ==
/// Persisted form of a [`LimitStore`].
///
/// Field names are upper snake case on disk. A field missing from the file
/// takes its built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct LimitsImage {
    pub default_file_limit: u64,
    pub default_user_limit_size: u64,
    pub default_folder_limit: u64,
    pub user_limit_size: HashMap<String, u64>,
}

impl Default for LimitsImage {
    fn default() -> Self {
        LimitStore::default().snapshot()
    }
}

#[async_trait]
impl Persistent for RwLock<LimitStore> {
    type Image = LimitsImage;

    async fn snapshot(&self) -> LimitsImage {
        self.read().await.snapshot()
    }

    async fn restore(&self, image: LimitsImage) -> Result<(), SnapshotError> {
        let overrides = image.user_limit_size.len();
        self.write().await.restore(image);
        info!(overrides, "limits restored from snapshot");
        Ok(())
    }
}
