//! Limits Module
//!
//! Configurable byte-size limits with per-user overrides.

mod store;

pub use store::{LimitStore, LimitsImage};

// == Default Limits ==
/// 512 MB
pub const DEFAULT_FILE_LIMIT: u64 = 512_000_000;
/// 1 GB
pub const DEFAULT_USER_LIMIT_SIZE: u64 = 1_000_000_000;
/// 10 GB
pub const DEFAULT_FOLDER_LIMIT: u64 = 10_000_000_000;

// == Limit Kind ==
/// The three global limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// Largest single file
    File,
    /// Per-user quota when no override is set
    DefaultUser,
    /// Largest folder
    Folder,
}

impl LimitKind {
    pub const ALL: [LimitKind; 3] = [LimitKind::File, LimitKind::DefaultUser, LimitKind::Folder];

    /// Route segment naming this limit.
    pub fn name(self) -> &'static str {
        match self {
            LimitKind::File => "default_file_limit",
            LimitKind::DefaultUser => "default_user_limit_size",
            LimitKind::Folder => "default_folder_limit",
        }
    }

    /// Parses a route segment produced by [`LimitKind::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}
