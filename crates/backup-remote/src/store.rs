//! The capability set the engine consumes from a remote object store

use chrono::{DateTime, Utc};

use crate::{ExclusionRules, Result};

/// Size and identity of a remote object, without its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub path: String,
    pub size: u64,
    /// Store-specific identity, e.g. a git blob id.
    pub identity: String,
}

/// A remote, version-controlled object store addressed by slash-separated
/// paths.
///
/// Every failure is returned as a typed [`crate::RemoteError`]; implementations
/// never retry on their own.
pub trait RemoteStore: Send + Sync {
    /// Short human-readable description used in logs, e.g. `github:owner/repo@main`.
    fn describe(&self) -> String;

    /// The decoded bytes of the object at `path`.
    fn get_object_content(&self, path: &str) -> Result<Vec<u8>>;

    /// Size and identity of the object at `path`.
    fn get_object_meta(&self, path: &str) -> Result<ObjectMeta>;

    /// Time of the most recent committed change to `path`.
    fn get_last_change_time(&self, path: &str) -> Result<DateTime<Utc>>;

    /// Create or update the object at `path`.
    ///
    /// The current version is resolved first and passed as the update token.
    /// If the object changes between that check and the write the call fails
    /// with [`crate::RemoteError::Stale`].
    fn put_object(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Delete the object at `path`.
    fn delete_object(&self, path: &str) -> Result<()>;

    /// Every object below `prefix` (recursively, in a stable order), skipping
    /// excluded files and pruning excluded directories. An empty prefix lists
    /// the whole store.
    fn list_objects(&self, prefix: &str, rules: &ExclusionRules) -> Result<Vec<String>>;
}

/// Canonical form of a remote path: forward slashes, no leading, trailing or
/// repeated separators.
pub fn normalize_remote_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}
