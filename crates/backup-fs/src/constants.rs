//! Shared constants for file-backup filesystem operations.

/// Suffix appended to a local path to name its backup snapshot.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Read buffer size used when hashing file contents.
pub const HASH_CHUNK_SIZE: usize = 8 * 1024;

/// Suffix of the advisory lock file placed next to an atomically written file.
pub const LOCK_SUFFIX: &str = ".lock";
