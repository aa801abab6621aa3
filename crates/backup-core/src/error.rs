//! Error types for backup-core

use std::path::PathBuf;

use crate::tracking::IntervalKind;

/// Result type for backup-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in backup-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Divergence detected but there is no reliable timestamp to resolve it
    #[error("Cannot resolve divergence for '{path}': {reason}")]
    ConflictIndeterminate { path: String, reason: String },

    #[error("'{remote_path}' is already tracked (local file {})", local_path.display())]
    AlreadyTracked {
        remote_path: String,
        local_path: PathBuf,
    },

    #[error("{} is already tracked as '{remote_path}'", local_path.display())]
    LocalAlreadyTracked {
        local_path: PathBuf,
        remote_path: String,
    },

    #[error("'{remote_path}' is not tracked")]
    NotTracked { remote_path: String },

    #[error("{kind} check interval must be at least 1 minute, got {minutes}")]
    InvalidInterval { kind: IntervalKind, minutes: u64 },

    /// The tracking file exists but cannot be understood. Fatal at startup.
    #[error("Tracking file {} is corrupt: {message}", path.display())]
    CorruptState { path: PathBuf, message: String },

    // Transparent wrappers for underlying crate errors
    /// Remote store error from backup-remote
    #[error(transparent)]
    Remote(#[from] backup_remote::RemoteError),

    /// Filesystem error from backup-fs
    #[error(transparent)]
    Fs(#[from] backup_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The coarse categories every error is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Network, auth or remote API failure. The pair is skipped this pass.
    Transport,
    /// Object or local file absent.
    NotFound,
    /// Divergence without a comparison point. Retried next pass.
    ConflictIndeterminate,
    /// A local file stayed busy for every retry attempt.
    PermissionLocked,
    Other,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Transport => "transport",
            Self::NotFound => "not found",
            Self::ConflictIndeterminate => "conflict indeterminate",
            Self::PermissionLocked => "locked",
            Self::Other => "error",
        };
        f.write_str(label)
    }
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Remote(e) if e.is_not_found() => ErrorClass::NotFound,
            Self::Remote(_) => ErrorClass::Transport,
            Self::Fs(e) if e.is_locked() => ErrorClass::PermissionLocked,
            Self::Fs(e) if e.is_not_found() => ErrorClass::NotFound,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorClass::NotFound,
            Self::Io(e) if backup_fs::is_locked_error(e) => ErrorClass::PermissionLocked,
            Self::ConflictIndeterminate { .. } => ErrorClass::ConflictIndeterminate,
            _ => ErrorClass::Other,
        }
    }

    /// Only a tracking file that cannot be read ends the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CorruptState { .. })
    }
}
