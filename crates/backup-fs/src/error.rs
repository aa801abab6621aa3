//! Error types for backup-fs

use std::path::PathBuf;

/// Result type for backup-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in backup-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Failed to serialize {format} config for {path}: {message}")]
    ConfigSerialize {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },

    /// The file stayed busy (held by another process or a sync client)
    /// for every retry attempt.
    #[error("{path} is locked by another process (gave up after {attempts} attempts)")]
    Locked { path: PathBuf, attempts: u32 },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// True when the operation gave up because the file stayed locked.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. } | Self::LockFailed { .. })
    }
}
