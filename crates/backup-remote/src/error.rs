//! Error types for backup-remote

/// Result type for remote store operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors surfaced by a [`crate::RemoteStore`]
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote object '{path}' not found")]
    NotFound { path: String },

    #[error("Transport error for '{path}': {message}")]
    Transport { path: String, message: String },

    /// The existence check that supplied the update token no longer holds.
    #[error("Remote object '{path}' changed while it was being written")]
    Stale { path: String },

    #[error("Could not decode remote object '{path}': {message}")]
    Decode { path: String, message: String },
}

impl RemoteError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn transport(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Network, auth, API and race failures. A stale update token is a
    /// transport-class failure: it is surfaced, never silently retried.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Stale { .. } | Self::Decode { .. })
    }
}
