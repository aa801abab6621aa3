//! Decision port consulted before acting on a divergence

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Which side a divergence resolves towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local is newer; push it to the remote.
    Upload,
    /// Remote is newer or equally old; overwrite the local file.
    Download,
}

/// A pending action on a diverged pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub direction: Direction,
    pub local_modified: DateTime<Utc>,
    pub remote_modified: DateTime<Utc>,
}

/// Whoever confirms divergence actions: a terminal prompt, a fixed policy, a test.
pub trait DecisionPort: Send + Sync {
    /// `true` to proceed with `decision`, `false` to leave both sides untouched.
    fn confirm(&self, decision: &Decision) -> bool;
}

/// A port that answers every decision the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPolicy {
    AlwaysAct,
    NeverAct,
}

impl DecisionPort for DecisionPolicy {
    fn confirm(&self, _decision: &Decision) -> bool {
        matches!(self, Self::AlwaysAct)
    }
}
