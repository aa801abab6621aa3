//! The persisted tracking document

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use backup_fs::NormalizedPath;
use backup_remote::ExclusionRules;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FILE_CHECK_MINUTES: u64 = 60;
pub const DEFAULT_PROCESS_CHECK_MINUTES: u64 = 90;

/// One synchronized file: a remote object and where it lives locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPair {
    pub remote_path: String,
    pub local_path: PathBuf,
}

impl TrackedPair {
    pub fn new(remote_path: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_path: backup_remote::normalize_remote_path(&remote_path.into()),
            local_path: local_path.into(),
        }
    }
}

/// Which of the two schedules an interval belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    File,
    Process,
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Process => f.write_str("process"),
        }
    }
}

/// Everything the engine needs to know about what is synchronized.
///
/// Fields missing from an existing file take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingState {
    /// Tracked pairs in insertion order. Remote paths are unique.
    pub pairs: Vec<TrackedPair>,
    pub exclusion_rules: ExclusionRules,
    pub watched_processes: BTreeSet<String>,
    pub file_check_interval_minutes: u64,
    pub process_check_interval_minutes: u64,
    pub prompt_on_divergence: bool,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            exclusion_rules: ExclusionRules::default(),
            watched_processes: BTreeSet::new(),
            file_check_interval_minutes: DEFAULT_FILE_CHECK_MINUTES,
            process_check_interval_minutes: DEFAULT_PROCESS_CHECK_MINUTES,
            prompt_on_divergence: true,
        }
    }
}

impl TrackingState {
    pub fn find(&self, remote_path: &str) -> Option<&TrackedPair> {
        let remote_path = backup_remote::normalize_remote_path(remote_path);
        self.pairs.iter().find(|p| p.remote_path == remote_path)
    }

    /// The pair whose local file is `local_path`, compared in normalized form.
    pub fn find_by_local(&self, local_path: &Path) -> Option<&TrackedPair> {
        let wanted = NormalizedPath::new(local_path);
        self.pairs
            .iter()
            .find(|p| NormalizedPath::new(&p.local_path) == wanted)
    }

    pub fn is_tracked(&self, remote_path: &str) -> bool {
        self.find(remote_path).is_some()
    }

    pub fn interval_minutes(&self, kind: IntervalKind) -> u64 {
        match kind {
            IntervalKind::File => self.file_check_interval_minutes,
            IntervalKind::Process => self.process_check_interval_minutes,
        }
    }
}
