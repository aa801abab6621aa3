//! Reconciliation outcomes and per-pass reports

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Error, ErrorClass};

/// What reconciling one pair did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// Digests match; nothing was written.
    Identical,
    RemoteMissingRemoveFromTracking,
    LocalMissingRemoveFromTracking,
    UploadedLocal,
    DownloadedRemote,
    UserDeclinedNoAction,
    /// Digests differ but the remote change time is unavailable; kept as is.
    IndeterminateKeep,
}

impl ReconciliationOutcome {
    /// Whether the pair must be dropped from tracking once the pass ends.
    pub fn should_prune(self) -> bool {
        matches!(
            self,
            Self::RemoteMissingRemoveFromTracking | Self::LocalMissingRemoveFromTracking
        )
    }

    /// Whether either side was written.
    pub fn wrote(self) -> bool {
        matches!(self, Self::UploadedLocal | Self::DownloadedRemote)
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Identical => "identical",
            Self::RemoteMissingRemoveFromTracking => "remote missing, removed from tracking",
            Self::LocalMissingRemoveFromTracking => "local missing, removed from tracking",
            Self::UploadedLocal => "uploaded local version",
            Self::DownloadedRemote => "downloaded remote version",
            Self::UserDeclinedNoAction => "declined, no action",
            Self::IndeterminateKeep => "remote change time unavailable, kept",
        };
        f.write_str(label)
    }
}

/// Why a pass was run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PassTrigger {
    /// The file-check interval elapsed.
    Schedule,
    /// Watched processes stopped running.
    ProcessExit { processes: Vec<String> },
    /// Requested directly, e.g. `file-backup check`.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairResult {
    pub remote_path: String,
    pub outcome: ReconciliationOutcome,
}

/// A pair left untouched this pass because reconciling it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPair {
    pub remote_path: String,
    pub class: ErrorClass,
    pub message: String,
}

/// Everything one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub trigger: PassTrigger,
    pub started_at: DateTime<Utc>,
    pub results: Vec<PairResult>,
    pub skipped: Vec<SkippedPair>,
    /// Remote paths removed from tracking at the end of the pass.
    pub pruned: Vec<String>,
}

impl PassReport {
    pub fn new(trigger: PassTrigger) -> Self {
        Self {
            trigger,
            started_at: Utc::now(),
            results: Vec::new(),
            skipped: Vec::new(),
            pruned: Vec::new(),
        }
    }

    pub fn record(&mut self, remote_path: &str, outcome: ReconciliationOutcome) {
        self.results.push(PairResult {
            remote_path: remote_path.to_string(),
            outcome,
        });
    }

    pub fn skip(&mut self, remote_path: &str, error: &Error) {
        self.skipped.push(SkippedPair {
            remote_path: remote_path.to_string(),
            class: error.class(),
            message: error.to_string(),
        });
    }

    pub fn outcome_for(&self, remote_path: &str) -> Option<ReconciliationOutcome> {
        self.results
            .iter()
            .find(|r| r.remote_path == remote_path)
            .map(|r| r.outcome)
    }

    /// Remote paths whose outcome requires pruning, in pass order.
    pub fn prune_candidates(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.outcome.should_prune())
            .map(|r| r.remote_path.clone())
            .collect()
    }

    pub fn count(&self, outcome: ReconciliationOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }
}
