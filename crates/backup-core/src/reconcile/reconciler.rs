//! Reconciling one tracked pair

use std::fs::File;

use backup_fs::{
    ContentDigest, NormalizedPath, RetryPolicy, hash_bytes, hash_reader, io, retry_locked,
};
use backup_remote::RemoteStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::decision::{Decision, DecisionPort, Direction};
use super::outcome::ReconciliationOutcome;
use crate::Result;
use crate::tracking::TrackedPair;

/// Decides and applies the outcome for one pair at a time.
///
/// Digests are always computed locally from both sides' bytes. On divergence
/// the newer side wins; equal timestamps resolve to the remote. Any local file
/// about to be overwritten is snapshotted first.
pub struct Reconciler<'a> {
    remote: &'a dyn RemoteStore,
    decisions: &'a dyn DecisionPort,
    retry: RetryPolicy,
    prompt_on_divergence: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(remote: &'a dyn RemoteStore, decisions: &'a dyn DecisionPort) -> Self {
        Self {
            remote,
            decisions,
            retry: RetryPolicy::default(),
            prompt_on_divergence: true,
        }
    }

    /// Retry policy for locked local files.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// When disabled, divergences are acted on without consulting the port.
    pub fn prompt_on_divergence(mut self, enabled: bool) -> Self {
        self.prompt_on_divergence = enabled;
        self
    }

    pub fn reconcile(&self, pair: &TrackedPair) -> Result<ReconciliationOutcome> {
        let local = NormalizedPath::new(&pair.local_path);
        let remote_path = pair.remote_path.as_str();

        if !local.is_file() {
            info!(remote_path, local_path = %local, "local file missing");
            return Ok(ReconciliationOutcome::LocalMissingRemoveFromTracking);
        }

        let remote_bytes = match self.remote.get_object_content(remote_path) {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => {
                info!(remote_path, "remote object missing");
                return Ok(ReconciliationOutcome::RemoteMissingRemoveFromTracking);
            }
            Err(e) => return Err(e.into()),
        };

        let local_digest = self.local_digest(&local)?;
        let remote_digest = hash_bytes(&remote_bytes);
        debug!(remote_path, local = %local_digest, remote = %remote_digest, "digests computed");
        if local_digest == remote_digest {
            return Ok(ReconciliationOutcome::Identical);
        }

        let remote_modified = match self.remote.get_last_change_time(remote_path) {
            Ok(time) => time,
            Err(e) => {
                warn!(
                    remote_path,
                    error = %e,
                    "cannot resolve divergence without the remote change time"
                );
                return Ok(ReconciliationOutcome::IndeterminateKeep);
            }
        };
        let local_modified: DateTime<Utc> = io::modified_time(&local)?.into();

        let decision = Decision {
            remote_path: pair.remote_path.clone(),
            local_path: pair.local_path.clone(),
            direction: resolve_direction(local_modified, remote_modified),
            local_modified,
            remote_modified,
        };
        info!(
            remote_path,
            direction = ?decision.direction,
            %local_modified,
            %remote_modified,
            "content diverged"
        );

        if self.prompt_on_divergence && !self.decisions.confirm(&decision) {
            info!(remote_path, "divergence left unresolved by request");
            return Ok(ReconciliationOutcome::UserDeclinedNoAction);
        }

        match decision.direction {
            Direction::Download => {
                self.download(&local, &remote_bytes)?;
                Ok(ReconciliationOutcome::DownloadedRemote)
            }
            Direction::Upload => {
                let bytes = io::read_bytes(&local, self.retry)?;
                self.remote.put_object(remote_path, &bytes)?;
                info!(remote_path, size = bytes.len(), "uploaded local version");
                Ok(ReconciliationOutcome::UploadedLocal)
            }
        }
    }

    /// Snapshot whatever is at `local`, then replace it with `bytes`.
    pub fn download(&self, local: &NormalizedPath, bytes: &[u8]) -> Result<()> {
        if let Some(snapshot) = io::snapshot(local, self.retry)? {
            debug!(local = %local, snapshot = %snapshot, "local file snapshotted");
        }
        io::replace_file(local, bytes, self.retry)?;
        info!(local = %local, size = bytes.len(), "downloaded remote version");
        Ok(())
    }

    fn local_digest(&self, local: &NormalizedPath) -> Result<ContentDigest> {
        let native = local.to_native();
        Ok(retry_locked(self.retry, &native, || {
            File::open(&native).and_then(hash_reader)
        })?)
    }
}

/// Newer local wins; ties and older local go to the remote.
pub fn resolve_direction(local: DateTime<Utc>, remote: DateTime<Utc>) -> Direction {
    if local > remote {
        Direction::Upload
    } else {
        Direction::Download
    }
}
