//! Adding and removing tracked pairs
//!
//! A pair is recorded only after its first transfer succeeded, so the
//! tracking file never names a pair whose two sides were never made equal.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use backup_fs::{NormalizedPath, RetryPolicy, io};
use backup_remote::{ExclusionRules, RemoteStore, normalize_remote_path};
use tracing::{info, warn};

use crate::tracking::{TrackedPair, TrackingState, TrackingStore};
use crate::{Error, Result};

/// Per-item results of a directory operation. One failure never stops the batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub tracked: Vec<TrackedPair>,
    /// The item that failed (a local path or a remote path) and why.
    pub failed: Vec<(String, Error)>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.failed.is_empty()
    }
}

/// Result of [`Tracker::untrack_and_delete`].
#[derive(Debug)]
pub struct Untracked {
    pub pair: TrackedPair,
    /// `false` when the remote object was already gone.
    pub remote_deleted: bool,
}

/// Tracking operations over one store and one remote.
pub struct Tracker<'a> {
    store: &'a TrackingStore,
    remote: &'a dyn RemoteStore,
    retry: RetryPolicy,
}

impl<'a> Tracker<'a> {
    pub fn new(store: &'a TrackingStore, remote: &'a dyn RemoteStore) -> Self {
        Self {
            store,
            remote,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upload `local` to `remote_path` and start tracking the pair.
    pub fn track_local_file(&self, local: &Path, remote_path: &str) -> Result<TrackedPair> {
        let local = absolute(local)?;
        if !local.is_file() {
            return Err(missing(&local));
        }
        let pair = TrackedPair::new(remote_path, local);
        ensure_untracked(&self.store.load()?, &pair)?;

        let bytes = io::read_bytes(&NormalizedPath::new(&pair.local_path), self.retry)?;
        self.remote.put_object(&pair.remote_path, &bytes)?;
        self.store.add_pair(pair.clone())?;
        info!(
            remote_path = %pair.remote_path,
            size = bytes.len(),
            "local file uploaded and tracked"
        );
        Ok(pair)
    }

    /// Regular files directly inside `dir`, sorted by name.
    pub fn plan_local_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| backup_fs::Error::io(dir, e))? {
            let entry = entry.map_err(|e| backup_fs::Error::io(dir, e))?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// [`track_local_file`](Self::track_local_file) for every file directly in
    /// `dir`, mapped to `remote_folder/<file name>`.
    pub fn track_local_dir(&self, dir: &Path, remote_folder: &str) -> Result<BatchReport> {
        let folder = normalize_remote_path(remote_folder);
        let mut report = BatchReport::default();
        for file in self.plan_local_dir(dir)? {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let remote_path = if folder.is_empty() {
                name
            } else {
                format!("{folder}/{name}")
            };
            match self.track_local_file(&file, &remote_path) {
                Ok(pair) => report.tracked.push(pair),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "could not track file");
                    report.failed.push((file.display().to_string(), e));
                }
            }
        }
        Ok(report)
    }

    /// Download `remote_path` to `local` and start tracking the pair.
    ///
    /// An existing local file is snapshotted before it is replaced.
    pub fn track_remote_file(&self, remote_path: &str, local: &Path) -> Result<TrackedPair> {
        let pair = TrackedPair::new(remote_path, absolute(local)?);
        ensure_untracked(&self.store.load()?, &pair)?;

        let bytes = self.remote.get_object_content(&pair.remote_path)?;
        let target = NormalizedPath::new(&pair.local_path);
        io::snapshot(&target, self.retry)?;
        io::replace_file(&target, &bytes, self.retry)?;
        self.store.add_pair(pair.clone())?;
        info!(
            remote_path = %pair.remote_path,
            local_path = %target,
            "remote file downloaded and tracked"
        );
        Ok(pair)
    }

    /// Remote objects a directory download would cover.
    pub fn plan_remote_dir(
        &self,
        remote_folder: &str,
        rules: &ExclusionRules,
    ) -> Result<Vec<String>> {
        self.list_remote(remote_folder, rules)
    }

    /// Download every object under `remote_folder` into `local_dir/<base name>`
    /// and track each one.
    pub fn track_remote_dir(
        &self,
        remote_folder: &str,
        local_dir: &Path,
        rules: &ExclusionRules,
    ) -> Result<BatchReport> {
        let objects = self.plan_remote_dir(remote_folder, rules)?;
        fs::create_dir_all(local_dir).map_err(|e| backup_fs::Error::io(local_dir, e))?;

        let mut report = BatchReport::default();
        for remote_path in objects {
            let name = remote_path.rsplit('/').next().unwrap_or(&remote_path);
            match self.track_remote_file(&remote_path, &local_dir.join(name)) {
                Ok(pair) => report.tracked.push(pair),
                Err(e) => {
                    warn!(%remote_path, error = %e, "could not track remote file");
                    report.failed.push((remote_path, e));
                }
            }
        }
        Ok(report)
    }

    /// Stop tracking without touching either side.
    pub fn untrack(&self, remote_path: &str) -> Result<TrackedPair> {
        let pair = self.store.remove_pair(remote_path)?;
        info!(remote_path = %pair.remote_path, "pair untracked");
        Ok(pair)
    }

    /// Stop tracking, then delete the remote object.
    ///
    /// A remote object that is already gone is reported through
    /// [`Untracked::remote_deleted`]. Any other delete failure is returned;
    /// the pair stays untracked either way.
    pub fn untrack_and_delete(&self, remote_path: &str) -> Result<Untracked> {
        let pair = self.store.remove_pair(remote_path)?;
        match self.remote.delete_object(&pair.remote_path) {
            Ok(()) => {
                info!(remote_path = %pair.remote_path, "pair untracked and remote object deleted");
                Ok(Untracked {
                    pair,
                    remote_deleted: true,
                })
            }
            Err(e) if e.is_not_found() => {
                warn!(remote_path = %pair.remote_path, "remote object was already gone");
                Ok(Untracked {
                    pair,
                    remote_deleted: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remote objects under `prefix`, applying `rules` plus the built-in defaults.
    pub fn list_remote(&self, prefix: &str, rules: &ExclusionRules) -> Result<Vec<String>> {
        Ok(self.remote.list_objects(prefix, &rules.with_defaults())?)
    }
}

fn ensure_untracked(state: &TrackingState, pair: &TrackedPair) -> Result<()> {
    if let Some(existing) = state.find(&pair.remote_path) {
        return Err(Error::AlreadyTracked {
            remote_path: existing.remote_path.clone(),
            local_path: existing.local_path.clone(),
        });
    }
    if let Some(existing) = state.find_by_local(&pair.local_path) {
        return Err(Error::LocalAlreadyTracked {
            local_path: pair.local_path.clone(),
            remote_path: existing.remote_path.clone(),
        });
    }
    Ok(())
}

/// Absolute form of `path`, resolving symlinks when it exists.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return dunce::canonicalize(path).map_err(|e| backup_fs::Error::io(path, e).into());
    }
    let abs = std::path::absolute(path).map_err(|e| backup_fs::Error::io(path, e))?;
    match (abs.parent(), abs.file_name()) {
        (Some(parent), Some(name)) if parent.exists() => dunce::canonicalize(parent)
            .map(|p| p.join(name))
            .map_err(|e| backup_fs::Error::io(parent, e).into()),
        _ => Ok(abs),
    }
}

fn missing(path: &Path) -> Error {
    let source = std::io::Error::new(ErrorKind::NotFound, "not a regular file");
    backup_fs::Error::io(path, source).into()
}
