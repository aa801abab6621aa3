//! Tracking store: the durable record of what is synchronized
//!
//! Every mutation loads the current file, applies the change and saves the
//! whole document before returning, so the on-disk state never lags behind a
//! successful call. Writes are atomic (see [`backup_fs::io::write_atomic`]).

mod state;

pub use state::{
    DEFAULT_FILE_CHECK_MINUTES, DEFAULT_PROCESS_CHECK_MINUTES, IntervalKind, TrackedPair,
    TrackingState,
};

use std::path::PathBuf;

use backup_fs::{ConfigStore, NormalizedPath};
use tracing::{debug, info};

use crate::{Error, Result};

/// File name used under the platform config directory.
pub const DEFAULT_STATE_FILE: &str = "tracking.json";

/// Loads and saves [`TrackingState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct TrackingStore {
    path: NormalizedPath,
    config: ConfigStore,
}

impl TrackingStore {
    /// A store for the document at `path`. Nothing is read until [`load`](Self::load).
    pub fn open(path: impl Into<NormalizedPath>) -> Self {
        Self {
            path: path.into(),
            config: ConfigStore::new(),
        }
    }

    /// `<config dir>/file-backup/tracking.json`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("file-backup").join(DEFAULT_STATE_FILE))
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Read the current state, creating the file with defaults when absent.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptState`] when the file exists but cannot be parsed.
    pub fn load(&self) -> Result<TrackingState> {
        if !self.path.exists() {
            let state = TrackingState::default();
            self.save(&state)?;
            info!(path = %self.path, "created default tracking file");
            return Ok(state);
        }
        match self.config.load(&self.path) {
            Ok(state) => Ok(state),
            Err(backup_fs::Error::ConfigParse { path, message, .. }) => {
                Err(Error::CorruptState { path, message })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the full state atomically.
    pub fn save(&self, state: &TrackingState) -> Result<()> {
        self.config.save(&self.path, state)?;
        debug!(path = %self.path, pairs = state.pairs.len(), "tracking file saved");
        Ok(())
    }

    fn update<T>(&self, mutate: impl FnOnce(&mut TrackingState) -> Result<T>) -> Result<T> {
        let mut state = self.load()?;
        let value = mutate(&mut state)?;
        self.save(&state)?;
        Ok(value)
    }

    /// Record a new pair.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyTracked`] if the remote path is taken,
    /// [`Error::LocalAlreadyTracked`] if the local file is tracked under
    /// another remote path.
    pub fn add_pair(&self, pair: TrackedPair) -> Result<()> {
        self.update(|state| {
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
            info!(
                remote_path = %pair.remote_path,
                local_path = %pair.local_path.display(),
                "tracking pair added"
            );
            state.pairs.push(pair);
            Ok(())
        })
    }

    /// Stop tracking `remote_path`, returning the removed pair.
    pub fn remove_pair(&self, remote_path: &str) -> Result<TrackedPair> {
        let remote_path = backup_remote::normalize_remote_path(remote_path);
        self.update(|state| {
            let idx = state
                .pairs
                .iter()
                .position(|p| p.remote_path == remote_path)
                .ok_or_else(|| Error::NotTracked {
                    remote_path: remote_path.clone(),
                })?;
            Ok(state.pairs.remove(idx))
        })
    }

    /// Remove every listed remote path that is still tracked, in one save.
    /// Paths no longer present are ignored.
    pub fn remove_pairs(&self, remote_paths: &[String]) -> Result<Vec<TrackedPair>> {
        if remote_paths.is_empty() {
            return Ok(Vec::new());
        }
        self.update(|state| {
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pairs)
                .into_iter()
                .partition(|p| remote_paths.contains(&p.remote_path));
            state.pairs = kept;
            Ok(removed)
        })
    }

    pub fn set_interval(&self, kind: IntervalKind, minutes: u64) -> Result<()> {
        if minutes < 1 {
            return Err(Error::InvalidInterval { kind, minutes });
        }
        self.update(|state| {
            match kind {
                IntervalKind::File => state.file_check_interval_minutes = minutes,
                IntervalKind::Process => state.process_check_interval_minutes = minutes,
            }
            Ok(())
        })
    }

    /// Returns `false` when the rule was already present.
    pub fn add_exclusion(&self, rule: &str) -> Result<bool> {
        self.update(|state| Ok(state.exclusion_rules.add(rule)))
    }

    /// Returns `false` when the rule was not present.
    pub fn remove_exclusion(&self, rule: &str) -> Result<bool> {
        self.update(|state| Ok(state.exclusion_rules.remove(rule)))
    }

    /// Returns `false` when the process was already watched.
    pub fn add_watched_process(&self, name: &str) -> Result<bool> {
        self.update(|state| Ok(state.watched_processes.insert(name.to_string())))
    }

    /// Returns `false` when the process was not watched.
    pub fn remove_watched_process(&self, name: &str) -> Result<bool> {
        self.update(|state| Ok(state.watched_processes.remove(name)))
    }

    pub fn set_prompt_on_divergence(&self, enabled: bool) -> Result<()> {
        self.update(|state| {
            state.prompt_on_divergence = enabled;
            Ok(())
        })
    }
}
