//! [`Workspace`] sandbox for engine and CLI tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use tempfile::TempDir;

/// A temporary directory holding local files and a tracking-state file.
///
/// # Example
///
/// ```rust,no_run
/// use backup_test_utils::Workspace;
///
/// let ws = Workspace::new();
/// let save = ws.write("saves/slot1.sav", b"progress");
/// ws.set_mtime("saves/slot1.sav", chrono::Utc::now());
/// assert!(save.exists());
/// ```
pub struct Workspace {
    temp_dir: TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// # Panics
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Workspace: failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `rel` inside the workspace.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Where the tracking state lives for this workspace.
    pub fn state_path(&self) -> PathBuf {
        self.path("state/tracking.json")
    }

    /// Writes `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.path(rel)).unwrap_or_else(|e| panic!("Workspace: cannot read {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Sets the modification time of `rel` to `when`, sub-second part included.
    pub fn set_mtime(&self, rel: &str, when: DateTime<Utc>) {
        let secs = u64::try_from(when.timestamp()).expect("Workspace: mtime before 1970");
        let time: SystemTime = UNIX_EPOCH + Duration::new(secs, when.timestamp_subsec_nanos());
        fs::File::options()
            .write(true)
            .open(self.path(rel))
            .and_then(|f| f.set_modified(time))
            .unwrap_or_else(|e| panic!("Workspace: cannot set mtime of {rel}: {e}"));
    }
}
