//! Atomic I/O operations with file locking

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;
use tracing::debug;

use crate::constants::{BACKUP_SUFFIX, LOCK_SUFFIX};
use crate::retry::{RetryPolicy, retry_locked};
use crate::{Error, NormalizedPath, Result};

/// Tuning knobs for [`write_atomic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// How long to wait for the advisory lock before failing.
    pub lock_timeout: Duration,
    /// Whether to fsync the temp file before renaming it into place.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            enable_fsync: true,
        }
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial write.
/// Concurrent writers are serialized through an advisory lock on a sidecar
/// `<file>.lock`; if the lock cannot be taken within `config.lock_timeout`
/// the write fails with [`Error::LockFailed`].
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();
    ensure_parent(path)?;

    let lock_path = path.with_suffix(LOCK_SUFFIX).to_native();
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;

    let wait = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(10))
        .with_max_interval(Duration::from_millis(200))
        .with_max_elapsed_time(Some(config.lock_timeout))
        .build();
    backoff::retry(wait, || {
        FileExt::try_lock_exclusive(&lock_file).map_err(backoff::Error::transient)
    })
    .map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let result = write_temp_then_rename(path, content, config.enable_fsync);

    // Lock is released on drop as well; unlock errors do not affect the write.
    let _ = FileExt::unlock(&lock_file);
    result
}

/// Replace the file at `path` with `content`, retrying while it is locked.
///
/// Unlike [`write_atomic`] no sidecar lock file is left next to the target,
/// which keeps user directories clean when overwriting tracked files.
pub fn replace_file(path: &NormalizedPath, content: &[u8], policy: RetryPolicy) -> Result<()> {
    ensure_parent(path)?;
    let native_path = path.to_native();
    retry_locked(policy, &native_path, || {
        ensure_not_held(&native_path)?;
        write_temp_then_rename(path, content, true).map_err(into_io)
    })
}

/// Copy `path` to `path` + [`BACKUP_SUFFIX`], overwriting any earlier snapshot.
///
/// Returns the snapshot path, or `None` when there was nothing to snapshot.
/// The original is copied, never moved, so it stays in place until the caller
/// overwrites it.
pub fn snapshot(path: &NormalizedPath, policy: RetryPolicy) -> Result<Option<NormalizedPath>> {
    if !path.is_file() {
        return Ok(None);
    }
    let backup = path.with_suffix(BACKUP_SUFFIX);
    let (source, dest) = (path.to_native(), backup.to_native());
    retry_locked(policy, &source, || {
        ensure_not_held(&source)?;
        fs::copy(&source, &dest)
    })?;
    debug!(from = %path, to = %backup, "snapshot created");
    Ok(Some(backup))
}

/// Read the whole file, retrying while it is locked.
pub fn read_bytes(path: &NormalizedPath, policy: RetryPolicy) -> Result<Vec<u8>> {
    let native_path = path.to_native();
    retry_locked(policy, &native_path, || fs::read(&native_path))
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically with default robustness settings.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes(), RobustnessConfig::default())
}

/// Last modification time of a file.
pub fn modified_time(path: &NormalizedPath) -> Result<SystemTime> {
    let native_path = path.to_native();
    fs::metadata(&native_path)
        .and_then(|meta| meta.modified())
        .map_err(|e| Error::io(&native_path, e))
}

/// Fails with `ResourceBusy` while another handle holds an exclusive lock on
/// `path`. A missing file is not held by anyone.
fn ensure_not_held(path: &Path) -> std::io::Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    match FileExt::try_lock_shared(&file) {
        Ok(()) => FileExt::unlock(&file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(std::io::ErrorKind::ResourceBusy.into())
        }
        Err(e) => Err(e),
    }
}

fn ensure_parent(path: &NormalizedPath) -> Result<()> {
    if let Some(parent) = path.to_native().parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    Ok(())
}

fn write_temp_then_rename(path: &NormalizedPath, content: &[u8], fsync: bool) -> Result<()> {
    let native_path = path.to_native();

    // Temp file lives in the same directory so the rename stays on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or("file"),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let outcome = (|| {
        let mut temp_file = File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;
        temp_file
            .write_all(content)
            .map_err(|e| Error::io(&temp_path, e))?;
        if fsync {
            temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
        }
        drop(temp_file);
        fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))
    })();

    if outcome.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    outcome
}

fn into_io(err: Error) -> std::io::Error {
    match err {
        Error::Io { source, .. } => source,
        other => std::io::Error::other(other.to_string()),
    }
}
