//! Retry-on-locked-file helper
//!
//! Files inside folders managed by synchronized-storage clients (OneDrive and
//! friends) are routinely held open for a few seconds. Every operation that
//! overwrites or snapshots a file goes through [`retry_locked`], which retries
//! only errors classified as "file busy" and gives up after a fixed number of
//! attempts with [`Error::Locked`].

use std::path::Path;
use std::time::Duration;

use backoff::backoff::Constant;
use tracing::warn;

use crate::{Error, Result};

/// Windows `ERROR_SHARING_VIOLATION`: the file is in use by another process.
const WIN_SHARING_VIOLATION: i32 = 32;
/// Windows `ERROR_LOCK_VIOLATION`: a region of the file is locked.
const WIN_LOCK_VIOLATION: i32 = 33;

/// Attempt budget for locked-file retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits. Useful in tests.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Whether an I/O error means "someone else is holding this file right now".
pub fn is_locked_error(err: &std::io::Error) -> bool {
    if let Some(code) = err.raw_os_error()
        && cfg!(windows)
        && (code == WIN_SHARING_VIOLATION || code == WIN_LOCK_VIOLATION)
    {
        return true;
    }
    matches!(
        err.kind(),
        std::io::ErrorKind::ResourceBusy | std::io::ErrorKind::ExecutableFileBusy
    )
}

/// Run `op` against `path`, retrying while it fails with a locked-file error.
///
/// Non-lock errors are returned immediately as [`Error::Io`]. When every
/// attempt fails because the file is locked the result is [`Error::Locked`];
/// a lock is never reported as success.
pub fn retry_locked<T, F>(policy: RetryPolicy, path: &Path, mut op: F) -> Result<T>
where
    F: FnMut() -> std::io::Result<T>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0u32;

    let result = backoff::retry(Constant::new(policy.delay), || {
        attempt += 1;
        match op() {
            Ok(value) => Ok(value),
            Err(e) if is_locked_error(&e) && attempt < attempts => {
                warn!(
                    path = %path.display(),
                    attempt,
                    attempts,
                    "file is locked, waiting before retrying"
                );
                Err(backoff::Error::transient(e))
            }
            Err(e) => Err(backoff::Error::permanent(e)),
        }
    });

    match result {
        Ok(value) => Ok(value),
        Err(backoff::Error::Permanent(e)) | Err(backoff::Error::Transient { err: e, .. }) => {
            if is_locked_error(&e) {
                Err(Error::Locked {
                    path: path.to_path_buf(),
                    attempts: attempt,
                })
            } else {
                Err(Error::io(path, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, ErrorKind};

    fn busy() -> io::Error {
        io::Error::from(ErrorKind::ResourceBusy)
    }

    #[test]
    fn succeeds_without_retry() {
        let mut calls = 0;
        let value = retry_locked(RetryPolicy::immediate(3), Path::new("a"), || {
            calls += 1;
            Ok::<_, io::Error>(42)
        })
        .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retries_until_lock_clears() {
        let mut calls = 0;
        let value = retry_locked(RetryPolicy::immediate(5), Path::new("a"), || {
            calls += 1;
            if calls < 3 { Err(busy()) } else { Ok("done") }
        })
        .unwrap();
        assert_eq!(value, "done");
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_with_locked_error() {
        let mut calls = 0;
        let err = retry_locked(RetryPolicy::immediate(4), Path::new("held.txt"), || {
            calls += 1;
            Err::<(), _>(busy())
        })
        .unwrap_err();
        assert_eq!(calls, 4);
        assert!(matches!(err, Error::Locked { attempts: 4, .. }));
        assert!(err.is_locked());
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut calls = 0;
        let err = retry_locked(RetryPolicy::immediate(5), Path::new("gone.txt"), || {
            calls += 1;
            Err::<(), _>(io::Error::from(ErrorKind::NotFound))
        })
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(err.is_not_found());
    }

    #[test]
    fn plain_permission_denied_is_not_a_lock() {
        assert!(!is_locked_error(&io::Error::from(ErrorKind::PermissionDenied)));
        assert!(is_locked_error(&busy()));
    }
}
