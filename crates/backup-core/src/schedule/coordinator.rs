//! Mutual exclusion between the file-check and process-check schedules
//!
//! Each schedule holds an [`ActivityGuard`] for the duration of its work. A
//! schedule never pre-empts the other: entering waits until the other side's
//! guard is dropped, and the flag is cleared on every exit path because the
//! guard clears it on drop.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// The two kinds of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    FileCheck,
    ProcessCheck,
}

impl Activity {
    fn other(self) -> Self {
        match self {
            Self::FileCheck => Self::ProcessCheck,
            Self::ProcessCheck => Self::FileCheck,
        }
    }
}

#[derive(Debug, Default)]
struct ActiveFlags {
    file_check: bool,
    process_check: bool,
}

impl ActiveFlags {
    fn get(&self, activity: Activity) -> bool {
        match activity {
            Activity::FileCheck => self.file_check,
            Activity::ProcessCheck => self.process_check,
        }
    }

    fn set(&mut self, activity: Activity, value: bool) {
        match activity {
            Activity::FileCheck => self.file_check = value,
            Activity::ProcessCheck => self.process_check = value,
        }
    }

    fn can_enter(&self, activity: Activity) -> bool {
        !self.get(activity) && !self.get(activity.other())
    }
}

/// Owner of the two "active" flags.
#[derive(Debug, Default)]
pub struct Coordinator {
    flags: Mutex<ActiveFlags>,
    changed: Condvar,
}

/// Proof that an activity is running. Releases the flag on drop.
#[must_use = "the activity ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ActivityGuard<'a> {
    coordinator: &'a Coordinator,
    activity: Activity,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        let mut flags = self.coordinator.lock();
        flags.set(self.activity, false);
        drop(flags);
        self.coordinator.changed.notify_all();
        debug!(activity = ?self.activity, "activity finished");
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ActiveFlags> {
        // Flags are plain booleans; a panic elsewhere cannot leave them torn.
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter `activity`, waiting for the other schedule to finish first.
    pub fn enter(&self, activity: Activity) -> ActivityGuard<'_> {
        let mut flags = self.lock();
        while !flags.can_enter(activity) {
            debug!(activity = ?activity, "deferring until the other schedule finishes");
            flags = self
                .changed
                .wait(flags)
                .unwrap_or_else(PoisonError::into_inner);
        }
        flags.set(activity, true);
        ActivityGuard {
            coordinator: self,
            activity,
        }
    }

    pub fn is_active(&self, activity: Activity) -> bool {
        self.lock().get(activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn guard_sets_and_clears_the_flag() {
        let coordinator = Coordinator::new();
        let file = coordinator.enter(Activity::FileCheck);

        assert!(coordinator.is_active(Activity::FileCheck));
        assert!(!coordinator.is_active(Activity::ProcessCheck));

        drop(file);
        assert!(!coordinator.is_active(Activity::FileCheck));
        let _process = coordinator.enter(Activity::ProcessCheck);
        assert!(coordinator.is_active(Activity::ProcessCheck));
    }

    #[test]
    fn guard_releases_on_panic() {
        let coordinator = Arc::new(Coordinator::new());
        let inner = Arc::clone(&coordinator);
        let result = thread::spawn(move || {
            let _guard = inner.enter(Activity::ProcessCheck);
            panic!("pass blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!coordinator.is_active(Activity::ProcessCheck));
        let _file = coordinator.enter(Activity::FileCheck);
        assert!(coordinator.is_active(Activity::FileCheck));
    }

    #[test]
    fn enter_waits_for_the_other_side() {
        let coordinator = Arc::new(Coordinator::new());
        let process = coordinator.enter(Activity::ProcessCheck);
        let entered = Arc::new(AtomicBool::new(false));

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _file = coordinator.enter(Activity::FileCheck);
                entered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        drop(process);
        waiter.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }
}
