//! Process presence monitoring for the process-watch schedule

use std::ffi::OsStr;
use std::sync::Mutex;

use sysinfo::System;
use tracing::trace;

/// Answers "is a process with this name running right now?". Polled, not
/// event-driven.
pub trait ProcessMonitor: Send + Sync {
    fn is_running(&self, name: &str) -> bool;

    /// The subset of `names` currently running, in the given order.
    fn running_among(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|name| self.is_running(name))
            .cloned()
            .collect()
    }
}

/// [`ProcessMonitor`] backed by the operating system process table.
///
/// Names are compared exactly against the executable name, so on Windows a
/// watched name usually includes `.exe`.
pub struct SystemProcessMonitor {
    system: Mutex<System>,
}

impl Default for SystemProcessMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProcessMonitor {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn snapshot_contains(system: &System, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|name| {
                let wanted = OsStr::new(name.as_str());
                system
                    .processes()
                    .values()
                    .any(|process| as_os_str(process.name()) == wanted)
            })
            .cloned()
            .collect()
    }
}

impl ProcessMonitor for SystemProcessMonitor {
    fn is_running(&self, name: &str) -> bool {
        !self.running_among(&[name.to_string()]).is_empty()
    }

    /// Refreshes the process table once for the whole batch.
    fn running_among(&self, names: &[String]) -> Vec<String> {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_all();
        let running = Self::snapshot_contains(&system, names);
        trace!(watched = names.len(), running = running.len(), "process table polled");
        running
    }
}

fn as_os_str<S: AsRef<OsStr> + ?Sized>(name: &S) -> &OsStr {
    name.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<&'static str>);

    impl ProcessMonitor for Fixed {
        fn is_running(&self, name: &str) -> bool {
            self.0.contains(&name)
        }
    }

    #[test]
    fn running_among_keeps_order() {
        let monitor = Fixed(vec!["b.exe", "a.exe"]);
        let names = vec!["a.exe".to_string(), "c.exe".to_string(), "b.exe".to_string()];
        assert_eq!(monitor.running_among(&names), vec!["a.exe", "b.exe"]);
    }

    #[test]
    fn system_monitor_does_not_see_made_up_process() {
        let monitor = SystemProcessMonitor::new();
        assert!(!monitor.is_running("definitely-not-a-real-process-name-4821"));
    }
}
