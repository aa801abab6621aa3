//! The dual scheduler: a file-check loop and a process-watch loop
//!
//! Both loops run on their own OS thread and share one [`Coordinator`], so
//! their reconciliation work never overlaps. A pass always runs to completion;
//! stop requests are only honored between passes.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use backup_fs::RetryPolicy;
use backup_remote::RemoteStore;
use tracing::{error, info, warn};

use super::coordinator::{Activity, Coordinator};
use super::events::{EventSink, PassEvent, TracingSink};
use crate::Result;
use crate::process::ProcessMonitor;
use crate::reconcile::{DecisionPort, PassReport, PassTrigger, Reconciler};
use crate::tracking::{
    DEFAULT_FILE_CHECK_MINUTES, DEFAULT_PROCESS_CHECK_MINUTES, IntervalKind, TrackingStore,
};

#[derive(Debug, Default)]
struct SignalState {
    stopped: bool,
    first_pass_done: bool,
}

/// Stop requests and the "first file pass finished" latch.
#[derive(Debug, Default)]
struct Signals {
    state: Mutex<SignalState>,
    changed: Condvar,
}

impl Signals {
    fn update(&self, apply: impl FnOnce(&mut SignalState)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
        drop(state);
        self.changed.notify_all();
    }

    fn is_stopped(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stopped
    }

    /// Sleep up to `duration`; returns `true` if a stop was requested.
    fn sleep(&self, duration: Duration) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, _) = self
            .changed
            .wait_timeout_while(state, duration, |s| !s.stopped)
            .unwrap_or_else(PoisonError::into_inner);
        state.stopped
    }

    /// Block until the first file pass is done; returns `false` if stopped first.
    fn wait_first_pass(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self
            .changed
            .wait_while(state, |s| !s.first_pass_done && !s.stopped)
            .unwrap_or_else(PoisonError::into_inner);
        !state.stopped
    }
}

/// Drives reconciliation on two independent schedules.
pub struct Scheduler {
    store: TrackingStore,
    remote: Arc<dyn RemoteStore>,
    decisions: Arc<dyn DecisionPort>,
    monitor: Arc<dyn ProcessMonitor>,
    events: Arc<dyn EventSink>,
    coordinator: Coordinator,
    retry: RetryPolicy,
    minute: Duration,
    /// Watched processes seen running since the last time none were.
    seen_running: Mutex<Vec<String>>,
    signals: Signals,
}

impl Scheduler {
    pub fn new(
        store: TrackingStore,
        remote: Arc<dyn RemoteStore>,
        decisions: Arc<dyn DecisionPort>,
        monitor: Arc<dyn ProcessMonitor>,
    ) -> Self {
        Self {
            store,
            remote,
            decisions,
            monitor,
            events: Arc::new(TracingSink),
            coordinator: Coordinator::new(),
            retry: RetryPolicy::default(),
            minute: Duration::from_secs(60),
            seen_running: Mutex::new(Vec::new()),
            signals: Signals::default(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Length of one configured "minute". Tests shrink it to milliseconds.
    pub fn with_minute(mut self, minute: Duration) -> Self {
        self.minute = minute;
        self
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &TrackingStore {
        &self.store
    }

    /// One scheduled file-check pass, deferred while a process check runs.
    pub fn run_file_check_pass(&self) -> Result<PassReport> {
        let _guard = self.coordinator.enter(Activity::FileCheck);
        self.reconcile_all(PassTrigger::Schedule)
    }

    /// A pass requested by the operator. Same exclusion as a scheduled pass.
    pub fn run_manual_pass(&self) -> Result<PassReport> {
        let _guard = self.coordinator.enter(Activity::FileCheck);
        self.reconcile_all(PassTrigger::Manual)
    }

    /// One poll of the watched processes.
    ///
    /// When any watched process seen running on an earlier poll is gone now,
    /// a full pass over every tracked pair runs immediately, still inside the
    /// process-check activity, and its report is returned.
    pub fn process_tick(&self) -> Result<Option<PassReport>> {
        let _guard = self.coordinator.enter(Activity::ProcessCheck);
        let state = self.store.load()?;
        let watched: Vec<String> = state.watched_processes.iter().cloned().collect();
        let running = if watched.is_empty() {
            Vec::new()
        } else {
            self.monitor.running_among(&watched)
        };

        let mut seen = self
            .seen_running
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let stopped: Vec<String> = seen
            .iter()
            .filter(|name| !running.contains(name))
            .cloned()
            .collect();
        let started: Vec<String> = running
            .iter()
            .filter(|name| !seen.contains(name))
            .cloned()
            .collect();
        *seen = running.clone();
        drop(seen);

        if !started.is_empty() {
            self.events.emit(&PassEvent::ProcessStarted { processes: started });
        }
        if !stopped.is_empty() {
            self.events.emit(&PassEvent::ProcessStopped {
                processes: stopped.clone(),
            });
            return self
                .reconcile_all(PassTrigger::ProcessExit { processes: stopped })
                .map(Some);
        }
        self.events.emit(&PassEvent::ProcessStatus { running });
        Ok(None)
    }

    /// Reconcile every tracked pair, then prune in one save.
    fn reconcile_all(&self, trigger: PassTrigger) -> Result<PassReport> {
        let state = self.store.load()?;
        self.events.emit(&PassEvent::PassStarted {
            trigger: trigger.clone(),
            pairs: state.pairs.len(),
        });

        let reconciler = Reconciler::new(self.remote.as_ref(), self.decisions.as_ref())
            .with_retry(self.retry)
            .prompt_on_divergence(state.prompt_on_divergence);
        let mut report = PassReport::new(trigger);

        for pair in &state.pairs {
            match reconciler.reconcile(pair) {
                Ok(outcome) => {
                    self.events.emit(&PassEvent::PairReconciled {
                        remote_path: pair.remote_path.clone(),
                        outcome,
                    });
                    report.record(&pair.remote_path, outcome);
                }
                Err(e) => {
                    self.events.emit(&PassEvent::PairFailed {
                        remote_path: pair.remote_path.clone(),
                        class: e.class(),
                        message: e.to_string(),
                    });
                    report.skip(&pair.remote_path, &e);
                }
            }
        }

        let candidates = report.prune_candidates();
        if !candidates.is_empty() {
            let removed = self.store.remove_pairs(&candidates)?;
            report.pruned = removed.into_iter().map(|p| p.remote_path).collect();
            self.events.emit(&PassEvent::PairsPruned {
                remote_paths: report.pruned.clone(),
            });
        }

        self.events.emit(&PassEvent::PassFinished {
            reconciled: report.results.len(),
            failed: report.skipped.len(),
            pruned: report.pruned.len(),
        });
        Ok(report)
    }

    fn interval(&self, kind: IntervalKind) -> Duration {
        let minutes = match self.store.load() {
            Ok(state) => state.interval_minutes(kind),
            Err(e) => {
                warn!(error = %e, "cannot read interval, using default");
                match kind {
                    IntervalKind::File => DEFAULT_FILE_CHECK_MINUTES,
                    IntervalKind::Process => DEFAULT_PROCESS_CHECK_MINUTES,
                }
            }
        };
        let factor = u32::try_from(minutes.max(1)).unwrap_or(u32::MAX);
        self.minute.checked_mul(factor).unwrap_or(Duration::MAX)
    }

    fn file_loop(&self) {
        info!("file check schedule started");
        while !self.signals.is_stopped() {
            if let Err(e) = self.run_file_check_pass() {
                error!(error = %e, "file check pass failed");
            }
            self.signals.update(|s| s.first_pass_done = true);
            if self.signals.sleep(self.interval(IntervalKind::File)) {
                break;
            }
        }
        info!("file check schedule stopped");
    }

    fn process_loop(&self) {
        if !self.signals.wait_first_pass() {
            return;
        }
        info!("first file check finished, process monitor started");
        while !self.signals.is_stopped() {
            if let Err(e) = self.process_tick() {
                error!(error = %e, "process check failed");
            }
            if self.signals.sleep(self.interval(IntervalKind::Process)) {
                break;
            }
        }
        info!("process monitor stopped");
    }

    /// Start both loops on their own threads.
    pub fn spawn(self) -> Result<SchedulerHandle> {
        let scheduler = Arc::new(self);

        let file = {
            let scheduler = Arc::clone(&scheduler);
            thread::Builder::new()
                .name("file-check".into())
                .spawn(move || scheduler.file_loop())?
        };
        let process = {
            let scheduler = Arc::clone(&scheduler);
            thread::Builder::new()
                .name("process-check".into())
                .spawn(move || scheduler.process_loop())
        };
        let process = match process {
            Ok(handle) => handle,
            Err(e) => {
                scheduler.signals.update(|s| s.stopped = true);
                let _ = file.join();
                return Err(e.into());
            }
        };

        Ok(SchedulerHandle {
            scheduler,
            threads: vec![file, process],
        })
    }
}

/// Running loops started by [`Scheduler::spawn`].
pub struct SchedulerHandle {
    scheduler: Arc<Scheduler>,
    threads: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Ask both loops to stop after their current pass and wait for them.
    pub fn stop(self) {
        self.scheduler.signals.update(|s| s.stopped = true);
        self.join();
    }

    /// Wait for both loops to end.
    pub fn join(self) {
        for handle in self.threads {
            let name = handle.thread().name().unwrap_or("scheduler").to_string();
            if handle.join().is_err() {
                error!(thread = %name, "schedule thread panicked");
            }
        }
    }
}
