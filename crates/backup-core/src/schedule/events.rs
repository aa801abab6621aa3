//! Notifications emitted while passes run
//!
//! Presentation layers subscribe through [`EventSink`]; the engine itself only
//! logs through [`TracingSink`].

use std::sync::Mutex;

use tracing::{info, warn};

use crate::ErrorClass;
use crate::reconcile::{PassTrigger, ReconciliationOutcome};

/// Target of every log line written by [`TracingSink`].
pub const EVENT_TARGET: &str = "file_backup::events";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassEvent {
    PassStarted {
        trigger: PassTrigger,
        pairs: usize,
    },
    PairReconciled {
        remote_path: String,
        outcome: ReconciliationOutcome,
    },
    PairFailed {
        remote_path: String,
        class: ErrorClass,
        message: String,
    },
    PairsPruned {
        remote_paths: Vec<String>,
    },
    PassFinished {
        reconciled: usize,
        failed: usize,
        pruned: usize,
    },
    /// A watched process was seen for the first time since it last stopped.
    ProcessStarted {
        processes: Vec<String>,
    },
    /// Watched processes seen running on an earlier poll are gone.
    ProcessStopped {
        processes: Vec<String>,
    },
    /// Poll result with no transition.
    ProcessStatus {
        running: Vec<String>,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PassEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &PassEvent) {
        match event {
            PassEvent::PassStarted { trigger, pairs } => {
                info!(target: EVENT_TARGET, ?trigger, pairs, "reconciliation pass starting")
            }
            PassEvent::PairReconciled {
                remote_path,
                outcome,
            } => info!(target: EVENT_TARGET, %remote_path, %outcome, "pair reconciled"),
            PassEvent::PairFailed {
                remote_path,
                class,
                message,
            } => warn!(
                target: EVENT_TARGET,
                %remote_path,
                %class,
                %message,
                "pair skipped this pass"
            ),
            PassEvent::PairsPruned { remote_paths } => {
                info!(target: EVENT_TARGET, ?remote_paths, "pairs removed from tracking")
            }
            PassEvent::PassFinished {
                reconciled,
                failed,
                pruned,
            } => info!(
                target: EVENT_TARGET,
                reconciled,
                failed,
                pruned,
                "reconciliation pass finished"
            ),
            PassEvent::ProcessStarted { processes } => {
                info!(target: EVENT_TARGET, ?processes, "watched process opened")
            }
            PassEvent::ProcessStopped { processes } => {
                info!(target: EVENT_TARGET, ?processes, "watched process closed, starting backup")
            }
            PassEvent::ProcessStatus { running } => {
                info!(target: EVENT_TARGET, ?running, "process watchlist checked")
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<PassEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PassEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count_where(&self, predicate: impl Fn(&PassEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| predicate(e))
            .count()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &PassEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

/// Sends each event to every inner sink in order.
pub struct FanoutSink {
    sinks: Vec<std::sync::Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<std::sync::Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &PassEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
