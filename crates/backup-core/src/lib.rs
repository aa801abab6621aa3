//! Synchronization engine for file-backup
//!
//! Keeps local files in step with objects in a remote, version-controlled
//! store:
//!
//! - **Tracking store**: the durable remote-path to local-path mapping plus
//!   exclusion rules, the process watchlist and schedule intervals
//! - **Reconciler**: identical / missing / diverged classification by content
//!   digest, newest-wins resolution, snapshot before every local overwrite
//! - **Scheduler**: a file-check loop and a process-watch loop that never run
//!   reconciliation at the same time
//! - **Tracker**: upload-and-track, download-and-track and untrack operations
//!
//! # Architecture
//!
//! ```text
//!            backup-cli
//!                |
//!           backup-core
//!             /      \
//!     backup-remote  |
//!             \      /
//!            backup-fs
//! ```

pub mod error;
pub mod process;
pub mod reconcile;
pub mod schedule;
pub mod track;
pub mod tracking;

pub use error::{Error, ErrorClass, Result};
pub use process::{ProcessMonitor, SystemProcessMonitor};
pub use reconcile::{
    Decision, DecisionPolicy, DecisionPort, Direction, PairResult, PassReport, PassTrigger,
    ReconciliationOutcome, Reconciler, SkippedPair,
};
pub use schedule::{
    Activity, ActivityGuard, CollectingSink, Coordinator, EVENT_TARGET, EventSink, FanoutSink,
    PassEvent, Scheduler, SchedulerHandle, TracingSink,
};
pub use track::{BatchReport, Tracker, Untracked};
pub use tracking::{IntervalKind, TrackedPair, TrackingState, TrackingStore};
