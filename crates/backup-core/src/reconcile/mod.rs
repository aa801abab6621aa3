//! Per-pair reconciliation
//!
//! [`Reconciler::reconcile`] classifies one [`crate::TrackedPair`] and, on
//! divergence, uploads or downloads after consulting a [`DecisionPort`].
//! Pruning is left to the caller so a pass never mutates the collection it is
//! iterating.

mod decision;
mod outcome;
mod reconciler;

pub use decision::{Decision, DecisionPolicy, DecisionPort, Direction};
pub use outcome::{PairResult, PassReport, PassTrigger, ReconciliationOutcome, SkippedPair};
pub use reconciler::{Reconciler, resolve_direction};
