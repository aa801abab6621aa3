//! Colored terminal output for pass events

use backup_core::{EventSink, PassEvent, PassTrigger, ReconciliationOutcome};
use colored::{ColoredString, Colorize};

/// Prints each [`PassEvent`] as one human-readable line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: &PassEvent) {
        if let Some(line) = render(event) {
            println!("{line}");
        }
    }
}

/// The line printed for `event`; routine process polls print nothing.
pub fn render(event: &PassEvent) -> Option<String> {
    let line = match event {
        PassEvent::PassStarted { trigger, pairs } => format!(
            "{} {} over {} tracked file(s)",
            "=>".blue().bold(),
            trigger_label(trigger),
            pairs
        ),
        PassEvent::PairReconciled {
            remote_path,
            outcome,
        } => format!("  {} {} ({})", marker(*outcome), remote_path.cyan(), outcome),
        PassEvent::PairFailed {
            remote_path,
            class,
            message,
        } => format!(
            "  {} {} [{}] {}",
            "!".red().bold(),
            remote_path.cyan(),
            class,
            message.dimmed()
        ),
        PassEvent::PairsPruned { remote_paths } => format!(
            "  {} no longer tracked: {}",
            "-".yellow(),
            remote_paths.join(", ")
        ),
        PassEvent::PassFinished {
            reconciled,
            failed,
            pruned,
        } => format!(
            "{} {} reconciled, {} failed, {} pruned",
            "OK".green().bold(),
            reconciled,
            failed,
            pruned
        ),
        PassEvent::ProcessStarted { processes } => format!(
            "{} {} running, backing up when it exits",
            "..".dimmed(),
            processes.join(", ")
        ),
        PassEvent::ProcessStopped { processes } => {
            format!("{} {} exited", "=>".blue().bold(), processes.join(", "))
        }
        PassEvent::ProcessStatus { .. } => return None,
    };
    Some(line)
}

fn trigger_label(trigger: &PassTrigger) -> &'static str {
    match trigger {
        PassTrigger::Schedule => "Scheduled check",
        PassTrigger::ProcessExit { .. } => "Backup after process exit",
        PassTrigger::Manual => "Check",
    }
}

fn marker(outcome: ReconciliationOutcome) -> ColoredString {
    match outcome {
        ReconciliationOutcome::Identical => "=".dimmed(),
        ReconciliationOutcome::UploadedLocal => "^".green().bold(),
        ReconciliationOutcome::DownloadedRemote => "v".green().bold(),
        ReconciliationOutcome::RemoteMissingRemoveFromTracking
        | ReconciliationOutcome::LocalMissingRemoveFromTracking => "-".yellow(),
        ReconciliationOutcome::UserDeclinedNoAction
        | ReconciliationOutcome::IndeterminateKeep => "?".yellow(),
    }
}
