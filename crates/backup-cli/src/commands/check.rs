//! One-shot reconciliation and the long-running daemon

use std::sync::Arc;

use backup_core::{
    EventSink, FanoutSink, PassReport, Scheduler, SystemProcessMonitor, TracingSink,
};
use backup_remote::RemoteStore;
use colored::Colorize;

use crate::console::ConsoleSink;
use crate::context::Context;
use crate::error::{CliError, Result};
use crate::interactive::DialoguerPrompt;

fn scheduler(
    ctx: &Context,
    remote: Arc<dyn RemoteStore>,
    events: Arc<dyn EventSink>,
) -> Scheduler {
    Scheduler::new(
        ctx.store.clone(),
        remote,
        Arc::new(DialoguerPrompt::new(ctx.yes)),
        Arc::new(SystemProcessMonitor::new()),
    )
    .with_events(events)
}

/// Reconcile every tracked pair once.
pub fn run_check(ctx: &Context, json: bool) -> Result<()> {
    // Fail on a corrupt tracking file before touching the remote.
    ctx.store.load()?;

    let events: Arc<dyn EventSink> = if json {
        Arc::new(TracingSink)
    } else {
        Arc::new(ConsoleSink)
    };
    let report = scheduler(ctx, ctx.remote()?, events).run_manual_pass()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    failures(&report)
}

/// Any skipped pair makes the command fail after the whole pass ran.
fn failures(report: &PassReport) -> Result<()> {
    match report.skipped.len() {
        0 => Ok(()),
        n => Err(CliError::user(format!(
            "{n} tracked file(s) could not be reconciled"
        ))),
    }
}

/// Run both schedules until the process is terminated.
pub fn run_daemon(ctx: &Context) -> Result<()> {
    let state = ctx.store.load()?;
    let remote = ctx.remote()?;
    let label = remote.describe();
    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(TracingSink), Arc::new(ConsoleSink)];
    let scheduler = scheduler(ctx, remote, Arc::new(FanoutSink::new(sinks)));

    println!(
        "{} Watching {} tracked file(s) against {}",
        "=>".blue().bold(),
        state.pairs.len(),
        label.cyan()
    );
    println!(
        "   file check every {} min, process check every {} min, {} watched process(es)",
        state.file_check_interval_minutes,
        state.process_check_interval_minutes,
        state.watched_processes.len()
    );

    scheduler.spawn()?.join();
    Ok(())
}
