//! Track, pull and untrack commands

use std::path::Path;

use backup_core::{BatchReport, Tracker};
use backup_remote::RemoteStore;
use colored::Colorize;

use crate::context::Context;
use crate::error::{CliError, Result};
use crate::interactive::confirm_batch;

/// Upload a local file, or every file directly in a directory, and track it.
pub fn run_track(ctx: &Context, local: &Path, remote_path: &str) -> Result<()> {
    let remote = ctx.remote()?;
    let tracker = Tracker::new(&ctx.store, remote.as_ref());

    if local.is_dir() {
        let files = tracker.plan_local_dir(local)?;
        if files.is_empty() {
            println!("{} No files in {}", "!".yellow().bold(), local.display());
            return Ok(());
        }
        let what = format!("Tracking {}", local.display());
        if !confirm_batch(files.len(), &what, ctx.yes)? {
            return Err(CliError::user("Cancelled."));
        }
        println!(
            "{} Uploading {} file(s) to {}",
            "=>".blue().bold(),
            files.len(),
            remote_path.cyan()
        );
        let report = tracker.track_local_dir(local, remote_path)?;
        return finish_batch(&report);
    }

    println!(
        "{} Uploading {} to {}",
        "=>".blue().bold(),
        local.display(),
        remote_path.cyan()
    );
    let pair = tracker.track_local_file(local, remote_path)?;
    println!(
        "{} Tracking {} <-> {}",
        "OK".green().bold(),
        pair.remote_path.cyan(),
        pair.local_path.display()
    );
    Ok(())
}

/// Download a remote file, or every object under a remote folder, and track it.
pub fn run_pull(ctx: &Context, remote_path: &str, local: &Path) -> Result<()> {
    let remote = ctx.remote()?;
    let tracker = Tracker::new(&ctx.store, remote.as_ref());

    match remote.get_object_meta(remote_path) {
        Ok(meta) => {
            println!(
                "{} Downloading {} ({} bytes)",
                "=>".blue().bold(),
                meta.path.cyan(),
                meta.size
            );
            let pair = tracker.track_remote_file(remote_path, local)?;
            println!(
                "{} Tracking {} <-> {}",
                "OK".green().bold(),
                pair.remote_path.cyan(),
                pair.local_path.display()
            );
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            let rules = ctx.store.load()?.exclusion_rules;
            let objects = tracker.plan_remote_dir(remote_path, &rules)?;
            if objects.is_empty() {
                println!("{} Nothing to download under {}", "!".yellow().bold(), remote_path);
                return Ok(());
            }
            let what = format!("Downloading {remote_path}");
            if !confirm_batch(objects.len(), &what, ctx.yes)? {
                return Err(CliError::user("Cancelled."));
            }
            println!(
                "{} Downloading {} file(s) into {}",
                "=>".blue().bold(),
                objects.len(),
                local.display()
            );
            let report = tracker.track_remote_dir(remote_path, local, &rules)?;
            finish_batch(&report)
        }
        Err(e) => Err(e.into()),
    }
}

/// Stop tracking, optionally deleting the remote object as well.
pub fn run_untrack(ctx: &Context, remote_path: &str, delete_remote: bool) -> Result<()> {
    if !delete_remote {
        // Untracking alone never needs the remote.
        let pair = ctx.store.remove_pair(remote_path)?;
        println!(
            "{} No longer tracking {} (both copies kept)",
            "OK".green().bold(),
            pair.remote_path.cyan()
        );
        return Ok(());
    }

    let remote = ctx.remote()?;
    let untracked = Tracker::new(&ctx.store, remote.as_ref()).untrack_and_delete(remote_path)?;
    if untracked.remote_deleted {
        println!(
            "{} No longer tracking {}; remote copy deleted",
            "OK".green().bold(),
            untracked.pair.remote_path.cyan()
        );
    } else {
        println!(
            "{} No longer tracking {}; remote copy was already gone",
            "OK".green().bold(),
            untracked.pair.remote_path.cyan()
        );
    }
    Ok(())
}

fn finish_batch(report: &BatchReport) -> Result<()> {
    for pair in &report.tracked {
        println!(
            "  {} {} <-> {}",
            "+".green(),
            pair.remote_path.cyan(),
            pair.local_path.display()
        );
    }
    for (item, error) in &report.failed {
        println!("  {} {}: {}", "x".red(), item, error);
    }

    let total = report.tracked.len() + report.failed.len();
    if report.failed.is_empty() {
        println!("{} Tracking {} file(s)", "OK".green().bold(), total);
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} of {} file(s) could not be tracked",
            report.failed.len(),
            total
        )))
    }
}
