//! Listing tracked pairs and remote objects

use backup_core::Tracker;
use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Print every tracked pair, or the pairs as JSON.
pub fn run_list(ctx: &Context, json: bool) -> Result<()> {
    let state = ctx.store.load()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&state.pairs)?);
        return Ok(());
    }

    if state.pairs.is_empty() {
        println!(
            "{} (use {} to add one)",
            "No tracked files".dimmed(),
            "file-backup track".cyan()
        );
        return Ok(());
    }

    println!("{}", "Tracked Files".bold());
    println!();
    for pair in &state.pairs {
        let local = if pair.local_path.is_file() {
            pair.local_path.display().to_string().normal()
        } else {
            format!("{} (missing)", pair.local_path.display()).yellow()
        };
        println!("  {:<32} {}", pair.remote_path.cyan(), local);
    }
    println!();
    println!("{} {} tracked", "Total:".dimmed(), state.pairs.len());
    Ok(())
}

/// List remote objects under `prefix`, marking the tracked ones.
pub fn run_remote_ls(ctx: &Context, prefix: &str) -> Result<()> {
    let state = ctx.store.load()?;
    let remote = ctx.remote()?;
    let objects = Tracker::new(&ctx.store, remote.as_ref())
        .list_remote(prefix, &state.exclusion_rules)?;

    for object in &objects {
        if state.is_tracked(object) {
            println!("{} {}", "*".green(), object.cyan());
        } else {
            println!("  {object}");
        }
    }
    println!();
    println!(
        "{} {} object(s), {} tracked",
        "Total:".dimmed(),
        objects.len(),
        objects.iter().filter(|o| state.is_tracked(o)).count()
    );
    Ok(())
}
