//! Status command implementation

use backup_remote::RemoteStore;
use colored::Colorize;

use crate::context::{Context, open_remote};
use crate::error::Result;

/// Print settings, the remote in use and a summary of tracked pairs.
pub fn run_status(ctx: &Context) -> Result<()> {
    let state = ctx.store.load()?;

    println!("{}", "file-backup Status".bold());
    println!();

    println!("{}:    {}", "State".dimmed(), ctx.store.path());
    match open_remote(&ctx.remote_args) {
        Ok(remote) => println!("{}:   {}", "Remote".dimmed(), remote.describe().cyan()),
        Err(e) => println!("{}:   {} ({})", "Remote".dimmed(), "not available".yellow(), e),
    }
    println!(
        "{}: every {} min",
        "File check".dimmed(),
        state.file_check_interval_minutes
    );
    println!(
        "{}: every {} min",
        "Proc check".dimmed(),
        state.process_check_interval_minutes
    );
    let prompt = if state.prompt_on_divergence {
        "on".green()
    } else {
        "off".yellow()
    };
    println!("{}:   {}", "Prompt".dimmed(), prompt);
    println!();

    let missing = state
        .pairs
        .iter()
        .filter(|p| !p.local_path.is_file())
        .count();
    println!("{}:", "Tracked Files".bold());
    if state.pairs.is_empty() {
        println!("  {} (use {} to add)", "None".dimmed(), "file-backup track".cyan());
    } else if missing == 0 {
        println!("  {} tracked", state.pairs.len());
    } else {
        println!(
            "  {} tracked, {}",
            state.pairs.len(),
            format!("{missing} missing locally").yellow()
        );
    }
    println!();

    println!("{}:", "Watched Processes".bold());
    if state.watched_processes.is_empty() {
        println!("  {}", "None".dimmed());
    }
    for name in &state.watched_processes {
        println!("  {} {}", "+".green(), name);
    }

    println!();
    println!(
        "{}: {} rule(s)",
        "Exclusions".bold(),
        state.exclusion_rules.rules().len()
    );
    Ok(())
}
