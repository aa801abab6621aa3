//! Exclusion rules, watched processes, intervals and the prompt toggle

use backup_core::IntervalKind;
use colored::Colorize;

use crate::cli::{NameAction, Toggle};
use crate::context::Context;
use crate::error::Result;

pub fn run_exclude(ctx: &Context, action: &NameAction) -> Result<()> {
    match action {
        NameAction::Add { name } => {
            if ctx.store.add_exclusion(name)? {
                println!("{} Excluding '{}'", "OK".green().bold(), name);
            } else {
                println!("{} '{}' is already excluded", "!".yellow().bold(), name);
            }
        }
        NameAction::Remove { name } => {
            if ctx.store.remove_exclusion(name)? {
                println!("{} No longer excluding '{}'", "OK".green().bold(), name);
            } else {
                println!("{} '{}' was not excluded", "!".yellow().bold(), name);
            }
        }
        NameAction::List => {
            let state = ctx.store.load()?;
            println!("{}:", "Exclusion Rules".bold());
            print_names(state.exclusion_rules.rules().iter(), "file-backup exclude add");
            println!(
                "  {} {}",
                "always:".dimmed(),
                backup_remote::DEFAULT_EXCLUSIONS.join(", ").dimmed()
            );
        }
    }
    Ok(())
}

pub fn run_watch(ctx: &Context, action: &NameAction) -> Result<()> {
    match action {
        NameAction::Add { name } => {
            if ctx.store.add_watched_process(name)? {
                println!("{} Watching process '{}'", "OK".green().bold(), name);
            } else {
                println!("{} '{}' is already watched", "!".yellow().bold(), name);
            }
        }
        NameAction::Remove { name } => {
            if ctx.store.remove_watched_process(name)? {
                println!("{} No longer watching '{}'", "OK".green().bold(), name);
            } else {
                println!("{} '{}' was not watched", "!".yellow().bold(), name);
            }
        }
        NameAction::List => {
            let state = ctx.store.load()?;
            println!("{}:", "Watched Processes".bold());
            print_names(state.watched_processes.iter(), "file-backup watch add");
        }
    }
    Ok(())
}

pub fn run_interval(ctx: &Context, kind: IntervalKind, minutes: u64) -> Result<()> {
    ctx.store.set_interval(kind, minutes)?;
    println!(
        "{} {} check every {} minute(s), from the next cycle",
        "OK".green().bold(),
        kind,
        minutes
    );
    Ok(())
}

pub fn run_prompt(ctx: &Context, setting: Toggle) -> Result<()> {
    let enabled = setting == Toggle::On;
    ctx.store.set_prompt_on_divergence(enabled)?;
    let message = if enabled {
        "Divergences will be confirmed before acting"
    } else {
        "Divergences will be resolved without asking"
    };
    println!("{} {}", "OK".green().bold(), message);
    Ok(())
}

fn print_names<'a>(names: impl ExactSizeIterator<Item = &'a String>, hint: &str) {
    if names.len() == 0 {
        println!("  {} (use {} to add)", "None".dimmed(), hint.cyan());
        return;
    }
    for name in names {
        println!("  {} {}", "+".green(), name);
    }
}
