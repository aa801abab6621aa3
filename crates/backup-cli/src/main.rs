//! file-backup CLI
//!
//! Tracks local files against a remote repository and keeps both in step,
//! either once (`check`) or continuously (`daemon`).

mod cli;
mod commands;
mod console;
mod context;
mod error;
mod interactive;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use backup_core::EVENT_TARGET;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use cli::{Cli, Commands, RemoteAction};
use context::Context;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // The daemon prints pass events on the console itself
    let (default_level, log_file, console_events) = match &cli.command {
        Some(Commands::Daemon { log_file }) => ("info", log_file.as_deref(), true),
        _ => ("warn", None, false),
    };
    init_tracing(cli.verbose, default_level, log_file, console_events)?;

    let Some(command) = cli.command.clone() else {
        println!("{} keeps local files backed up", "file-backup".green().bold());
        println!();
        println!("Run {} for available commands.", "file-backup --help".cyan());
        return Ok(());
    };

    let ctx = Context::from_cli(&cli)?;
    tracing::debug!(state = %ctx.store.path(), "tracking file resolved");
    execute_command(&ctx, command)
}

fn execute_command(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Check { json } => commands::run_check(ctx, json),
        Commands::Daemon { .. } => commands::run_daemon(ctx),
        Commands::Track { local, remote } => commands::run_track(ctx, &local, &remote),
        Commands::Pull { remote, local } => commands::run_pull(ctx, &remote, &local),
        Commands::Untrack {
            remote,
            delete_remote,
        } => commands::run_untrack(ctx, &remote, delete_remote),
        Commands::List { json } => commands::run_list(ctx, json),
        Commands::Remote {
            action: RemoteAction::Ls { prefix },
        } => commands::run_remote_ls(ctx, &prefix),
        Commands::Exclude { action } => commands::run_exclude(ctx, &action),
        Commands::Watch { action } => commands::run_watch(ctx, &action),
        Commands::Interval { kind, minutes } => commands::run_interval(ctx, kind.into(), minutes),
        Commands::Prompt { setting } => commands::run_prompt(ctx, setting),
        Commands::Status => commands::run_status(ctx),
    }
}

/// Install the global subscriber.
///
/// `--verbose` forces DEBUG; otherwise `RUST_LOG` applies, falling back to
/// `default_level`. With a log file, plain lines are appended there as well.
/// When `console_events` is set, pass events go to the log file only.
fn init_tracing(
    verbose: bool,
    default_level: &str,
    log_file: Option<&Path>,
    console_events: bool,
) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_filter(filter_fn(move |meta| {
                    show_on_stderr(meta.target(), console_events)
                })),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::user(format!("cannot install logger: {e}")))
}

fn show_on_stderr(target: &str, console_events: bool) -> bool {
    !(console_events && target == EVENT_TARGET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_events_keep_pass_lines_off_stderr() {
        assert!(!show_on_stderr(EVENT_TARGET, true));
        assert!(show_on_stderr("backup_core::reconcile::reconciler", true));
    }

    #[test]
    fn pass_lines_reach_stderr_without_a_console_sink() {
        assert!(show_on_stderr(EVENT_TARGET, false));
    }
}
