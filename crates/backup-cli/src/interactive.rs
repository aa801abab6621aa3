//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal confirmations.

use std::io::IsTerminal;

use backup_core::{Decision, DecisionPort, Direction};
use colored::Colorize;
use dialoguer::Confirm;

use crate::error::{CliError, Result};

/// Directory operations above this many files ask before starting.
pub const LARGE_BATCH: usize = 10;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Asks on the terminal before a divergence is resolved.
///
/// With `--yes` every decision is confirmed. Without a terminal nothing can
/// be asked, so every decision is declined.
#[derive(Debug, Clone, Copy)]
pub struct DialoguerPrompt {
    assume_yes: bool,
    interactive: bool,
}

impl DialoguerPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

impl DecisionPort for DialoguerPrompt {
    fn confirm(&self, decision: &Decision) -> bool {
        if self.assume_yes {
            return true;
        }
        if !self.interactive {
            tracing::warn!(
                remote_path = %decision.remote_path,
                "no terminal to confirm divergence, leaving both sides untouched"
            );
            return false;
        }

        println!();
        println!("{} {}", "Diverged:".yellow().bold(), decision.remote_path.cyan());
        println!(
            "  {}:  {}  ({})",
            "Local".dimmed(),
            decision.local_path.display(),
            decision.local_modified.format(TIME_FORMAT)
        );
        println!(
            "  {}: {}",
            "Remote".dimmed(),
            decision.remote_modified.format(TIME_FORMAT)
        );

        match Confirm::new()
            .with_prompt(describe(decision))
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "confirmation prompt failed, declining");
                false
            }
        }
    }
}

fn describe(decision: &Decision) -> String {
    match decision.direction {
        Direction::Upload => "Local copy is newer. Upload it?".to_string(),
        Direction::Download => {
            "Remote copy is newer. Download it (local file is snapshotted first)?".to_string()
        }
    }
}

/// Confirm a directory operation covering `count` files.
///
/// Small batches and `--yes` pass straight through. A large batch without a
/// terminal is refused rather than started unasked.
pub fn confirm_batch(count: usize, what: &str, assume_yes: bool) -> Result<bool> {
    if count <= LARGE_BATCH || assume_yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::user(format!(
            "{what} covers {count} files; pass --yes to proceed without confirmation"
        )));
    }
    Ok(Confirm::new()
        .with_prompt(format!("{what} covers {count} files. Continue?"))
        .default(false)
        .interact()?)
}
