//! CLI argument parsing using clap derive

use std::path::PathBuf;

use backup_core::IntervalKind;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// file-backup - keep local files in step with a remote repository
#[derive(Parser, Debug)]
#[command(name = "file-backup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Tracking file (defaults to the platform config directory)
    #[arg(long, global = true, env = "FILE_BACKUP_STATE", value_name = "PATH")]
    pub state: Option<PathBuf>,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which remote store to talk to.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RemoteArgs {
    /// GitHub repository as OWNER/REPO
    #[arg(long, global = true, env = "FILE_BACKUP_GITHUB_REPO", value_name = "OWNER/REPO")]
    pub github: Option<String>,

    /// GitHub access token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Branch used with --github
    #[arg(long, global = true, env = "FILE_BACKUP_BRANCH", default_value = "main")]
    pub branch: String,

    /// API root for GitHub Enterprise servers
    #[arg(long, global = true, env = "FILE_BACKUP_GITHUB_API", value_name = "URL")]
    pub github_api: Option<String>,

    /// Local git repository used as the remote (takes precedence over --github)
    #[arg(long, global = true, env = "FILE_BACKUP_GIT_REPO", value_name = "PATH")]
    pub git_repo: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Reconcile every tracked file once
    Check {
        /// Print the pass report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the file-check and process-watch schedules until interrupted
    Daemon {
        /// Also append log lines to this file
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
    },

    /// Upload a local file (or every file in a directory) and track it
    ///
    /// Examples:
    ///   file-backup track saves/slot1.sav games/slot1.sav
    ///   file-backup track ./saves games/saves
    Track {
        /// Local file or directory
        local: PathBuf,
        /// Remote path (a folder when LOCAL is a directory)
        remote: String,
    },

    /// Download a remote file (or every file under a folder) and track it
    Pull {
        /// Remote file or folder
        remote: String,
        /// Local file (a directory when REMOTE is a folder)
        local: PathBuf,
    },

    /// Stop tracking a remote path
    Untrack {
        remote: String,

        /// Also delete the remote object
        #[arg(long)]
        delete_remote: bool,
    },

    /// List tracked pairs
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Browse the remote store
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },

    /// Manage exclusion rules for remote listings
    Exclude {
        #[command(subcommand)]
        action: NameAction,
    },

    /// Manage the watched process list
    Watch {
        #[command(subcommand)]
        action: NameAction,
    },

    /// Set a schedule interval in minutes
    Interval {
        #[arg(value_enum)]
        kind: IntervalArg,
        minutes: u64,
    },

    /// Turn confirmation before resolving a divergence on or off
    Prompt {
        #[arg(value_enum)]
        setting: Toggle,
    },

    /// Show settings and tracked pairs
    Status,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    /// List objects under a prefix
    Ls {
        #[arg(default_value = "")]
        prefix: String,
    },
}

/// add/remove/list over a set of names (exclusion rules or process names).
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum NameAction {
    Add { name: String },
    Remove { name: String },
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalArg {
    File,
    Process,
}

impl From<IntervalArg> for IntervalKind {
    fn from(arg: IntervalArg) -> Self {
        match arg {
            IntervalArg::File => IntervalKind::File,
            IntervalArg::Process => IntervalKind::Process,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("file-backup").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_track_with_global_flags_after_subcommand() {
        let cli = parse(&["track", "a.sav", "saves/a.sav", "--state", "s.json", "-y"]);
        assert_eq!(
            cli.command,
            Some(Commands::Track {
                local: PathBuf::from("a.sav"),
                remote: "saves/a.sav".into(),
            })
        );
        assert_eq!(cli.state, Some(PathBuf::from("s.json")));
        assert!(cli.yes);
    }

    #[test]
    fn parses_untrack_delete_flag() {
        let cli = parse(&["untrack", "a.sav", "--delete-remote"]);
        assert_eq!(
            cli.command,
            Some(Commands::Untrack {
                remote: "a.sav".into(),
                delete_remote: true,
            })
        );
    }

    #[test]
    fn parses_interval_kind() {
        let cli = parse(&["interval", "process", "5"]);
        assert_eq!(
            cli.command,
            Some(Commands::Interval {
                kind: IntervalArg::Process,
                minutes: 5,
            })
        );
        assert_eq!(IntervalKind::from(IntervalArg::Process), IntervalKind::Process);
    }

    #[test]
    fn rejects_negative_interval() {
        let result = Cli::try_parse_from(["file-backup", "interval", "file", "-3"]);
        assert!(result.is_err());
    }

    #[test]
    fn remote_ls_prefix_defaults_to_root() {
        let cli = parse(&["remote", "ls"]);
        assert_eq!(
            cli.command,
            Some(Commands::Remote {
                action: RemoteAction::Ls { prefix: String::new() }
            })
        );
    }

    #[test]
    fn parses_name_actions() {
        let cli = parse(&["watch", "add", "game.exe"]);
        assert_eq!(
            cli.command,
            Some(Commands::Watch {
                action: NameAction::Add {
                    name: "game.exe".into()
                }
            })
        );
        let cli = parse(&["exclude", "list"]);
        assert_eq!(
            cli.command,
            Some(Commands::Exclude {
                action: NameAction::List
            })
        );
    }

    #[test]
    fn parses_remote_selection() {
        let cli = parse(&["list", "--git-repo", "/srv/backup", "--branch", "dev"]);
        assert_eq!(cli.remote.git_repo, Some(PathBuf::from("/srv/backup")));
        assert_eq!(cli.remote.branch, "dev");
    }

    #[test]
    fn prompt_accepts_on_off() {
        let cli = parse(&["prompt", "off"]);
        assert_eq!(
            cli.command,
            Some(Commands::Prompt {
                setting: Toggle::Off
            })
        );
    }
}
