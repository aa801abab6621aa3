//! Command context
//!
//! Resolves where the tracking file lives and which remote store the command
//! talks to. The remote is opened lazily so settings-only commands work
//! without one.

use std::path::PathBuf;
use std::sync::Arc;

use backup_core::TrackingStore;
use backup_remote::{GitHubStore, GitStore, RemoteStore};

use crate::cli::{Cli, RemoteArgs};
use crate::error::{CliError, Result};

pub struct Context {
    pub store: TrackingStore,
    pub remote_args: RemoteArgs,
    /// Skip confirmations.
    pub yes: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let path = state_path(cli.state.clone())?;
        Ok(Self {
            store: TrackingStore::open(path),
            remote_args: cli.remote.clone(),
            yes: cli.yes,
        })
    }

    pub fn remote(&self) -> Result<Arc<dyn RemoteStore>> {
        open_remote(&self.remote_args)
    }
}

/// `--state` if given, otherwise the platform default.
pub fn state_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit
        .or_else(TrackingStore::default_path)
        .ok_or_else(|| CliError::user("no config directory on this platform; pass --state <path>"))
}

/// Open the remote named by the flags. `--git-repo` wins over `--github`.
pub fn open_remote(args: &RemoteArgs) -> Result<Arc<dyn RemoteStore>> {
    if let Some(path) = &args.git_repo {
        tracing::debug!(path = %path.display(), "using local git repository as remote");
        return Ok(Arc::new(GitStore::open(path.clone())?));
    }
    if let Some(repo) = &args.github {
        tracing::debug!(%repo, branch = %args.branch, "using GitHub repository as remote");
        let mut store = GitHubStore::new(repo, args.token.as_deref(), &args.branch)?;
        if let Some(api) = &args.github_api {
            store = store.with_api_url(api);
        }
        return Ok(Arc::new(store));
    }
    Err(CliError::user(
        "no remote configured; pass --git-repo <path> or --github <owner/repo>",
    ))
}
