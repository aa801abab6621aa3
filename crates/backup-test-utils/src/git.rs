//! Git repository fixtures built with `git2`, no `git` binary required.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use git2::{Repository, Signature, Time};

/// Initialises a non-bare repository with a committer identity configured.
///
/// # Panics
/// Panics if the repository cannot be created.
pub fn real_git_repo(path: &Path) -> Repository {
    let repo = Repository::init(path).unwrap_or_else(|e| {
        panic!(
            "real_git_repo: failed to init repository at {}: {e}",
            path.display()
        )
    });
    {
        let mut config = repo
            .config()
            .unwrap_or_else(|e| panic!("real_git_repo: failed to open config: {e}"));
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        config.set_bool("commit.gpgsign", false).unwrap();
    }
    repo
}

/// Writes `content` to `rel` in the working tree and commits it on `HEAD`
/// with author and committer time `when`.
///
/// # Panics
/// Panics if any git operation fails.
pub fn commit_file_at(
    repo: &Repository,
    rel: &str,
    content: &[u8],
    when: DateTime<Utc>,
) -> git2::Oid {
    let workdir = repo
        .workdir()
        .unwrap_or_else(|| panic!("commit_file_at: repository is bare"));
    let target = workdir.join(rel);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&target, content).unwrap();

    let mut index = repo.index().unwrap();
    // Another handle may have committed since this one last looked
    index.read(true).unwrap();
    index.add_path(Path::new(rel)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let signature =
        Signature::new("Test User", "test@test.com", &Time::new(when.timestamp(), 0)).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &format!("Write {rel}"),
        &tree,
        &parents,
    )
    .unwrap_or_else(|e| panic!("commit_file_at: commit failed: {e}"))
}

/// Makes a commit touching only a throwaway file, at time `when`.
///
/// # Panics
/// Panics if any git operation fails.
pub fn commit_unrelated_at(repo: &Repository, when: DateTime<Utc>) -> git2::Oid {
    let name = format!("unrelated-{}.txt", when.timestamp());
    commit_file_at(repo, &name, b"noise", when)
}
