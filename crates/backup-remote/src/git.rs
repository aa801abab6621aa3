//! Remote store backed by a local git repository
//!
//! Objects are the blobs reachable from the `HEAD` tree. A write builds the
//! new tree in memory against the `HEAD` it started from and commits only if
//! `HEAD` has not moved; the working tree and index follow after the commit.
//! The repository can be pushed anywhere with ordinary git tooling.

use std::fs;
use std::path::Path;

use backup_fs::NormalizedPath;
use chrono::{DateTime, TimeZone, Utc};
use git2::{
    Commit, ErrorCode, Index, IndexEntry, IndexTime, ObjectType, Oid, Repository, Signature, Tree,
};
use tracing::{debug, warn};

use crate::{ExclusionRules, ObjectMeta, RemoteError, RemoteStore, Result, normalize_remote_path};

const COMMITTER: &str = "file-backup";
const COMMITTER_EMAIL: &str = "file-backup@localhost";
const BLOB_MODE: u32 = 0o100644;

#[derive(Debug, Clone, Copy)]
enum Change<'c> {
    Write(&'c [u8]),
    Remove,
}

/// A tree built against a known `HEAD`, not yet committed.
#[derive(Debug)]
struct PreparedChange {
    parent: Option<Oid>,
    tree: Oid,
    existed: bool,
}

/// A [`RemoteStore`] over a non-bare git repository on disk.
#[derive(Debug, Clone)]
pub struct GitStore {
    root: NormalizedPath,
}

impl GitStore {
    /// Open the repository rooted at `root`.
    pub fn open(root: impl Into<NormalizedPath>) -> Result<Self> {
        let root = root.into();
        let repo = Repository::open(root.to_native())
            .map_err(|e| RemoteError::transport(root.as_str(), e.message()))?;
        if repo.is_bare() {
            return Err(RemoteError::transport(
                root.as_str(),
                "repository has no working tree",
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    fn repo(&self, path: &str) -> Result<Repository> {
        Repository::open(self.root.to_native()).map_err(|e| git_error(path, e))
    }

    fn head_commit<'r>(repo: &'r Repository, path: &str) -> Result<Option<Commit<'r>>> {
        match repo.head() {
            Ok(head) => head.peel_to_commit().map(Some).map_err(|e| git_error(path, e)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(git_error(path, e)),
        }
    }

    /// Build the tree `HEAD` would have after `change`. Nothing outside the
    /// object database is touched.
    fn prepare(
        &self,
        repo: &Repository,
        path: &str,
        change: Change<'_>,
    ) -> Result<PreparedChange> {
        let parent = Self::head_commit(repo, path)?;
        let parent_tree = match &parent {
            Some(commit) => Some(commit.tree().map_err(|e| git_error(path, e))?),
            None => None,
        };
        let existing = parent_tree.as_ref().and_then(|tree| {
            tree.get_path(Path::new(path))
                .ok()
                .filter(|entry| entry.kind() == Some(ObjectType::Blob))
        });
        if matches!(change, Change::Remove) && existing.is_none() {
            return Err(RemoteError::not_found(path));
        }

        let mut index = Index::new().map_err(|e| git_error(path, e))?;
        if let Some(tree) = &parent_tree {
            index.read_tree(tree).map_err(|e| git_error(path, e))?;
        }
        match change {
            Change::Write(content) => {
                let blob = repo.blob(content).map_err(|e| git_error(path, e))?;
                let mode = existing
                    .as_ref()
                    .and_then(|entry| u32::try_from(entry.filemode()).ok())
                    .unwrap_or(BLOB_MODE);
                index
                    .add(&index_entry(path, blob, mode, content.len()))
                    .map_err(|e| git_error(path, e))?;
            }
            Change::Remove => index
                .remove_path(Path::new(path))
                .map_err(|e| git_error(path, e))?,
        }
        let tree = index.write_tree_to(repo).map_err(|e| git_error(path, e))?;

        Ok(PreparedChange {
            parent: parent.as_ref().map(Commit::id),
            tree,
            existed: existing.is_some(),
        })
    }

    /// Commit a prepared tree if `HEAD` is still its parent, then bring the
    /// working tree and index in line with it.
    fn commit_prepared(
        &self,
        repo: &Repository,
        path: &str,
        prepared: &PreparedChange,
        change: Change<'_>,
        message: &str,
    ) -> Result<()> {
        let current = Self::head_commit(repo, path)?.map(|c| c.id());
        if current != prepared.parent {
            return Err(RemoteError::Stale { path: path.to_string() });
        }

        let parent = match prepared.parent {
            Some(id) => Some(repo.find_commit(id).map_err(|e| git_error(path, e))?),
            None => None,
        };
        let tree = repo.find_tree(prepared.tree).map_err(|e| git_error(path, e))?;
        let signature = repo
            .signature()
            .or_else(|_| Signature::now(COMMITTER, COMMITTER_EMAIL))
            .map_err(|e| git_error(path, e))?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|e| match e.code() {
                ErrorCode::Modified => RemoteError::Stale { path: path.to_string() },
                _ => git_error(path, e),
            })?;
        debug!(path, message, "committed change");

        // Checkout drift does not undo the commit
        if let Err(e) = sync_worktree(repo, path, change) {
            warn!(path, error = %e, "committed, but the working tree was not updated");
        }
        Ok(())
    }
}

impl RemoteStore for GitStore {
    fn describe(&self) -> String {
        format!("git:{}", self.root)
    }

    fn get_object_content(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_remote_path(path);
        let repo = self.repo(&path)?;
        let oid = blob_at_head(&repo, &path)?.ok_or_else(|| RemoteError::not_found(&path))?;
        let blob = repo.find_blob(oid).map_err(|e| git_error(&path, e))?;
        Ok(blob.content().to_vec())
    }

    fn get_object_meta(&self, path: &str) -> Result<ObjectMeta> {
        let path = normalize_remote_path(path);
        let repo = self.repo(&path)?;
        let oid = blob_at_head(&repo, &path)?.ok_or_else(|| RemoteError::not_found(&path))?;
        let blob = repo.find_blob(oid).map_err(|e| git_error(&path, e))?;
        Ok(ObjectMeta {
            size: blob.size() as u64,
            identity: oid.to_string(),
            path,
        })
    }

    fn get_last_change_time(&self, path: &str) -> Result<DateTime<Utc>> {
        let path = normalize_remote_path(path);
        let repo = self.repo(&path)?;
        let head = Self::head_commit(&repo, &path)?.ok_or_else(|| RemoteError::not_found(&path))?;

        let mut revwalk = repo.revwalk().map_err(|e| git_error(&path, e))?;
        revwalk.push(head.id()).map_err(|e| git_error(&path, e))?;
        revwalk
            .set_sorting(git2::Sort::TIME)
            .map_err(|e| git_error(&path, e))?;

        for oid in revwalk {
            let commit = repo
                .find_commit(oid.map_err(|e| git_error(&path, e))?)
                .map_err(|e| git_error(&path, e))?;
            let tree = commit.tree().map_err(|e| git_error(&path, e))?;
            let here = entry_id(&tree, &path);
            let before = match commit.parent(0) {
                Ok(parent) => entry_id(&parent.tree().map_err(|e| git_error(&path, e))?, &path),
                Err(_) => None,
            };
            if here != before {
                if here.is_none() {
                    // Newest change removed the path
                    break;
                }
                let seconds = commit.time().seconds();
                return Utc
                    .timestamp_opt(seconds, 0)
                    .single()
                    .ok_or_else(|| {
                        RemoteError::decode(&path, format!("invalid commit time {seconds}"))
                    });
            }
        }
        Err(RemoteError::not_found(path))
    }

    fn put_object(&self, path: &str, content: &[u8]) -> Result<()> {
        let path = normalize_remote_path(path);
        let repo = self.repo(&path)?;
        let change = Change::Write(content);
        let prepared = self.prepare(&repo, &path, change)?;
        let verb = if prepared.existed { "Update" } else { "Create" };
        self.commit_prepared(
            &repo,
            &path,
            &prepared,
            change,
            &format!("{verb} {path} via file-backup"),
        )
    }

    fn delete_object(&self, path: &str) -> Result<()> {
        let path = normalize_remote_path(path);
        let repo = self.repo(&path)?;
        let prepared = self.prepare(&repo, &path, Change::Remove)?;
        self.commit_prepared(
            &repo,
            &path,
            &prepared,
            Change::Remove,
            &format!("Delete {path} via file-backup"),
        )
    }

    fn list_objects(&self, prefix: &str, rules: &ExclusionRules) -> Result<Vec<String>> {
        let prefix = normalize_remote_path(prefix);
        let repo = self.repo(&prefix)?;
        let Some(head) = Self::head_commit(&repo, &prefix)? else {
            return if prefix.is_empty() {
                Ok(Vec::new())
            } else {
                Err(RemoteError::not_found(prefix))
            };
        };
        let root = head.tree().map_err(|e| git_error(&prefix, e))?;

        let mut out = Vec::new();
        if prefix.is_empty() {
            walk_tree(&repo, &root, "", rules, &mut out)?;
            return Ok(out);
        }

        let entry = root
            .get_path(Path::new(&prefix))
            .map_err(|_| RemoteError::not_found(&prefix))?;
        match entry.kind() {
            Some(ObjectType::Tree) => {
                if !rules.is_excluded_dir(&prefix) {
                    let tree = repo.find_tree(entry.id()).map_err(|e| git_error(&prefix, e))?;
                    walk_tree(&repo, &tree, &prefix, rules, &mut out)?;
                }
            }
            Some(ObjectType::Blob) if !rules.is_excluded(&prefix) => out.push(prefix),
            _ => {}
        }
        Ok(out)
    }
}

fn walk_tree(
    repo: &Repository,
    tree: &Tree<'_>,
    base: &str,
    rules: &ExclusionRules,
    out: &mut Vec<String>,
) -> Result<()> {
    for entry in tree.iter() {
        let Some(name) = entry.name() else { continue };
        let path = if base.is_empty() {
            name.to_string()
        } else {
            format!("{base}/{name}")
        };
        match entry.kind() {
            Some(ObjectType::Tree) => {
                if rules.is_excluded_dir(&path) {
                    continue;
                }
                let subtree = repo.find_tree(entry.id()).map_err(|e| git_error(&path, e))?;
                walk_tree(repo, &subtree, &path, rules, out)?;
            }
            Some(ObjectType::Blob) => {
                if !rules.is_excluded(&path) {
                    out.push(path);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn blob_at_head(repo: &Repository, path: &str) -> Result<Option<Oid>> {
    let Some(head) = GitStore::head_commit(repo, path)? else {
        return Ok(None);
    };
    let tree = head.tree().map_err(|e| git_error(path, e))?;
    Ok(tree
        .get_path(Path::new(path))
        .ok()
        .filter(|entry| entry.kind() == Some(ObjectType::Blob))
        .map(|entry| entry.id()))
}

fn index_entry(path: &str, id: Oid, mode: u32, size: usize) -> IndexEntry {
    IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode,
        uid: 0,
        gid: 0,
        file_size: u32::try_from(size).unwrap_or(u32::MAX),
        id,
        flags: 0,
        flags_extended: 0,
        path: path.as_bytes().to_vec(),
    }
}

/// Mirror a committed change into the checkout and the on-disk index.
fn sync_worktree(repo: &Repository, path: &str, change: Change<'_>) -> Result<()> {
    let Some(workdir) = repo.workdir() else {
        return Ok(());
    };
    let target = workdir.join(path);
    match change {
        Change::Write(content) => {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| RemoteError::transport(path, e))?;
            }
            fs::write(&target, content).map_err(|e| RemoteError::transport(path, e))?;
        }
        Change::Remove => match fs::remove_file(&target) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RemoteError::transport(path, e)),
        },
    }

    let mut index = repo.index().map_err(|e| git_error(path, e))?;
    index.read(true).map_err(|e| git_error(path, e))?;
    let staged = match change {
        Change::Write(_) => index.add_path(Path::new(path)),
        Change::Remove => index.remove_path(Path::new(path)),
    };
    staged.map_err(|e| git_error(path, e))?;
    index.write().map_err(|e| git_error(path, e))
}

fn entry_id(tree: &Tree<'_>, path: &str) -> Option<Oid> {
    tree.get_path(Path::new(path)).ok().map(|entry| entry.id())
}

fn git_error(path: &str, err: git2::Error) -> RemoteError {
    if err.code() == ErrorCode::NotFound {
        RemoteError::not_found(path)
    } else {
        RemoteError::transport(path, err.message())
    }
}
