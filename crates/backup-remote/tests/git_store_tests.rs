//! GitStore against real repositories built with git2

use backup_remote::{ExclusionRules, GitStore, RemoteError, RemoteStore};
use backup_test_utils::git::{commit_file_at, commit_unrelated_at, real_git_repo};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn setup() -> (TempDir, git2::Repository, GitStore) {
    let temp = TempDir::new().unwrap();
    let repo = real_git_repo(temp.path());
    let store = GitStore::open(temp.path()).unwrap();
    (temp, repo, store)
}

#[test]
fn reads_committed_content() {
    let (_temp, repo, store) = setup();
    commit_file_at(&repo, "saves/slot1.sav", b"progress", at(1_700_000_000));

    assert_eq!(store.get_object_content("saves/slot1.sav").unwrap(), b"progress");
    assert_eq!(store.get_object_meta("/saves/slot1.sav").unwrap().size, 8);
}

#[test]
fn missing_object_is_not_found() {
    let (_temp, repo, store) = setup();
    commit_file_at(&repo, "a.txt", b"a", at(1_700_000_000));

    assert!(store.get_object_content("b.txt").unwrap_err().is_not_found());
    assert!(store.get_last_change_time("b.txt").unwrap_err().is_not_found());
}

#[test]
fn directories_are_not_objects() {
    let (_temp, repo, store) = setup();
    commit_file_at(&repo, "saves/slot1.sav", b"x", at(1_700_000_000));

    assert!(store.get_object_content("saves").unwrap_err().is_not_found());
}

#[test]
fn unborn_repository_is_empty() {
    let (_temp, _repo, store) = setup();

    assert!(store.get_object_content("a.txt").unwrap_err().is_not_found());
    assert!(store.list_objects("", &ExclusionRules::default()).unwrap().is_empty());
}

#[test]
fn last_change_ignores_unrelated_commits() {
    let (_temp, repo, store) = setup();
    commit_file_at(&repo, "a.txt", b"v1", at(1_700_000_000));
    commit_unrelated_at(&repo, at(1_700_000_500));

    assert_eq!(store.get_last_change_time("a.txt").unwrap(), at(1_700_000_000));

    commit_file_at(&repo, "a.txt", b"v2", at(1_700_001_000));
    commit_unrelated_at(&repo, at(1_700_002_000));

    assert_eq!(store.get_last_change_time("a.txt").unwrap(), at(1_700_001_000));
}

#[test]
fn put_creates_then_updates_with_new_commits() {
    let (temp, repo, store) = setup();
    commit_file_at(&repo, "README.md", b"readme", at(1_700_000_000));

    store.put_object("saves/new.sav", b"first").unwrap();
    assert_eq!(store.get_object_content("saves/new.sav").unwrap(), b"first");
    let created = store.get_last_change_time("saves/new.sav").unwrap();
    assert!(created > at(1_700_000_000));

    store.put_object("saves/new.sav", b"second").unwrap();
    assert_eq!(store.get_object_content("saves/new.sav").unwrap(), b"second");
    assert_eq!(std::fs::read(temp.path().join("saves/new.sav")).unwrap(), b"second");

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("Update saves/new.sav via file-backup"));
    assert_eq!(head.parent_count(), 1);
}

#[test]
fn put_into_unborn_repository_makes_root_commit() {
    let (_temp, repo, store) = setup();

    store.put_object("first.txt", b"hello").unwrap();

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.parent_count(), 0);
    assert_eq!(head.message(), Some("Create first.txt via file-backup"));
}

#[test]
fn delete_removes_object_and_reports_missing() {
    let (temp, repo, store) = setup();
    commit_file_at(&repo, "a.txt", b"a", at(1_700_000_000));
    commit_file_at(&repo, "b.txt", b"b", at(1_700_000_100));

    store.delete_object("a.txt").unwrap();

    assert!(store.get_object_content("a.txt").unwrap_err().is_not_found());
    assert!(!temp.path().join("a.txt").exists());
    assert_eq!(store.get_object_content("b.txt").unwrap(), b"b");
    assert!(matches!(
        store.delete_object("a.txt"),
        Err(RemoteError::NotFound { .. })
    ));
}

#[test]
fn listing_prunes_excluded_directories() {
    let (_temp, repo, store) = setup();
    for (i, path) in [
        "saves/slot1.sav",
        "saves/build/cache.bin",
        "saves/.gitignore",
        "saves/deep/slot2.sav",
        "other/notes.txt",
    ]
    .iter()
    .enumerate()
    {
        commit_file_at(&repo, path, b"x", at(1_700_000_000 + i as i64));
    }
    let rules = ExclusionRules::default().with_defaults();

    assert_eq!(
        store.list_objects("saves", &rules).unwrap(),
        vec!["saves/deep/slot2.sav", "saves/slot1.sav"]
    );
    assert_eq!(
        store.list_objects("", &rules).unwrap(),
        vec!["other/notes.txt", "saves/deep/slot2.sav", "saves/slot1.sav"]
    );
    assert_eq!(
        store.list_objects("saves/slot1.sav", &rules).unwrap(),
        vec!["saves/slot1.sav"]
    );
    assert!(store.list_objects("missing", &rules).unwrap_err().is_not_found());
}

#[test]
fn bare_repository_is_rejected() {
    let temp = TempDir::new().unwrap();
    git2::Repository::init_bare(temp.path()).unwrap();

    assert!(GitStore::open(temp.path()).unwrap_err().is_transport());
}

#[test]
fn non_repository_is_rejected() {
    let temp = TempDir::new().unwrap();
    assert!(GitStore::open(temp.path()).is_err());
}
