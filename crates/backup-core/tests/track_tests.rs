//! Tracking and untracking files against an in-memory remote

use backup_core::{Error, ErrorClass, Tracker, TrackingStore};
use backup_fs::RetryPolicy;
use backup_remote::{ExclusionRules, MemoryStore, RemoteStore};
use backup_test_utils::Workspace;
use pretty_assertions::assert_eq;

struct Fixture {
    ws: Workspace,
    store: TrackingStore,
    remote: MemoryStore,
}

impl Fixture {
    fn new() -> Self {
        let ws = Workspace::new();
        let store = TrackingStore::open(ws.state_path());
        Self {
            ws,
            store,
            remote: MemoryStore::new(),
        }
    }

    fn tracker(&self) -> Tracker<'_> {
        Tracker::new(&self.store, &self.remote).with_retry(RetryPolicy::immediate(1))
    }

    fn tracked(&self) -> Vec<String> {
        self.store
            .load()
            .unwrap()
            .pairs
            .into_iter()
            .map(|p| p.remote_path)
            .collect()
    }
}

#[test]
fn track_local_file_uploads_then_records() {
    let fx = Fixture::new();
    let local = fx.ws.write("saves/slot1.sav", b"progress");

    let pair = fx.tracker().track_local_file(&local, "/saves/slot1.sav").unwrap();

    assert_eq!(pair.remote_path, "saves/slot1.sav");
    assert!(pair.local_path.is_absolute());
    assert!(pair.local_path.ends_with("saves/slot1.sav"));
    assert_eq!(fx.remote.content("saves/slot1.sav").unwrap(), b"progress");
    assert_eq!(fx.tracked(), vec!["saves/slot1.sav"]);
}

#[test]
fn track_local_file_rejects_duplicates_before_uploading() {
    let fx = Fixture::new();
    let local = fx.ws.write("a.txt", b"a");
    fx.tracker().track_local_file(&local, "a.txt").unwrap();
    let other = fx.ws.write("b.txt", b"b");

    let same_remote = fx.tracker().track_local_file(&other, "a.txt").unwrap_err();
    let same_local = fx.tracker().track_local_file(&local, "copy/a.txt").unwrap_err();

    assert!(matches!(same_remote, Error::AlreadyTracked { .. }));
    assert!(matches!(same_local, Error::LocalAlreadyTracked { .. }));
    assert_eq!(fx.remote.put_count(), 1);
    assert_eq!(fx.remote.content("a.txt").unwrap(), b"a");
}

#[test]
fn track_local_file_requires_an_existing_file() {
    let fx = Fixture::new();

    let err = fx
        .tracker()
        .track_local_file(&fx.ws.path("nope.txt"), "nope.txt")
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::NotFound);
    assert!(fx.tracked().is_empty());
    assert_eq!(fx.remote.put_count(), 0);
}

#[test]
fn failed_upload_records_nothing() {
    let fx = Fixture::new();
    let local = fx.ws.write("a.txt", b"a");
    fx.remote.fail_path("a.txt");

    let err = fx.tracker().track_local_file(&local, "a.txt").unwrap_err();

    assert_eq!(err.class(), ErrorClass::Transport);
    assert!(fx.tracked().is_empty());
}

#[test]
fn track_local_dir_continues_past_failures() {
    let fx = Fixture::new();
    let a = fx.ws.write("saves/a.sav", b"a");
    fx.ws.write("saves/b.sav", b"b");
    fx.ws.write("saves/nested/c.sav", b"c");
    fx.tracker().track_local_file(&a, "backup/a.sav").unwrap();

    let report = fx
        .tracker()
        .track_local_dir(&fx.ws.path("saves"), "backup")
        .unwrap();

    assert_eq!(report.tracked.len(), 1);
    assert_eq!(report.tracked[0].remote_path, "backup/b.sav");
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, Error::AlreadyTracked { .. }));
    assert!(!fx.remote.contains("backup/c.sav"));
    assert_eq!(fx.tracked(), vec!["backup/a.sav", "backup/b.sav"]);
}

#[test]
fn track_remote_file_snapshots_existing_local() {
    let fx = Fixture::new();
    fx.remote.insert("saves/slot1.sav", "remote");
    fx.ws.write("saves/slot1.sav", b"local");

    fx.tracker()
        .track_remote_file("saves/slot1.sav", &fx.ws.path("saves/slot1.sav"))
        .unwrap();

    assert_eq!(fx.ws.read("saves/slot1.sav"), b"remote");
    assert_eq!(fx.ws.read("saves/slot1.sav.bak"), b"local");
    assert_eq!(fx.tracked(), vec!["saves/slot1.sav"]);
}

#[test]
fn track_remote_file_creates_missing_directories() {
    let fx = Fixture::new();
    fx.remote.insert("notes.md", "# notes");

    let pair = fx
        .tracker()
        .track_remote_file("notes.md", &fx.ws.path("deep/er/notes.md"))
        .unwrap();

    assert_eq!(fx.ws.read("deep/er/notes.md"), b"# notes");
    assert!(!fx.ws.exists("deep/er/notes.md.bak"));
    assert!(pair.local_path.ends_with("deep/er/notes.md"));
}

#[test]
fn track_remote_file_missing_object_records_nothing() {
    let fx = Fixture::new();

    let err = fx
        .tracker()
        .track_remote_file("nope.txt", &fx.ws.path("nope.txt"))
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::NotFound);
    assert!(!fx.ws.exists("nope.txt"));
    assert!(fx.tracked().is_empty());
}

#[test]
fn track_remote_dir_skips_excluded_objects() {
    let fx = Fixture::new();
    fx.remote.insert("game/slot1.sav", "1");
    fx.remote.insert("game/sub/slot2.sav", "2");
    fx.remote.insert("game/logs/run.log", "log");
    fx.remote.insert("game/.gitignore", "*");
    let rules: ExclusionRules = ["logs/"].into_iter().collect();

    let report = fx
        .tracker()
        .track_remote_dir("game", &fx.ws.path("local"), &rules)
        .unwrap();

    assert!(report.failed.is_empty());
    let mut tracked = fx.tracked();
    tracked.sort();
    assert_eq!(tracked, vec!["game/slot1.sav", "game/sub/slot2.sav"]);
    assert_eq!(fx.ws.read("local/slot1.sav"), b"1");
    assert_eq!(fx.ws.read("local/slot2.sav"), b"2");
    assert!(!fx.ws.exists("local/run.log"));
}

#[test]
fn track_remote_dir_on_missing_folder_fails() {
    let fx = Fixture::new();

    let err = fx
        .tracker()
        .track_remote_dir("missing", &fx.ws.path("local"), &ExclusionRules::default())
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn untrack_leaves_both_sides() {
    let fx = Fixture::new();
    let local = fx.ws.write("a.txt", b"a");
    fx.tracker().track_local_file(&local, "a.txt").unwrap();

    let pair = fx.tracker().untrack("a.txt").unwrap();

    assert_eq!(pair.remote_path, "a.txt");
    assert!(fx.tracked().is_empty());
    assert!(fx.remote.contains("a.txt"));
    assert!(fx.ws.exists("a.txt"));
    assert!(matches!(fx.tracker().untrack("a.txt"), Err(Error::NotTracked { .. })));
}

#[test]
fn untrack_and_delete_removes_remote_object() {
    let fx = Fixture::new();
    let local = fx.ws.write("a.txt", b"a");
    fx.tracker().track_local_file(&local, "a.txt").unwrap();

    let untracked = fx.tracker().untrack_and_delete("a.txt").unwrap();

    assert!(untracked.remote_deleted);
    assert_eq!(fx.remote.delete_count(), 1);
    assert!(!fx.remote.contains("a.txt"));
    assert!(fx.ws.exists("a.txt"));
    assert!(fx.tracked().is_empty());
}

#[test]
fn untrack_and_delete_tolerates_missing_remote_object() {
    let fx = Fixture::new();
    let local = fx.ws.write("a.txt", b"a");
    fx.tracker().track_local_file(&local, "a.txt").unwrap();
    fx.remote.delete_object("a.txt").unwrap();

    let untracked = fx.tracker().untrack_and_delete("a.txt").unwrap();

    assert!(!untracked.remote_deleted);
    assert!(fx.tracked().is_empty());
}

#[test]
fn list_remote_always_applies_default_exclusions() {
    let fx = Fixture::new();
    fx.remote.insert("src/main.rs", "fn main() {}");
    fx.remote.insert("build/out.bin", "bin");
    fx.remote.insert(".idea/workspace.xml", "<xml/>");
    fx.remote.insert("notes/todo.md", "- x");

    let rules: ExclusionRules = ["notes/"].into_iter().collect();

    let listed = fx.tracker().list_remote("", &rules).unwrap();

    assert_eq!(listed, vec!["src/main.rs"]);
}

#[test]
fn track_remote_dir_fills_an_empty_directory() {
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    let fx = Fixture::new();
    fx.remote.insert("config/app.toml", "debug = true");
    fx.remote.insert("config/keys.json", "{}");
    let target = assert_fs::TempDir::new().unwrap();
    let restored = target.path().join("restored");

    let report = fx
        .tracker()
        .track_remote_dir("config", &restored, &ExclusionRules::default())
        .unwrap();

    assert_eq!(report.tracked.len(), 2);
    target
        .child("restored/app.toml")
        .assert(predicate::str::contains("debug = true"));
    target.child("restored/keys.json").assert(predicate::path::is_file());
    target
        .child("restored/app.toml.bak")
        .assert(predicate::path::missing());
}
