use backup_fs::{
    BACKUP_SUFFIX, NormalizedPath, RetryPolicy, RobustnessConfig, hash_bytes, hash_file, io,
};
use fs2::FileExt;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn write_atomic_creates_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("tracking.json"));

    io::write_atomic(&path, b"{}", RobustnessConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(path.to_native()).unwrap(), "{}");
}

#[test]
fn write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("tracking.json");
    fs::write(&file_path, "original").unwrap();

    let path = NormalizedPath::new(&file_path);
    io::write_atomic(&path, b"updated", RobustnessConfig::default()).unwrap();

    assert_eq!(fs::read_to_string(&file_path).unwrap(), "updated");
}

#[test]
fn replace_file_leaves_no_sidecar_files() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("save.dat");
    fs::write(&file_path, "old").unwrap();

    let path = NormalizedPath::new(&file_path);
    io::replace_file(&path, b"new", RetryPolicy::immediate(1)).unwrap();

    assert_eq!(fs::read(&file_path).unwrap(), b"new");
    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["save.dat".to_string()]);
}

#[test]
fn replace_file_creates_missing_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("a/b/save.dat"));

    io::replace_file(&path, b"bytes", RetryPolicy::immediate(1)).unwrap();

    assert_eq!(fs::read(path.to_native()).unwrap(), b"bytes");
}

#[test]
fn snapshot_copies_and_keeps_original() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("save.dat");
    fs::write(&file_path, "precious").unwrap();
    let path = NormalizedPath::new(&file_path);

    let backup = io::snapshot(&path, RetryPolicy::immediate(1))
        .unwrap()
        .expect("existing file should be snapshotted");

    assert!(backup.as_str().ends_with(&format!("save.dat{BACKUP_SUFFIX}")));
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "precious");
    assert_eq!(hash_file(&backup.to_native()).unwrap(), hash_bytes(b"precious"));
}

#[test]
fn snapshot_overwrites_previous_snapshot() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("save.dat");
    fs::write(temp.path().join("save.dat.bak"), "stale").unwrap();
    fs::write(&file_path, "fresh").unwrap();

    let backup = io::snapshot(&NormalizedPath::new(&file_path), RetryPolicy::immediate(1))
        .unwrap()
        .unwrap();

    assert_eq!(fs::read_to_string(backup.to_native()).unwrap(), "fresh");
}

#[test]
fn snapshot_of_missing_file_is_none() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.dat"));

    assert!(io::snapshot(&path, RetryPolicy::immediate(1)).unwrap().is_none());
    assert!(!temp.path().join("absent.dat.bak").exists());
}

#[test]
fn held_file_is_reported_locked_and_left_alone() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("slot1.sav");
    fs::write(&file_path, "in use").unwrap();
    let path = NormalizedPath::new(&file_path);

    let holder = fs::File::open(&file_path).unwrap();
    FileExt::lock_exclusive(&holder).unwrap();

    let snapshot = io::snapshot(&path, RetryPolicy::immediate(2)).unwrap_err();
    assert!(snapshot.is_locked());
    assert!(!temp.path().join("slot1.sav.bak").exists());

    let replace = io::replace_file(&path, b"new", RetryPolicy::immediate(2)).unwrap_err();
    assert!(replace.is_locked());

    FileExt::unlock(&holder).unwrap();
    drop(holder);
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "in use");
    io::replace_file(&path, b"new", RetryPolicy::immediate(1)).unwrap();
    assert_eq!(fs::read(&file_path).unwrap(), b"new");
}

#[test]
fn read_bytes_missing_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("absent.dat"));

    let err = io::read_bytes(&path, RetryPolicy::immediate(3)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn modified_time_reflects_set_modified() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("save.dat");
    fs::write(&file_path, "x").unwrap();
    let when = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
    fs::File::options()
        .write(true)
        .open(&file_path)
        .unwrap()
        .set_modified(when)
        .unwrap();

    let mtime = io::modified_time(&NormalizedPath::new(&file_path)).unwrap();
    assert_eq!(mtime, when);
}

#[test]
fn read_text_roundtrips_write_text() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("notes.txt"));

    io::write_text(&path, "hello").unwrap();
    assert_eq!(io::read_text(&path).unwrap(), "hello");
}
