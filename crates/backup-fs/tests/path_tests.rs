use backup_fs::{BACKUP_SUFFIX, NormalizedPath};
use rstest::rstest;

#[rstest]
#[case("foo/bar/baz", "foo/bar/baz")]
#[case("foo\\bar\\baz", "foo/bar/baz")]
#[case("foo/bar\\baz", "foo/bar/baz")]
#[case("foo//bar/./baz/", "foo/bar/baz")]
#[case("/abs//path", "/abs/path")]
#[case("//server/share", "//server/share")]
fn normalizes_separators(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(NormalizedPath::new(input).as_str(), expected);
}

#[test]
fn join_paths() {
    let joined = NormalizedPath::new("foo/bar").join("baz");
    assert_eq!(joined.as_str(), "foo/bar/baz");
}

#[test]
fn backup_suffix_is_appended_to_file_name() {
    let path = NormalizedPath::new("saves/slot1.sav");
    assert_eq!(path.with_suffix(BACKUP_SUFFIX).as_str(), "saves/slot1.sav.bak");
}

#[test]
fn file_name_and_extension() {
    let path = NormalizedPath::new("foo/bar/baz.txt");
    assert_eq!(path.file_name(), Some("baz.txt"));
    assert_eq!(path.extension(), Some("txt"));
}

#[test]
fn dotfile_has_no_extension() {
    assert_eq!(NormalizedPath::new("dir/.gitignore").extension(), None);
}

#[test]
fn exists_false_for_nonexistent() {
    let path = NormalizedPath::new("/nonexistent/path/that/does/not/exist");
    assert!(!path.exists());
}
