use backup_fs::{ConfigStore, Error, NormalizedPath};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Settings {
    interval: u32,
    excluded: Vec<String>,
}

fn sample() -> Settings {
    Settings {
        interval: 60,
        excluded: vec![".idea/".into(), "build/".into()],
    }
}

#[rstest]
#[case("settings.json")]
#[case("settings.toml")]
#[case("settings.yaml")]
#[case("settings.YML")]
fn save_then_load_in_each_format(#[case] name: &str) {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join(name));
    let store = ConfigStore::new();

    store.save(&path, &sample()).unwrap();
    let loaded: Settings = store.load(&path).unwrap();

    assert_eq!(loaded, sample());
}

#[test]
fn json_is_written_pretty() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("settings.json"));

    ConfigStore::new().save(&path, &sample()).unwrap();

    let text = fs::read_to_string(path.to_native()).unwrap();
    assert!(text.contains("\n  \"interval\": 60"));
}

#[test]
fn malformed_document_reports_format_and_path() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("settings.json");
    fs::write(&file_path, "{ not json").unwrap();

    let err = ConfigStore::new()
        .load::<Settings>(&NormalizedPath::new(&file_path))
        .unwrap_err();

    match err {
        Error::ConfigParse { format, path, .. } => {
            assert_eq!(format, "JSON");
            assert!(path.ends_with("settings.json"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn unknown_extension_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("settings.ini"));

    let err = ConfigStore::new().save(&path, &sample()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat { extension } if extension == "ini"));
}
