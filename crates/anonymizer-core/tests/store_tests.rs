use std::collections::HashSet;
use std::fs;

use anonymizer_core::store::DEFAULT_MAPPING_FILE;
use anonymizer_core::{AnonymizationRecord, Error, HashAlgorithm, Mapping, MappingStore};
use tempfile::tempdir;

fn sample_mapping() -> Mapping {
    Mapping::from_records(vec![
        AnonymizationRecord::new("", "payroll.xlsx", "9f86d081884c7d65.xlsx", HashAlgorithm::Sha256),
        AnonymizationRecord::new("hr", "payroll.xlsx", "9f86d081884c7d65.xlsx", HashAlgorithm::Sha256),
        AnonymizationRecord::new("", "memo", "0cc175b9c0f1b6a8", HashAlgorithm::Md5),
    ])
    .unwrap()
}

#[test]
fn test_commit_and_load_round_trip() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
    let mapping = sample_mapping();

    store.commit(&mapping).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded, mapping);
    assert_eq!(
        loaded.lookup("hr", "payroll.xlsx").unwrap().anonymized_name,
        "9f86d081884c7d65.xlsx"
    );
    assert_eq!(loaded.records()[2].algorithm, HashAlgorithm::Md5);
}

#[test]
fn test_load_commit_cycle_is_byte_stable() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
    store.commit(&sample_mapping()).unwrap();
    let first = fs::read(store.path()).unwrap();

    let loaded = store.load().unwrap();
    store.commit(&loaded).unwrap();
    let second = fs::read(store.path()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_file_format_fields() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
    store.commit(&sample_mapping()).unwrap();

    let json: serde_json::Value = serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
    assert_eq!(json["version"], 1);
    let first = &json["records"][0];
    assert_eq!(first["original_name"], "payroll.xlsx");
    assert_eq!(first["anonymized_name"], "9f86d081884c7d65.xlsx");
    assert_eq!(first["algorithm"], "sha256");
    assert!(first["created_at"].is_string());
}

#[test]
fn test_records_without_directory_default_to_root() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
    fs::write(
        store.path(),
        r#"{
  "version": 1,
  "records": [
    {
      "original_name": "a.txt",
      "anonymized_name": "b.txt",
      "algorithm": "sha1",
      "created_at": "2024-05-01T12:00:00Z"
    }
  ]
}"#,
    )
    .unwrap();

    let mapping = store.load().unwrap();
    let record = mapping.lookup("", "a.txt").unwrap();
    assert_eq!(record.anonymized_name, "b.txt");
    assert_eq!(record.algorithm, HashAlgorithm::Sha1);
}

#[test]
fn test_non_bijective_file_is_rejected() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
    fs::write(
        store.path(),
        r#"{"version": 1, "records": [
            {"original_name": "a.txt", "anonymized_name": "x.txt", "algorithm": "sha256", "created_at": "2024-05-01T12:00:00Z"},
            {"original_name": "b.txt", "anonymized_name": "x.txt", "algorithm": "sha256", "created_at": "2024-05-01T12:00:00Z"}
        ]}"#,
    )
    .unwrap();

    assert!(matches!(store.load().unwrap_err(), Error::Persistence { .. }));
}

#[test]
fn test_unknown_version_is_rejected() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
    fs::write(store.path(), r#"{"version": 7, "records": []}"#).unwrap();
    assert!(matches!(store.load().unwrap_err(), Error::Persistence { .. }));
}

#[test]
fn test_commit_into_missing_directory_fails() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::new(tmp.path().join("gone").join(DEFAULT_MAPPING_FILE));
    let err = store.commit(&sample_mapping()).unwrap_err();
    assert!(matches!(err, Error::Persistence { .. }));
}

#[test]
fn test_commit_replaces_previous_mapping() {
    let tmp = tempdir().unwrap();
    let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
    store.commit(&sample_mapping()).unwrap();

    let smaller = Mapping::new()
        .append(AnonymizationRecord::new("", "only.txt", "1.txt", HashAlgorithm::Blake3))
        .unwrap();
    store.commit(&smaller).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 1);
    let originals: HashSet<&str> = loaded
        .records()
        .iter()
        .map(|r| r.original_name.as_str())
        .collect();
    assert!(originals.contains("only.txt"));
}
