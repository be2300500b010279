use crate::error::{Error, Result};
use crate::model::AnonymizationRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_MAPPING_FILE: &str = ".anonymizer-map.json";
const MAPPING_FORMAT_VERSION: u32 = 1;
const TEMP_SUFFIX: &str = ".tmp";

type Key = (String, String);

fn key(directory: &str, name: &str) -> Key {
    (directory.to_string(), name.to_string())
}

/// Bijective original <-> anonymized name record set for one root directory.
///
/// Names are unique per directory in both directions. Records keep their
/// insertion order, which is also the order they are written to disk.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    records: Vec<AnonymizationRecord>,
    forward: HashMap<Key, usize>,
    reverse: HashMap<Key, usize>,
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from records, rejecting anything that breaks bijectivity.
    pub fn from_records(records: Vec<AnonymizationRecord>) -> Result<Self> {
        let mut mapping = Mapping::new();
        for record in records {
            mapping.insert(record)?;
        }
        Ok(mapping)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[AnonymizationRecord] {
        &self.records
    }

    pub fn lookup(&self, directory: &str, original_name: &str) -> Option<&AnonymizationRecord> {
        self.forward
            .get(&key(directory, original_name))
            .map(|&idx| &self.records[idx])
    }

    pub fn reverse_lookup(
        &self,
        directory: &str,
        anonymized_name: &str,
    ) -> Option<&AnonymizationRecord> {
        self.reverse
            .get(&key(directory, anonymized_name))
            .map(|&idx| &self.records[idx])
    }

    /// Anonymized names already assigned in `directory`.
    pub fn anonymized_names_in<'a>(&'a self, directory: &'a str) -> impl Iterator<Item = &'a str> {
        self.records
            .iter()
            .filter(move |r| r.directory == directory)
            .map(|r| r.anonymized_name.as_str())
    }

    /// Return the mapping with `record` added.
    pub fn append(mut self, record: AnonymizationRecord) -> Result<Self> {
        self.insert(record)?;
        Ok(self)
    }

    /// Remove and return the record for `original_name` in `directory`.
    ///
    /// Use [`Mapping::retain`] to drop many records at once.
    pub fn remove(&mut self, directory: &str, original_name: &str) -> Option<AnonymizationRecord> {
        let idx = self.forward.remove(&key(directory, original_name))?;
        let record = self.records.remove(idx);
        self.reverse
            .remove(&key(&record.directory, &record.anonymized_name));
        for slot in self.forward.values_mut().chain(self.reverse.values_mut()) {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(record)
    }

    /// Keep only the records for which `keep` returns true, preserving order.
    /// Returns the number of records dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&AnonymizationRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|record| keep(record));
        let dropped = before - self.records.len();
        if dropped > 0 {
            self.reindex();
        }
        dropped
    }

    pub(crate) fn insert(&mut self, record: AnonymizationRecord) -> Result<()> {
        let fwd = key(&record.directory, &record.original_name);
        let rev = key(&record.directory, &record.anonymized_name);
        if self.forward.contains_key(&fwd) {
            return Err(Error::conflict(
                record.original_name,
                "original name is already mapped",
            ));
        }
        if self.reverse.contains_key(&rev) {
            return Err(Error::conflict(
                record.anonymized_name,
                "anonymized name is already assigned",
            ));
        }
        let idx = self.records.len();
        self.forward.insert(fwd, idx);
        self.reverse.insert(rev, idx);
        self.records.push(record);
        Ok(())
    }

    fn reindex(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        for (idx, record) in self.records.iter().enumerate() {
            self.forward
                .insert(key(&record.directory, &record.original_name), idx);
            self.reverse
                .insert(key(&record.directory, &record.anonymized_name), idx);
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MappingFile {
    version: u32,
    records: Vec<AnonymizationRecord>,
}

/// Durable home of a [`Mapping`]: a JSON file replaced atomically on commit.
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the mapping file named `file_name` inside `root`.
    pub fn for_root(root: &Path, file_name: &str) -> Self {
        Self::new(root.join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if `file_name` is the mapping file or one of its commit temporaries.
    pub fn is_store_file(file_name: &str, mapping_file: &str) -> bool {
        file_name == mapping_file
            || (file_name.starts_with(&format!("{}.", mapping_file))
                && file_name.ends_with(TEMP_SUFFIX))
    }

    /// Load the mapping. A missing file is an empty mapping, not an error.
    pub fn load(&self) -> Result<Mapping> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No mapping at {}, starting empty", self.path.display());
                return Ok(Mapping::new());
            }
            Err(e) => return Err(Error::persistence(&self.path, e)),
        };

        let file: MappingFile = serde_json::from_slice(&bytes)
            .map_err(|e| Error::persistence(&self.path, io::Error::from(e)))?;

        if file.version != MAPPING_FORMAT_VERSION {
            return Err(Error::persistence(
                &self.path,
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("unsupported mapping version {}", file.version),
                ),
            ));
        }

        let mapping = Mapping::from_records(file.records).map_err(|e| {
            Error::persistence(&self.path, io::Error::new(ErrorKind::InvalidData, e.to_string()))
        })?;
        debug!(
            "Loaded {} mapping records from {}",
            mapping.len(),
            self.path.display()
        );
        Ok(mapping)
    }

    /// Persist the full mapping: write a temporary file beside the target,
    /// fsync it, then rename it over the target.
    pub fn commit(&self, mapping: &Mapping) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_MAPPING_FILE);

        let file = MappingFile {
            version: MAPPING_FORMAT_VERSION,
            records: mapping.records().to_vec(),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{}.", file_name))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)
            .map_err(|e| Error::persistence(&self.path, e))?;

        serde_json::to_writer_pretty(&mut tmp, &file)
            .map_err(|e| Error::persistence(&self.path, io::Error::from(e)))?;
        tmp.write_all(b"\n")
            .and_then(|_| tmp.flush())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::persistence(&self.path, e))?;

        tmp.persist(&self.path)
            .map_err(|e| Error::persistence(&self.path, e.error))?;

        info!(
            "Committed {} mapping records to {}",
            mapping.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namer::HashAlgorithm;
    use tempfile::tempdir;

    fn record(dir: &str, original: &str, anonymized: &str) -> AnonymizationRecord {
        AnonymizationRecord::new(dir, original, anonymized, HashAlgorithm::Sha256)
    }

    #[test]
    fn test_lookup_both_directions() {
        let mapping = Mapping::new()
            .append(record("", "a.txt", "1111.txt"))
            .unwrap()
            .append(record("sub", "a.txt", "2222.txt"))
            .unwrap();

        assert_eq!(mapping.lookup("", "a.txt").unwrap().anonymized_name, "1111.txt");
        assert_eq!(mapping.lookup("sub", "a.txt").unwrap().anonymized_name, "2222.txt");
        assert_eq!(
            mapping.reverse_lookup("sub", "2222.txt").unwrap().original_name,
            "a.txt"
        );
        assert!(mapping.reverse_lookup("", "2222.txt").is_none());
    }

    #[test]
    fn test_append_rejects_duplicates() {
        let mapping = Mapping::new().append(record("", "a.txt", "1111.txt")).unwrap();

        let err = mapping.clone().append(record("", "a.txt", "3333.txt")).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        let err = mapping.append(record("", "b.txt", "1111.txt")).unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[test]
    fn test_same_anonymized_name_in_different_directories() {
        let mapping = Mapping::new()
            .append(record("x", "a.txt", "1111.txt"))
            .unwrap()
            .append(record("y", "b.txt", "1111.txt"));
        assert!(mapping.is_ok());
    }

    #[test]
    fn test_remove_reindexes() {
        let mut mapping = Mapping::from_records(vec![
            record("", "a.txt", "1111.txt"),
            record("", "b.txt", "2222.txt"),
            record("", "c.txt", "3333.txt"),
        ])
        .unwrap();

        let removed = mapping.remove("", "a.txt").unwrap();
        assert_eq!(removed.anonymized_name, "1111.txt");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.lookup("", "c.txt").unwrap().anonymized_name, "3333.txt");
        assert_eq!(mapping.reverse_lookup("", "2222.txt").unwrap().original_name, "b.txt");
        assert!(mapping.remove("", "a.txt").is_none());
    }

    fn numbered(n: usize) -> Mapping {
        Mapping::from_records(
            (0..n)
                .map(|i| record("", &format!("f{}.txt", i), &format!("{:08x}.txt", i)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_retain_drops_many_records_in_one_pass() {
        let mut mapping = numbered(20_000);

        let dropped = mapping.retain(|r| r.original_name.len() % 2 == 0);
        assert!(dropped > 0);
        assert_eq!(mapping.len(), 20_000 - dropped);
        for (i, record) in mapping.records().iter().enumerate() {
            assert_eq!(
                mapping.lookup("", &record.original_name).unwrap(),
                &mapping.records()[i]
            );
            assert_eq!(
                mapping
                    .reverse_lookup("", &record.anonymized_name)
                    .unwrap()
                    .original_name,
                record.original_name
            );
        }
        assert!(mapping.lookup("", "f10.txt").is_none());
        assert!(mapping.lookup("", "f100.txt").is_some());
        assert_eq!(mapping.retain(|_| true), 0);
    }

    #[test]
    fn test_removing_every_record_keeps_index_consistent() {
        let mut mapping = numbered(500);
        for i in (0..500).step_by(2) {
            assert!(mapping.remove("", &format!("f{}.txt", i)).is_some());
        }
        assert_eq!(mapping.len(), 250);
        for i in (1..500).step_by(2) {
            let name = format!("f{}.txt", i);
            let anonymized = format!("{:08x}.txt", i);
            assert_eq!(mapping.lookup("", &name).unwrap().anonymized_name, anonymized);
            assert_eq!(mapping.reverse_lookup("", &anonymized).unwrap().original_name, name);
        }
        for i in (1..500).step_by(2) {
            mapping.remove("", &format!("f{}.txt", i));
        }
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_load_missing_is_empty() {
        let tmp = tempdir().unwrap();
        let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_corrupt_is_persistence_error() {
        let tmp = tempdir().unwrap();
        let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load().unwrap_err(), Error::Persistence { .. }));
    }

    #[test]
    fn test_commit_leaves_no_temp_files() {
        let tmp = tempdir().unwrap();
        let store = MappingStore::for_root(tmp.path(), DEFAULT_MAPPING_FILE);
        let mapping = Mapping::new().append(record("", "a.txt", "1111.txt")).unwrap();
        store.commit(&mapping).unwrap();

        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![DEFAULT_MAPPING_FILE.to_string()]);
    }

    #[test]
    fn test_is_store_file() {
        assert!(MappingStore::is_store_file(".anonymizer-map.json", DEFAULT_MAPPING_FILE));
        assert!(MappingStore::is_store_file(
            ".anonymizer-map.json.Ab12Cd.tmp",
            DEFAULT_MAPPING_FILE
        ));
        assert!(!MappingStore::is_store_file("notes.tmp", DEFAULT_MAPPING_FILE));
    }
}
