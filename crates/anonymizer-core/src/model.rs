use crate::error::{Error, Result};
use crate::namer::{split_extension, HashAlgorithm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A file offered to the planner, captured once by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub original_path: PathBuf,
    pub original_name: String,
    /// Extension with its leading dot, or empty.
    pub extension: String,
    /// Parent directory relative to the scanned root, `/`-joined. Empty for the root.
    pub directory: String,
}

impl FileEntry {
    /// Build an entry for `path`, which must be an absolute path under `root`.
    pub fn from_path(root: &Path, path: &Path) -> Result<Self> {
        if !path.is_absolute() {
            return Err(Error::configuration(format!(
                "'{}' is not an absolute path",
                path.display()
            )));
        }

        let original_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "'{}' has no UTF-8 file name",
                    path.display()
                ))
            })?
            .to_string();

        let parent = path.parent().unwrap_or(root);
        let relative = parent.strip_prefix(root).map_err(|_| {
            Error::configuration(format!(
                "'{}' is outside of '{}'",
                path.display(),
                root.display()
            ))
        })?;
        let directory = relative_key(relative).ok_or_else(|| {
            Error::configuration(format!(
                "'{}' has a non UTF-8 directory component",
                path.display()
            ))
        })?;

        let (_, extension) = split_extension(&original_name);
        let extension = extension.to_string();

        Ok(FileEntry {
            original_path: path.to_path_buf(),
            original_name,
            extension,
            directory,
        })
    }
}

/// `/`-joined form of a relative directory, used as the mapping's directory key.
pub fn relative_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Inverse of [`relative_key`]: resolve a directory key against `root`.
pub fn directory_path(root: &Path, directory: &str) -> PathBuf {
    directory
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// One original -> anonymized name assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizationRecord {
    #[serde(default)]
    pub directory: String,
    pub original_name: String,
    pub anonymized_name: String,
    pub algorithm: HashAlgorithm,
    pub created_at: DateTime<Utc>,
}

impl AnonymizationRecord {
    pub fn new(
        directory: impl Into<String>,
        original_name: impl Into<String>,
        anonymized_name: impl Into<String>,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            directory: directory.into(),
            original_name: original_name.into(),
            anonymized_name: anonymized_name.into(),
            algorithm,
            created_at: Utc::now(),
        }
    }

    pub fn original_path(&self, root: &Path) -> PathBuf {
        directory_path(root, &self.directory).join(&self.original_name)
    }

    pub fn anonymized_path(&self, root: &Path) -> PathBuf {
        directory_path(root, &self.directory).join(&self.anonymized_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_from_nested_path() {
        let root = Path::new("/data/root");
        let entry = FileEntry::from_path(root, Path::new("/data/root/a/b/report.pdf")).unwrap();
        assert_eq!(entry.original_name, "report.pdf");
        assert_eq!(entry.extension, ".pdf");
        assert_eq!(entry.directory, "a/b");
        assert_eq!(directory_path(root, &entry.directory), Path::new("/data/root/a/b"));
    }

    #[test]
    fn test_entry_at_root_has_empty_directory() {
        let root = Path::new("/data/root");
        let entry = FileEntry::from_path(root, Path::new("/data/root/.env")).unwrap();
        assert_eq!(entry.directory, "");
        assert_eq!(entry.extension, "");
    }

    #[test]
    fn test_entry_outside_root_is_rejected() {
        let root = Path::new("/data/root");
        assert!(FileEntry::from_path(root, Path::new("/elsewhere/x.txt")).is_err());
        assert!(FileEntry::from_path(root, Path::new("relative.txt")).is_err());
    }
}
