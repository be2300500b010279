use crate::config::AnonymizerConfig;
use crate::error::{Error, Result};
use crate::model::FileEntry;
use crate::store::{MappingStore, DEFAULT_MAPPING_FILE};
use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub recursive: bool,
    pub ignore_patterns: Vec<String>,
    pub mapping_file: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            ignore_patterns: Vec::new(),
            mapping_file: DEFAULT_MAPPING_FILE.to_string(),
        }
    }
}

impl From<&AnonymizerConfig> for ScanOptions {
    fn from(config: &AnonymizerConfig) -> Self {
        Self {
            recursive: config.recursive,
            ignore_patterns: config.ignore_patterns.clone(),
            mapping_file: config.mapping_file.clone(),
        }
    }
}

/// Canonical absolute form of `root`, which must be an existing directory.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(root).map_err(|e| {
        Error::configuration(format!(
            "directory '{}' does not exist or is not accessible: {}",
            root.display(),
            e
        ))
    })?;
    if !canonical.is_dir() {
        return Err(Error::configuration(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }
    Ok(canonical)
}

fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

fn is_ignored(patterns: &[Pattern], root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    patterns
        .iter()
        .any(|p| p.matches(name) || p.matches_path(relative))
}

/// Collect the regular files under `root`, sorted by path.
///
/// Symlinks, the mapping file and its temporaries, and anything matching an
/// ignore pattern are left out. Unreadable directories are logged and skipped.
pub fn scan_directory(root: &Path, options: &ScanOptions) -> Result<Vec<FileEntry>> {
    let root = resolve_root(root)?;
    let patterns = compile_patterns(&options.ignore_patterns);
    let max_depth = if options.recursive { usize::MAX } else { 1 };

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(&patterns, &root, e.path()));

    let mut entries = Vec::new();
    for item in walker {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                let io_err = io::Error::from(err);
                if io_err.kind() == io::ErrorKind::PermissionDenied {
                    error!("Access denied reading {}: {}", path.display(), io_err);
                    continue;
                }
                return Err(Error::filesystem(path, io_err));
            }
        };

        if !item.file_type().is_file() {
            continue;
        }

        let Some(name) = item.file_name().to_str() else {
            warn!("Skipping non UTF-8 file name {}", item.path().display());
            continue;
        };

        // Subdirectories anonymized as their own root keep their own mapping file.
        if MappingStore::is_store_file(name, &options.mapping_file) {
            continue;
        }

        match FileEntry::from_path(&root, item.path()) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Skipping {}: {}", item.path().display(), e),
        }
    }

    entries.sort_by(|a, b| a.original_path.cmp(&b.original_path));
    debug!("Scanned {} files under {}", entries.len(), root.display());
    Ok(entries)
}
