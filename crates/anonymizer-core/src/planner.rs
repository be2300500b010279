use crate::config::AnonymizerConfig;
use crate::error::{Error, Result};
use crate::model::{AnonymizationRecord, FileEntry};
use crate::namer;
use crate::report::ItemError;
use crate::resolver;
use crate::store::Mapping;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// original -> anonymized
    Anonymize,
    /// anonymized -> original
    Restore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOperation {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub record: AnonymizationRecord,
    /// Created by this plan rather than reused from the mapping.
    pub new_record: bool,
}

/// An entry the planner refused to rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub original_name: String,
    pub error: ItemError,
}

/// Ordered rename operations plus the mapping they were planned against.
/// Consumed by [`crate::executor::execute`].
#[derive(Debug)]
pub struct Plan {
    kind: PlanKind,
    dry_run: bool,
    operations: Vec<RenameOperation>,
    skipped: Vec<SkippedEntry>,
    baseline: Mapping,
}

impl Plan {
    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn operations(&self) -> &[RenameOperation] {
        &self.operations
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn total(&self) -> usize {
        self.operations.len()
    }

    /// Operations that add a record to the mapping.
    pub fn new_records(&self) -> usize {
        self.operations.iter().filter(|op| op.new_record).count()
    }

    pub fn baseline(&self) -> &Mapping {
        &self.baseline
    }

    pub(crate) fn into_parts(
        self,
    ) -> (PlanKind, bool, Vec<RenameOperation>, Vec<SkippedEntry>, Mapping) {
        (
            self.kind,
            self.dry_run,
            self.operations,
            self.skipped,
            self.baseline,
        )
    }
}

fn skip(entry: &FileEntry, err: Error) -> SkippedEntry {
    warn!("Skipping '{}': {}", entry.original_path.display(), err);
    SkippedEntry {
        path: entry.original_path.clone(),
        original_name: entry.original_name.clone(),
        error: ItemError::from(err),
    }
}

fn sibling(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Build the rename plan for `entries`, in the order given.
///
/// Returns the plan and the mapping as it will look if every operation
/// succeeds. Nothing on disk is touched.
pub fn plan(
    entries: &[FileEntry],
    config: &AnonymizerConfig,
    mapping: Mapping,
) -> Result<(Plan, Mapping)> {
    config.validate()?;
    let options = config.naming_options();
    let baseline = mapping.clone();
    let mut mapping = mapping;

    // Names currently on disk per directory, and every name that is spoken for.
    let mut present: HashMap<&str, HashSet<&str>> = HashMap::new();
    for entry in entries {
        present
            .entry(entry.directory.as_str())
            .or_default()
            .insert(entry.original_name.as_str());
    }
    let mut taken: HashMap<String, HashSet<String>> = HashMap::new();
    for (directory, names) in &present {
        let set = taken.entry(directory.to_string()).or_default();
        set.extend(mapping.anonymized_names_in(directory).map(String::from));
        set.extend(names.iter().map(|n| n.to_string()));
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut operations = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for entry in entries {
        let directory = entry.directory.as_str();
        let name = entry.original_name.as_str();

        if let Some(existing) = mapping.reverse_lookup(directory, name) {
            skipped.push(skip(
                entry,
                Error::conflict(
                    name,
                    format!("already anonymized from '{}'", existing.original_name),
                ),
            ));
            continue;
        }

        if !seen.insert((directory, name)) {
            skipped.push(skip(entry, Error::conflict(name, "duplicate entry in batch")));
            continue;
        }

        let (record, new_record) = match mapping.lookup(directory, name) {
            Some(existing) => {
                let occupied = present
                    .get(directory)
                    .is_some_and(|names| names.contains(existing.anonymized_name.as_str()));
                if occupied {
                    skipped.push(skip(
                        entry,
                        Error::conflict(
                            name,
                            format!(
                                "mapped name '{}' is occupied by another file",
                                existing.anonymized_name
                            ),
                        ),
                    ));
                    continue;
                }
                debug!("Reusing '{}' -> '{}'", name, existing.anonymized_name);
                (existing.clone(), false)
            }
            None => {
                let candidate = namer::derive(name, config.algorithm, &config.prefix, &options)?;
                let names = taken.entry(directory.to_string()).or_default();
                let resolved = resolver::resolve(&candidate, &entry.extension, names);
                names.insert(resolved.clone());

                let record =
                    AnonymizationRecord::new(directory, name, resolved, config.algorithm);
                if let Err(err) = mapping.insert(record.clone()) {
                    skipped.push(skip(entry, err));
                    continue;
                }
                debug!("Derived '{}' -> '{}'", name, record.anonymized_name);
                (record, true)
            }
        };

        operations.push(RenameOperation {
            source_path: entry.original_path.clone(),
            dest_path: sibling(&entry.original_path, &record.anonymized_name),
            record,
            new_record,
        });
    }

    info!(
        "Planned {} renames ({} new mapping records), {} skipped",
        operations.len(),
        operations.iter().filter(|op| op.new_record).count(),
        skipped.len()
    );

    let plan = Plan {
        kind: PlanKind::Anonymize,
        dry_run: config.dry_run,
        operations,
        skipped,
        baseline,
    };
    Ok((plan, mapping))
}

/// Build the plan that renames every mapped file under `root` back to its
/// original name, in mapping order.
pub fn plan_rollback(root: &Path, mapping: Mapping, dry_run: bool) -> Plan {
    let operations: Vec<RenameOperation> = mapping
        .records()
        .iter()
        .map(|record| RenameOperation {
            source_path: record.anonymized_path(root),
            dest_path: record.original_path(root),
            record: record.clone(),
            new_record: false,
        })
        .collect();

    info!("Planned {} restores under {}", operations.len(), root.display());

    Plan {
        kind: PlanKind::Restore,
        dry_run,
        operations,
        skipped: Vec::new(),
        baseline: mapping,
    }
}
