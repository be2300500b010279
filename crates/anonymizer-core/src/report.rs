use crate::error::Error;
use crate::planner::PlanKind;
use serde::Serialize;
use std::path::PathBuf;

/// Per-item failure captured into a report instead of aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemError {
    #[error("{message}")]
    Conflict { message: String },
    #[error("{message}")]
    Filesystem { message: String },
}

impl From<&Error> for ItemError {
    fn from(err: &Error) -> Self {
        match err {
            Error::Conflict { .. } => ItemError::Conflict {
                message: err.to_string(),
            },
            _ => ItemError::Filesystem {
                message: err.to_string(),
            },
        }
    }
}

impl From<Error> for ItemError {
    fn from(err: Error) -> Self {
        ItemError::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Renamed on disk.
    Renamed,
    /// Dry run: the rename would be attempted.
    Planned,
    Failed { error: ItemError },
    Skipped { error: ItemError },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub original_name: String,
    pub anonymized_name: Option<String>,
    #[serde(flatten)]
    pub status: ItemStatus,
}

/// Outcome of executing one plan. Structured data only; rendering is up to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub kind: PlanKind,
    pub dry_run: bool,
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Whether the mapping file was rewritten.
    pub committed: bool,
    pub items: Vec<ItemReport>,
}

impl ExecutionReport {
    pub fn new(kind: PlanKind, dry_run: bool) -> Self {
        Self {
            kind,
            dry_run,
            planned: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            committed: false,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: ItemReport) {
        match item.status {
            ItemStatus::Renamed => self.succeeded += 1,
            ItemStatus::Planned => {}
            ItemStatus::Failed { .. } => self.failed += 1,
            ItemStatus::Skipped { .. } => self.skipped += 1,
        }
        self.items.push(item);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|i| matches!(i.status, ItemStatus::Failed { .. }))
    }
}
