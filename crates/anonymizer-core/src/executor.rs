use crate::error::{Error, Result};
use crate::planner::{Plan, PlanKind, RenameOperation};
use crate::progress::ProgressReporter;
use crate::report::{ExecutionReport, ItemError, ItemReport, ItemStatus};
use crate::store::{Mapping, MappingStore};
use std::collections::HashSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Source must exist and destination must be free. `fs::rename` silently
/// replaces an existing destination on Unix, so this is checked up front.
fn check(op: &RenameOperation) -> Result<()> {
    fs::symlink_metadata(&op.source_path).map_err(|e| Error::filesystem(&op.source_path, e))?;

    match fs::symlink_metadata(&op.dest_path) {
        Ok(_) => Err(Error::filesystem(
            &op.dest_path,
            io::Error::new(ErrorKind::AlreadyExists, "destination already exists"),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::filesystem(&op.dest_path, e)),
    }
}

/// Restored records are collected and dropped from the mapping in one pass
/// after the batch.
fn record_success(
    kind: PlanKind,
    op: &RenameOperation,
    mapping: &mut Mapping,
    restored: &mut HashSet<(String, String)>,
) {
    match kind {
        PlanKind::Anonymize if op.new_record => {
            if let Err(e) = mapping.insert(op.record.clone()) {
                warn!("Renamed '{}' but could not record it: {}", op.source_path.display(), e);
            }
        }
        PlanKind::Anonymize => {}
        PlanKind::Restore => {
            restored.insert((op.record.directory.clone(), op.record.original_name.clone()));
        }
    }
}

/// Apply (or, for dry-run plans, validate) every operation in `plan`.
///
/// Per-item failures are collected into the report and the batch continues.
/// When at least one rename succeeded the mapping is committed with only the
/// operations that actually happened. A commit failure is returned as
/// [`Error::CommitFailed`] carrying the report, and renamed files are left in place.
pub fn execute(
    plan: Plan,
    store: &MappingStore,
    reporter: &dyn ProgressReporter,
) -> Result<ExecutionReport> {
    let (kind, dry_run, operations, skipped, baseline) = plan.into_parts();
    let total = operations.len();
    let mut report = ExecutionReport::new(kind, dry_run);
    report.planned = total;

    for entry in skipped {
        report.push(ItemReport {
            source: entry.path,
            destination: None,
            original_name: entry.original_name,
            anonymized_name: None,
            status: ItemStatus::Skipped { error: entry.error },
        });
    }

    let start = Instant::now();
    reporter.on_execute_start(total, dry_run);
    let mut mapping = baseline;
    let mut restored = HashSet::new();

    for (done, op) in operations.into_iter().enumerate() {
        let from = op.source_path.display().to_string();
        let to = op.dest_path.display().to_string();

        let status = match check(&op) {
            Err(e) => {
                error!("Cannot rename '{}' to '{}': {}", from, to, e);
                ItemStatus::Failed {
                    error: ItemError::from(e),
                }
            }
            Ok(()) if dry_run => {
                info!("[Dry Run] Renaming '{}' to '{}'", from, to);
                ItemStatus::Planned
            }
            Ok(()) => match fs::rename(&op.source_path, &op.dest_path) {
                Ok(()) => {
                    info!("Renamed '{}' to '{}'", from, to);
                    record_success(kind, &op, &mut mapping, &mut restored);
                    ItemStatus::Renamed
                }
                Err(e) => {
                    let e = Error::filesystem(&op.source_path, e);
                    error!("Error renaming '{}' to '{}': {}", from, to, e);
                    ItemStatus::Failed {
                        error: ItemError::from(e),
                    }
                }
            },
        };

        reporter.on_execute_progress(done + 1, total, &from);
        report.push(ItemReport {
            source: op.source_path,
            destination: Some(op.dest_path),
            original_name: op.record.original_name,
            anonymized_name: Some(op.record.anonymized_name),
            status,
        });
    }

    reporter.on_execute_complete(report.succeeded, report.failed, start.elapsed().as_secs_f64());
    debug!(
        "Execution finished: {} planned, {} succeeded, {} failed, {} skipped",
        report.planned, report.succeeded, report.failed, report.skipped
    );

    if !restored.is_empty() {
        let dropped = mapping.retain(|r| {
            !restored.contains(&(r.directory.clone(), r.original_name.clone()))
        });
        debug!("Dropped {} restored records from the mapping", dropped);
    }

    if !dry_run && report.succeeded > 0 {
        if let Err(e) = store.commit(&mapping) {
            for item in report
                .items
                .iter()
                .filter(|i| i.status == ItemStatus::Renamed)
            {
                error!(
                    "Unrecorded rename: '{}' -> '{}'",
                    item.source.display(),
                    item.destination
                        .as_ref()
                        .map(|d| d.display().to_string())
                        .unwrap_or_default()
                );
            }
            return Err(Error::commit_failed(report, e));
        }
        report.committed = true;
        reporter.on_commit_complete(mapping.len());
    }

    Ok(report)
}
