/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif progress bars; tests use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _root: &str) {}
    fn on_scan_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_plan_complete(&self, _operations: usize, _skipped: usize) {}
    fn on_execute_start(&self, _total: usize, _dry_run: bool) {}
    fn on_execute_progress(&self, _done: usize, _total: usize, _current: &str) {}
    fn on_execute_complete(&self, _succeeded: usize, _failed: usize, _duration_secs: f64) {}
    fn on_commit_complete(&self, _records: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
