use crate::config::AnonymizerConfig;
use crate::error::Result;
use crate::executor;
use crate::planner;
use crate::progress::ProgressReporter;
use crate::report::ExecutionReport;
use crate::scanner::{self, ScanOptions};
use crate::store::{Mapping, MappingStore};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Wires scan -> load -> plan -> execute for one root directory.
pub struct AnonymizeEngine {
    config: AnonymizerConfig,
}

impl AnonymizeEngine {
    pub fn new(config: AnonymizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnonymizerConfig {
        &self.config
    }

    pub fn store_for(&self, root: &Path) -> MappingStore {
        MappingStore::for_root(root, &self.config.mapping_file)
    }

    /// Anonymize every file under `root`:
    /// 1. Validate configuration (nothing is touched on failure)
    /// 2. Scan the directory
    /// 3. Load the mapping and plan the renames
    /// 4. Execute, committing the mapping for what actually happened
    pub fn anonymize(
        &self,
        root: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionReport> {
        self.config.validate()?;
        let root = scanner::resolve_root(root)?;
        info!("Anonymizing files in {}", root.display());

        reporter.on_scan_start(&root.display().to_string());
        let scan_start = Instant::now();
        let entries = scanner::scan_directory(&root, &ScanOptions::from(&self.config))?;
        reporter.on_scan_complete(entries.len(), scan_start.elapsed().as_secs_f64());

        let store = self.store_for(&root);
        let mapping = store.load()?;
        debug!("Mapping has {} existing records", mapping.len());

        // The executor rebuilds the mapping from the plan's baseline and the
        // renames that succeed, so the planner's projected mapping is not needed.
        let (plan, _projected) = planner::plan(&entries, &self.config, mapping)?;
        reporter.on_plan_complete(plan.total(), plan.skipped().len());

        executor::execute(plan, &store, reporter)
    }

    /// Rename every mapped file under `root` back to its original name.
    pub fn rollback(
        &self,
        root: &Path,
        dry_run: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionReport> {
        self.config.validate()?;
        let root = scanner::resolve_root(root)?;
        info!("Restoring original names in {}", root.display());

        let store = self.store_for(&root);
        let mapping = store.load()?;
        let plan = planner::plan_rollback(&root, mapping, dry_run);
        reporter.on_plan_complete(plan.total(), 0);

        executor::execute(plan, &store, reporter)
    }

    /// Current mapping for `root`.
    pub fn mapping(&self, root: &Path) -> Result<Mapping> {
        let root = scanner::resolve_root(root)?;
        self.store_for(&root).load()
    }
}
