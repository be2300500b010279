pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod model;
pub mod namer;
pub mod planner;
pub mod progress;
pub mod report;
pub mod resolver;
pub mod scanner;
pub mod store;

pub use config::AnonymizerConfig;
pub use engine::AnonymizeEngine;
pub use error::Error;
pub use model::{AnonymizationRecord, FileEntry};
pub use namer::HashAlgorithm;
pub use planner::{Plan, PlanKind, RenameOperation};
pub use progress::{ProgressReporter, SilentReporter};
pub use report::{ExecutionReport, ItemError, ItemReport, ItemStatus};
pub use store::{Mapping, MappingStore};
