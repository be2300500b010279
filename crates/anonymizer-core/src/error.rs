use crate::report::ExecutionReport;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Conflict on '{name}': {reason}")]
    Conflict { name: String, reason: String },

    #[error("Mapping store error at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renames happened but the mapping could not be saved. `report` lists
    /// what was done on disk.
    #[error("{} renames were not recorded: {source}", .report.succeeded)]
    CommitFailed {
        report: Box<ExecutionReport>,
        #[source]
        source: Box<Error>,
    },

    #[error("Filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn conflict(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Conflict {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }

    pub fn commit_failed(report: ExecutionReport, source: Error) -> Self {
        Error::CommitFailed {
            report: Box::new(report),
            source: Box::new(source),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True for errors that abort a run before any file is touched.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::Config(_))
    }

    /// True for mapping load or commit failures.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence { .. } | Error::CommitFailed { .. })
    }

    /// Report of the renames done before a failed commit.
    pub fn unrecorded_report(&self) -> Option<&ExecutionReport> {
        match self {
            Error::CommitFailed { report, .. } => Some(&**report),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
