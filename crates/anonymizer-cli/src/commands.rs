use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "anonymizer")]
#[command(
    about = "Anonymizes file names in a directory using a consistent hashing algorithm",
    long_about = None
)]
pub struct Cli {
    /// Configuration file (default: ./Anonymizer.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file (default: $LOG_FILE_PATH, else console only)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Anonymize the file names in a directory
    Run(RunArgs),
    /// Rename anonymized files back to their original names
    Rollback(RollbackArgs),
    /// Print the mapping recorded for a directory
    ShowMapping(ShowMappingArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// The directory containing the files to anonymize
    pub directory: PathBuf,

    /// Hashing algorithm: sha256, sha1, md5, sha512, blake2, blake3
    #[arg(long)]
    pub algorithm: Option<String>,

    /// Prefix for anonymized file names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Inserted between the prefix and the digest
    #[arg(long)]
    pub separator: Option<String>,

    /// Number of hex digest characters to keep
    #[arg(long)]
    pub digest_length: Option<usize>,

    /// Include files in subdirectories
    #[arg(long)]
    pub recursive: bool,

    /// Glob pattern of paths to leave alone (repeatable)
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore_patterns: Vec<String>,

    /// Perform a dry run without actually renaming any files
    #[arg(long)]
    pub dry_run: bool,

    /// Print the execution report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// The directory whose files should get their names back
    pub directory: PathBuf,

    /// Show what would be restored without renaming anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the execution report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowMappingArgs {
    pub directory: PathBuf,

    /// Print the records as JSON
    #[arg(long)]
    pub json: bool,
}
