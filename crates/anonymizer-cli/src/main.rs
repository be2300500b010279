mod commands;
mod logging;
mod progress;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anonymizer_core::config::{load_configuration, AnonymizerConfig};
use anonymizer_core::{
    AnonymizeEngine, Error, ExecutionReport, HashAlgorithm, ItemStatus, Mapping, ProgressReporter,
    SilentReporter,
};
use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, RunArgs};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{debug, error};

const EXIT_ITEM_FAILURES: u8 = 1;
const EXIT_CONFIGURATION: u8 = 2;
const EXIT_PERSISTENCE: u8 = 3;
const EXIT_OTHER: u8 = 4;

fn main() -> ExitCode {
    dotenv().ok();

    let args = Cli::parse();
    let log_file = args
        .log_file
        .clone()
        .or_else(|| env::var_os("LOG_FILE_PATH").map(PathBuf::from));
    let _guard = logging::init_logger(log_file.as_deref());

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(e) if e.is_configuration() => EXIT_CONFIGURATION,
        Some(e) if e.is_persistence() => EXIT_PERSISTENCE,
        _ => EXIT_OTHER,
    }
}

fn run(args: Cli) -> anyhow::Result<ExitCode> {
    let config = load_configuration(args.config.as_deref()).context("loading configuration")?;
    debug!("Loaded configuration: {:?}", config);

    match args.command {
        Some(Commands::Run(run_args)) => {
            let config = apply_overrides(config, &run_args)?;
            let engine = AnonymizeEngine::new(config);
            let result = with_reporter(run_args.json, |reporter| {
                engine.anonymize(&run_args.directory, reporter)
            });
            finish(result, run_args.json)
        }
        Some(Commands::Rollback(rollback_args)) => {
            let dry_run = rollback_args.dry_run || config.dry_run;
            let engine = AnonymizeEngine::new(config);
            let result = with_reporter(rollback_args.json, |reporter| {
                engine.rollback(&rollback_args.directory, dry_run, reporter)
            });
            finish(result, rollback_args.json)
        }
        Some(Commands::ShowMapping(show_args)) => {
            let mapping = AnonymizeEngine::new(config).mapping(&show_args.directory)?;
            render_mapping(&mapping, show_args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::PrintConfig) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            Cli::command().print_long_help()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Progress bars would interleave with JSON on the terminal, so `--json` runs quietly.
fn with_reporter<T>(
    json: bool,
    f: impl FnOnce(&dyn ProgressReporter) -> Result<T, Error>,
) -> Result<T, Error> {
    if json {
        f(&SilentReporter)
    } else {
        f(&CliReporter::new())
    }
}

fn apply_overrides(mut config: AnonymizerConfig, args: &RunArgs) -> Result<AnonymizerConfig, Error> {
    if let Some(algorithm) = &args.algorithm {
        config.algorithm = algorithm.parse::<HashAlgorithm>()?;
    }
    if let Some(prefix) = &args.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(separator) = &args.separator {
        config.separator = separator.clone();
    }
    if let Some(digest_length) = args.digest_length {
        config.digest_length = digest_length;
    }
    if args.recursive {
        config.recursive = true;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    config
        .ignore_patterns
        .extend(args.ignore_patterns.iter().cloned());
    config.validate()?;
    Ok(config)
}

/// Render the report, including the partial one carried by a failed commit.
fn finish(result: Result<ExecutionReport, Error>, json: bool) -> anyhow::Result<ExitCode> {
    match result {
        Ok(report) => render_report(&report, json),
        Err(err) => {
            if let Some(report) = err.unrecorded_report() {
                render_report(report, json)?;
            }
            Err(err.into())
        }
    }
}

fn render_report(report: &ExecutionReport, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for item in &report.items {
            let target = item.anonymized_name.as_deref().unwrap_or("-");
            match &item.status {
                ItemStatus::Renamed => {
                    println!("{} {} -> {}", "renamed".green(), item.original_name, target)
                }
                ItemStatus::Planned => {
                    println!("{} {} -> {}", "would rename".cyan(), item.original_name, target)
                }
                ItemStatus::Failed { error } => println!(
                    "{} {} -> {}: {}",
                    "failed".red(),
                    item.original_name,
                    target,
                    error
                ),
                ItemStatus::Skipped { error } => {
                    println!("{} {}: {}", "skipped".yellow(), item.original_name, error)
                }
            }
        }

        println!(
            "{}{} planned, {} succeeded, {} failed, {} skipped{}",
            if report.dry_run { "[Dry Run] " } else { "" },
            format!("{}", report.planned).cyan(),
            format!("{}", report.succeeded).green(),
            format!("{}", report.failed).red(),
            format!("{}", report.skipped).yellow(),
            if report.committed { ", mapping saved" } else { "" },
        );
    }

    if report.has_failures() {
        Ok(ExitCode::from(EXIT_ITEM_FAILURES))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn render_mapping(mapping: &Mapping, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(mapping.records())?);
        return Ok(());
    }

    if mapping.is_empty() {
        println!("No mapping recorded");
        return Ok(());
    }

    for record in mapping.records() {
        let original = if record.directory.is_empty() {
            record.original_name.clone()
        } else {
            format!("{}/{}", record.directory, record.original_name)
        };
        println!(
            "{} -> {} ({}, {})",
            original,
            record.anonymized_name.green(),
            record.algorithm,
            record.created_at.to_rfc3339()
        );
    }
    println!("{} records", format!("{}", mapping.len()).cyan());
    Ok(())
}
