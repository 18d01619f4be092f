// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! `drover run`: process an input list with the external tool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use dv_core::{
    load_work_items, ArtifactLayout, Backoff, CommandTemplate, ConfigFile, InputFormat,
    ResumeConflict, RunConfig, RunDirs,
};
use dv_engine::{CommandInvoker, Orchestrator};

use crate::color;
use crate::env;
use crate::exit_error::{ExitError, ITEMS_FAILED};
use crate::logging;
use crate::output::{print_json, OutputFormat};

/// Arguments passed to the tool when neither the config file nor
/// `--arg` supplies any.
pub const DEFAULT_ARGS: [&str; 2] = ["${item}", "${output}"];

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Delimited file listing work item ids
    #[arg(long, short)]
    pub input: PathBuf,

    /// External analysis tool to run per item
    #[arg(long)]
    pub program: Option<String>,

    /// Argument template for the tool (repeatable, supports ${item}, ${output}, ...)
    #[arg(long = "arg", value_name = "TEMPLATE", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// TOML config file with [run] and [dirs] tables
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Concurrent workers (default: available parallelism)
    #[arg(long, short = 'w')]
    pub max_workers: Option<usize>,

    /// Per-item timeout in seconds (default: 1620)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra passes over items that failed
    #[arg(long)]
    pub retries: Option<u32>,

    /// Delay growth between retry passes
    #[arg(long, value_enum)]
    pub retry_backoff: Option<BackoffArg>,

    /// Base delay before a retry pass, in milliseconds
    #[arg(long, value_name = "MS")]
    pub retry_backoff_ms: Option<u64>,

    /// Skip completed items and retry failed ones
    #[arg(long)]
    pub auto_resume: bool,

    /// Skip items that failed in an earlier run
    #[arg(long)]
    pub skip_failed: bool,

    /// Run exactly the previously failed items, ignoring the input order
    #[arg(long)]
    pub resume_failed: bool,

    /// What failed items do when both --auto-resume and --skip-failed are set
    #[arg(long, value_enum)]
    pub on_resume_conflict: Option<ConflictArg>,

    /// Forget completed and failed items before starting
    #[arg(long)]
    pub fresh: bool,

    /// Print the planned commands without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Append rows to one artifact per worker instead of one per item
    #[arg(long)]
    pub single_csv_per_worker: bool,

    /// Merge artifacts of completed items into results_all.csv
    #[arg(long)]
    pub consolidate: bool,

    /// Field delimiter of the input list (default: ',')
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Header name of the id column in the input list
    #[arg(long)]
    pub id_column: Option<String>,

    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Directory for results_all.csv (default: the results directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub logs_dir: Option<PathBuf>,

    /// Scratch space for individual attempts
    #[arg(long)]
    pub tmp_dir: Option<PathBuf>,

    /// Directory holding completed.txt, failed.txt and last_processed.txt
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackoffArg {
    Fixed,
    Exponential,
}

impl From<BackoffArg> for Backoff {
    fn from(arg: BackoffArg) -> Self {
        match arg {
            BackoffArg::Fixed => Backoff::Fixed,
            BackoffArg::Exponential => Backoff::Exponential,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConflictArg {
    Retry,
    Skip,
}

impl From<ConflictArg> for ResumeConflict {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Retry => ResumeConflict::Retry,
            ConflictArg::Skip => ResumeConflict::Skip,
        }
    }
}

/// Merge defaults, config file, environment, and flags into a validated
/// run configuration. Relative default directories hang off `cwd`.
pub fn resolve(args: &RunArgs, cwd: &Path) -> Result<(RunConfig, InputFormat)> {
    let mut config = RunConfig::new(CommandTemplate::default(), RunDirs::under(cwd));

    if let Some(path) = &args.config {
        let file = ConfigFile::load(path)?;
        config.apply_file(&file);
    }

    if let Some(dir) = env::state_dir() {
        config.dirs.state = dir;
    }
    if let Some(timeout) = env::timeout() {
        config.timeout = timeout;
    }
    if let Some(workers) = env::max_workers() {
        config.max_workers = workers;
    }

    if let Some(program) = &args.program {
        config.command.program = program.clone();
    }
    if !args.args.is_empty() {
        config.command.args = args.args.clone();
    }
    if config.command.args.is_empty() {
        config.command.args = DEFAULT_ARGS.iter().map(|s| s.to_string()).collect();
    }
    if let Some(workers) = args.max_workers {
        config.max_workers = workers;
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = args.retries {
        config.retry.retries = retries;
    }
    if let Some(backoff) = args.retry_backoff {
        config.retry.backoff = backoff.into();
    }
    if let Some(ms) = args.retry_backoff_ms {
        config.retry.base_delay = Duration::from_millis(ms);
    }

    let resume = &mut config.resume;
    resume.auto_resume |= args.auto_resume;
    resume.skip_failed |= args.skip_failed;
    resume.resume_failed |= args.resume_failed;
    resume.fresh |= args.fresh;
    if let Some(conflict) = args.on_resume_conflict {
        resume.conflict = conflict.into();
    }

    config.dry_run = args.dry_run;
    if args.single_csv_per_worker {
        config.layout = ArtifactLayout::PerWorker;
    }
    config.consolidate |= args.consolidate;

    let dirs = &mut config.dirs;
    for (flag, slot) in [
        (&args.results_dir, &mut dirs.results),
        (&args.output_dir, &mut dirs.output),
        (&args.logs_dir, &mut dirs.logs),
        (&args.tmp_dir, &mut dirs.tmp),
        (&args.state_dir, &mut dirs.state),
    ] {
        if let Some(path) = flag {
            *slot = path.clone();
        }
    }

    config.validate()?;

    let mut format = InputFormat::default();
    if let Some(delimiter) = args.delimiter {
        if !delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got {delimiter:?}");
        }
        format = format.delimiter(delimiter as u8);
    }
    if let Some(column) = &args.id_column {
        format = format.id_column(column.clone());
    }

    Ok((config, format))
}

pub async fn handle(args: RunArgs, format: OutputFormat) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let (config, input_format) =
        resolve(&args, &cwd).map_err(|e| ExitError::fatal(format!("{e:#}")))?;

    // Dry runs leave the file system untouched, including the log directory.
    let log_dir = (!config.dry_run).then_some(config.dirs.logs.as_path());
    let _guard = logging::init(log_dir)?;

    let items = load_work_items(&args.input, &input_format)
        .map_err(|e| ExitError::fatal(e.to_string()))?;
    info!(
        input = %args.input.display(),
        items = items.len(),
        workers = config.max_workers,
        timeout_secs = config.timeout.as_secs(),
        layout = %config.layout,
        "loaded work items"
    );

    let orchestrator = Orchestrator::new(config, CommandInvoker);
    let summary = orchestrator.run(&items).await.map_err(|e| ExitError::fatal(e.to_string()))?;

    match format {
        OutputFormat::Text => {
            let text = summary.to_string();
            if summary.failed.is_empty() {
                print!("{text}");
            } else {
                for line in text.lines() {
                    if line.starts_with("failed:") {
                        println!("{}", color::bad(line));
                    } else {
                        println!("{line}");
                    }
                }
            }
        }
        OutputFormat::Json => print_json(&summary)?,
    }

    if summary.exit_code() != 0 {
        return Err(ExitError::new(
            ITEMS_FAILED,
            format!("{} of {} items failed", summary.failed.len(), summary.queued),
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
