// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! `drover consolidate`: merge artifacts without running the tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use dv_storage::{consolidate, ConsolidationReport, RunState};

use crate::exit_error::ExitError;
use crate::logging;
use crate::output::{print_json, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct ConsolidateArgs {
    /// Directory of per-item or per-worker artifacts (default: ./results)
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Directory for results_all.csv (default: the results directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory holding the state files (default: $DROVER_STATE_DIR, then the current directory)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

/// Consolidate the artifacts of every completed item.
pub fn execute(args: &ConsolidateArgs, cwd: &Path) -> Result<ConsolidationReport> {
    let results_dir = args.results_dir.clone().unwrap_or_else(|| cwd.join("results"));
    let output_dir = args.output_dir.clone().unwrap_or_else(|| results_dir.clone());
    let state_dir = super::status::state_dir(args.state_dir.as_deref(), cwd);

    let state = RunState::load(&state_dir)?;
    if state.completed.is_empty() {
        warn!(state_dir = %state_dir.display(), "no completed items recorded");
    }
    let report = consolidate(&results_dir, &output_dir, &state)?;
    info!(
        path = %report.path.display(),
        files = report.files,
        items = report.items,
        rows = report.rows,
        "consolidated results"
    );
    Ok(report)
}

pub fn render(report: &ConsolidationReport) -> String {
    let mut out = format!(
        "consolidated {} items ({} rows) from {} files into {}\n",
        report.items,
        report.rows,
        report.files,
        report.path.display()
    );
    if report.skipped_files > 0 {
        out.push_str(&format!("skipped {} unreadable files\n", report.skipped_files));
    }
    out
}

pub fn handle(args: ConsolidateArgs, format: OutputFormat) -> Result<()> {
    let _guard = logging::init(None)?;
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let report = execute(&args, &cwd).map_err(|e| ExitError::fatal(format!("{e:#}")))?;

    match format {
        OutputFormat::Text => print!("{}", render(&report)),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "consolidate_tests.rs"]
mod tests;
