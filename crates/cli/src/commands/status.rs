// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! `drover status`: what the persisted run state says.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use dv_core::WorkItemId;
use dv_storage::RunState;

use crate::color;
use crate::env;
use crate::exit_error::ExitError;
use crate::logging;
use crate::output::{indent, print_json, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// Directory holding the state files (default: $DROVER_STATE_DIR, then the current directory)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub state_dir: PathBuf,
    pub completed: usize,
    pub failed: usize,
    pub failed_items: Vec<WorkItemId>,
    pub last_processed: Option<WorkItemId>,
}

/// Flag, then environment, then the working directory.
pub fn state_dir(flag: Option<&Path>, cwd: &Path) -> PathBuf {
    flag.map(Path::to_path_buf).or_else(env::state_dir).unwrap_or_else(|| cwd.to_path_buf())
}

pub fn report(state_dir: &Path) -> Result<StatusReport> {
    let state = RunState::load(state_dir)?;
    Ok(StatusReport {
        state_dir: state_dir.to_path_buf(),
        completed: state.completed.len(),
        failed: state.failed.len(),
        failed_items: state.failed.iter().cloned().collect(),
        last_processed: state.last_processed,
    })
}

pub fn render(report: &StatusReport) -> String {
    let mut out = format!("{} {}\n", color::header("State:"), report.state_dir.display());
    out.push_str(&format!("  completed: {}\n", color::good(&report.completed.to_string())));
    out.push_str(&format!("  failed:    {}\n", color::bad(&report.failed.to_string())));
    match &report.last_processed {
        Some(id) => out.push_str(&format!("  last processed: {id}\n")),
        None => out.push_str("  last processed: -\n"),
    }
    if !report.failed_items.is_empty() {
        out.push_str(&format!("\n{}\n", color::header("Failed items:")));
        let ids: Vec<&str> = report.failed_items.iter().map(WorkItemId::as_str).collect();
        out.push_str(&indent(&ids.join("\n")));
    }
    out
}

pub fn handle(args: StatusArgs, format: OutputFormat) -> Result<()> {
    let _guard = logging::init(None)?;
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let dir = state_dir(args.state_dir.as_deref(), &cwd);
    let report = report(&dir).map_err(|e| ExitError::fatal(format!("{e:#}")))?;

    match format {
        OutputFormat::Text => print!("{}", render(&report)),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
