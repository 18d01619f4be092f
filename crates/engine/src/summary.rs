// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! End-of-run summary.

use std::fmt;

use dv_core::{format_duration, WorkItemId};
use dv_storage::ConsolidationReport;
use serde::Serialize;

/// What a run did, for the closing report and `--format json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub dry_run: bool,
    /// Ids in the input list (before filtering).
    pub input: usize,
    /// Ids in the effective queue.
    pub queued: usize,
    pub succeeded: Vec<WorkItemId>,
    /// Ids whose last attempt in this run failed.
    pub failed: Vec<WorkItemId>,
    pub skipped_completed: usize,
    pub skipped_failed: usize,
    pub duplicates: usize,
    /// Total attempts across all passes.
    pub attempts: u32,
    pub passes: u32,
    /// Rendered command lines (dry runs only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidation: Option<ConsolidationReport>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.skipped_completed + self.skipped_failed
    }

    /// `0` when nothing failed, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(
                f,
                "dry run: {} of {} items would run ({} skipped)",
                self.queued,
                self.input,
                self.skipped()
            )?;
            for line in &self.planned {
                writeln!(f, "  {line}")?;
            }
            return Ok(());
        }

        if self.queued == 0 {
            writeln!(f, "nothing to do ({} skipped)", self.skipped())?;
        } else {
            let elapsed = format_duration(std::time::Duration::from_millis(self.elapsed_ms));
            writeln!(
                f,
                "processed {} items in {}: {} succeeded, {} failed, {} skipped",
                self.queued,
                elapsed,
                self.succeeded.len(),
                self.failed.len(),
                self.skipped()
            )?;
        }
        if self.passes > 1 {
            writeln!(f, "attempts: {} over {} passes", self.attempts, self.passes)?;
        }
        if !self.failed.is_empty() {
            let ids: Vec<&str> = self.failed.iter().map(WorkItemId::as_str).collect();
            writeln!(f, "failed: {}", ids.join(", "))?;
        }
        if let Some(report) = &self.consolidation {
            writeln!(f, "consolidated: {} ({} rows)", report.path.display(), report.rows)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
