// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Append-only logger for per-worker activity logs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use dv_core::{format_utc_now, WorkItemId};

/// Path of a worker's log: `<log_dir>/worker-<NN>.log`.
pub fn worker_log_path(log_dir: &Path, worker: usize) -> PathBuf {
    log_dir.join(format!("worker-{worker:02}.log"))
}

/// Append-only logger for per-worker activity logs.
///
/// Each `append()` call opens, writes, and closes the file. Workers only
/// write to their own file, once or twice per attempt.
#[derive(Debug, Clone)]
pub struct WorkerLogger {
    log_dir: PathBuf,
}

impl WorkerLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    /// Append a log line for the given worker.
    ///
    /// Format: `2026-01-30T08:14:09Z [item] message`
    ///
    /// Failures are logged via tracing but do not propagate; logging
    /// must not break the run.
    pub fn append(&self, worker: usize, item: &WorkItemId, message: &str) {
        let path = worker_log_path(&self.log_dir, worker);
        if let Err(e) = write_line(&path, item, message) {
            tracing::warn!(worker, error = %e, "failed to write worker log");
        }
    }

    /// Append a fenced block (tool stdout/stderr). Empty content is skipped.
    ///
    /// Format:
    /// ```text
    /// {timestamp} [{item}] ```{label}
    /// {content}
    /// {timestamp} [{item}] ```
    /// ```
    pub fn append_fenced(&self, worker: usize, item: &WorkItemId, label: &str, content: &str) {
        if content.trim().is_empty() {
            return;
        }
        let path = worker_log_path(&self.log_dir, worker);
        if let Err(e) = write_fenced(&path, item, label, content) {
            tracing::warn!(worker, error = %e, "failed to write worker log");
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn write_line(path: &Path, item: &WorkItemId, message: &str) -> std::io::Result<()> {
    let mut file = open_append(path)?;
    writeln!(file, "{} [{}] {}", format_utc_now(), item, message)
}

fn write_fenced(path: &Path, item: &WorkItemId, label: &str, content: &str) -> std::io::Result<()> {
    let mut buf = String::new();
    buf.push_str(&format!("{} [{}] ```{}\n", format_utc_now(), item, label));
    buf.push_str(content);
    if !content.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str(&format!("{} [{}] ```\n", format_utc_now(), item));
    open_append(path)?.write_all(buf.as_bytes())
}

#[cfg(test)]
#[path = "worker_logger_tests.rs"]
mod tests;
