// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Run configuration: options, directories, and the optional TOML file layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::retry::{Backoff, RetryPolicy};
use crate::template::CommandTemplate;

/// Default per-item timeout (27 minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(27 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which failed ids win when both `auto-resume` and `skip-failed` are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeConflict {
    /// Auto-resume re-queues failed ids.
    #[default]
    Retry,
    /// Skip-failed drops failed ids.
    Skip,
}

crate::simple_display! {
    ResumeConflict {
        Retry => "retry",
        Skip => "skip",
    }
}

/// Queue filtering options applied against the persisted run state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeOptions {
    /// Skip completed ids; re-queue failed ids.
    pub auto_resume: bool,
    /// Drop failed ids from the queue.
    pub skip_failed: bool,
    /// Legacy: queue exactly the failed set, ignoring the input list.
    pub resume_failed: bool,
    pub conflict: ResumeConflict,
    /// Truncate completed/failed sets before the run.
    pub fresh: bool,
}

impl ResumeOptions {
    crate::setters! {
        set {
            auto_resume: bool,
            skip_failed: bool,
            resume_failed: bool,
            conflict: ResumeConflict,
            fresh: bool,
        }
    }
}

/// Where result artifacts are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactLayout {
    /// One artifact file per work item, overwritten on retry.
    #[default]
    PerItem,
    /// One artifact file per worker, rows appended.
    PerWorker,
}

crate::simple_display! {
    ArtifactLayout {
        PerItem => "per-item",
        PerWorker => "per-worker",
    }
}

/// Directories used by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirs {
    /// Result artifacts.
    pub results: PathBuf,
    /// Consolidated output.
    pub output: PathBuf,
    /// Run and worker logs.
    pub logs: PathBuf,
    /// Per-attempt scratch space.
    pub tmp: PathBuf,
    /// completed/failed/last-processed state files.
    pub state: PathBuf,
}

impl RunDirs {
    /// Conventional layout under a base directory.
    pub fn under(base: &Path) -> Self {
        Self {
            results: base.join("results"),
            output: base.join("results"),
            logs: base.join("logs"),
            tmp: base.join("tmp"),
            state: base.to_path_buf(),
        }
    }
}

/// Fully resolved configuration of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub command: CommandTemplate,
    pub max_workers: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub resume: ResumeOptions,
    pub dry_run: bool,
    pub layout: ArtifactLayout,
    pub consolidate: bool,
    pub dirs: RunDirs,
}

impl RunConfig {
    pub fn new(command: CommandTemplate, dirs: RunDirs) -> Self {
        Self {
            command,
            max_workers: default_workers(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            resume: ResumeOptions::default(),
            dry_run: false,
            layout: ArtifactLayout::default(),
            consolidate: false,
            dirs,
        }
    }

    crate::setters! {
        set {
            max_workers: usize,
            timeout: Duration,
            retry: RetryPolicy,
            resume: ResumeOptions,
            dry_run: bool,
            layout: ArtifactLayout,
            consolidate: bool,
        }
    }

    /// Overlay values present in a config file.
    pub fn apply_file(&mut self, file: &ConfigFile) {
        let run = &file.run;
        if let Some(program) = &run.program {
            self.command.program = program.clone();
        }
        if let Some(args) = &run.args {
            self.command.args = args.clone();
        }
        if let Some(n) = run.max_workers {
            self.max_workers = n;
        }
        if let Some(secs) = run.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = run.retries {
            self.retry.retries = retries;
        }
        if let Some(backoff) = run.retry_backoff {
            self.retry.backoff = backoff;
        }
        if let Some(ms) = run.retry_backoff_ms {
            self.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(per_worker) = run.single_csv_per_worker {
            self.layout =
                if per_worker { ArtifactLayout::PerWorker } else { ArtifactLayout::PerItem };
        }
        if let Some(consolidate) = run.consolidate {
            self.consolidate = consolidate;
        }
        if let Some(conflict) = run.on_resume_conflict {
            self.resume.conflict = conflict;
        }

        let dirs = &file.dirs;
        if let Some(p) = &dirs.results {
            self.dirs.results = p.clone();
        }
        if let Some(p) = &dirs.output {
            self.dirs.output = p.clone();
        }
        if let Some(p) = &dirs.logs {
            self.dirs.logs = p.clone();
        }
        if let Some(p) = &dirs.tmp {
            self.dirs.tmp = p.clone();
        }
        if let Some(p) = &dirs.state {
            self.dirs.state = p.clone();
        }
    }

    /// Reject configurations the orchestrator cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.program.trim().is_empty() {
            return Err(ConfigError::Invalid("program must not be empty".to_string()));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid("max-workers must be >= 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be >= 1 second".to_string()));
        }
        Ok(())
    }
}

/// Worker count when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Optional `drover.toml` layer. Every field is optional; present values
/// override the built-in defaults and are themselves overridden by flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub dirs: DirsSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub max_workers: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub retry_backoff: Option<Backoff>,
    pub retry_backoff_ms: Option<u64>,
    pub single_csv_per_worker: Option<bool>,
    pub consolidate: Option<bool>,
    pub on_resume_conflict: Option<ResumeConflict>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirsSection {
    pub results: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub logs: Option<PathBuf>,
    pub tmp: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
