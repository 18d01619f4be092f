// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Centralized environment variable access for the CLI.
//!
//! Environment values sit between the config file and command-line flags.

use std::path::PathBuf;
use std::time::Duration;

pub const STATE_DIR: &str = "DROVER_STATE_DIR";
pub const TIMEOUT_SECS: &str = "DROVER_TIMEOUT_SECS";
pub const MAX_WORKERS: &str = "DROVER_MAX_WORKERS";

/// State directory override (`DROVER_STATE_DIR`).
pub fn state_dir() -> Option<PathBuf> {
    std::env::var(STATE_DIR).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Per-item timeout override in seconds (`DROVER_TIMEOUT_SECS`).
pub fn timeout() -> Option<Duration> {
    std::env::var(TIMEOUT_SECS).ok().and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_secs)
}

/// Worker-pool size override (`DROVER_MAX_WORKERS`).
pub fn max_workers() -> Option<usize> {
    std::env::var(MAX_WORKERS).ok().and_then(|s| s.trim().parse::<usize>().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
