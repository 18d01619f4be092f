// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, so `main()` owns process termination (and log flushing).

use std::fmt;

/// Some work items failed; the run itself completed.
pub const ITEMS_FAILED: i32 = 1;
/// The run could not proceed (bad input, unusable state, tool not launchable).
pub const FATAL: i32 = 2;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(FATAL, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Exit code for an error returned from a command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ExitError>().map(|e| e.code).unwrap_or(FATAL)
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
