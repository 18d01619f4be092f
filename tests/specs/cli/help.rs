// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Help output for every command.

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("run")
        .stdout_has("status")
        .stdout_has("consolidate");
}

#[test]
fn run_help_lists_resume_flags() {
    cli()
        .args(&["run", "--help"])
        .passes()
        .stdout_has("--auto-resume")
        .stdout_has("--skip-failed")
        .stdout_has("--resume-failed")
        .stdout_has("--dry-run")
        .stdout_has("--single-csv-per-worker");
}

#[test]
fn no_arguments_is_a_usage_error() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn run_requires_input() {
    cli().args(&["run", "--program", "true"]).fails().stderr_has("--input");
}
