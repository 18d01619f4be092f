// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Resuming from the state files of an earlier run.

use crate::prelude::*;

#[test]
fn rerun_without_resume_processes_everything() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "beta"]);

    ws.run(&tool).passes();
    ws.run(&tool).passes().stdout_has("processed 2 items");

    let mut completed = ws.lines("completed.txt");
    completed.sort();
    assert_eq!(completed, ["alpha", "beta"]);
}

#[test]
fn auto_resume_skips_completed_and_retries_failed() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "bad-beta", "gamma"]);
    ws.run(&tool).exits_with(1);

    ws.run(&tool)
        .args(&["--auto-resume"])
        .exits_with(1)
        .stdout_has("processed 1 items")
        .stdout_has("2 skipped")
        .stdout_has("failed: bad-beta");
}

#[test]
fn second_auto_resume_run_after_success_is_a_no_op() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "beta"]);
    ws.run(&tool).passes();

    ws.run(&tool).args(&["--auto-resume"]).passes().stdout_has("nothing to do (2 skipped)");
}

#[test]
fn conflict_setting_skip_drops_failed_items() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "bad-beta"]);
    ws.run(&tool).exits_with(1);

    ws.run(&tool)
        .args(&["--auto-resume", "--skip-failed", "--on-resume-conflict", "skip"])
        .passes()
        .stdout_has("nothing to do (2 skipped)");
}

#[test]
fn resume_failed_runs_only_failed_items() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "beta", "gamma"]);
    ws.file("completed.txt", "alpha\n").file("failed.txt", "gamma\n");

    ws.run(&tool).args(&["--resume-failed"]).passes().stdout_has("processed 1 items");

    let mut completed = ws.lines("completed.txt");
    completed.sort();
    assert_eq!(completed, ["alpha", "gamma"]);
    assert!(ws.lines("failed.txt").is_empty());
    assert!(ws.item_artifact("beta").is_none());
}

#[test]
fn fresh_forgets_previous_state() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);
    ws.file("completed.txt", "alpha\nzeta\n").file("failed.txt", "omega\n");

    ws.run(&tool).args(&["--fresh", "--auto-resume"]).passes().stdout_has("processed 1 items");

    assert_eq!(ws.lines("completed.txt"), ["alpha"]);
    assert!(ws.lines("failed.txt").is_empty());
}

#[test]
fn last_processed_marker_is_written() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);

    ws.run(&tool).passes();

    assert_eq!(ws.lines("last_processed.txt"), ["alpha"]);
}

#[test]
fn state_dir_flag_moves_state_files() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);

    ws.run(&tool).args(&["--state-dir", "state"]).passes();

    assert_eq!(ws.lines("state/completed.txt"), ["alpha"]);
    assert!(!ws.exists("completed.txt"));
}
