// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! `--dry-run` plans without touching anything.

use crate::prelude::*;

#[test]
fn lists_planned_commands() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "beta"]);

    let run = ws.run(&tool).args(&["--dry-run"]).passes().stdout_has("dry run: 2 of 2 items would run");
    let stdout = run.stdout();
    assert!(stdout.contains(&format!("  {tool} alpha ")), "{stdout}");
    assert!(stdout.contains(&format!("  {tool} beta ")), "{stdout}");
}

#[test]
fn creates_no_files() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);

    ws.run(&tool).args(&["--dry-run", "--consolidate"]).passes();

    assert!(!ws.exists("results"));
    assert!(!ws.exists("logs"));
    assert!(!ws.exists("tmp"));
    assert!(!ws.exists("completed.txt"));
    assert!(!ws.exists("failed.txt"));
}

#[test]
fn honors_resume_filters() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "beta", "gamma"]);
    ws.file("completed.txt", "alpha\n").file("failed.txt", "beta\n");

    ws.run(&tool)
        .args(&["--dry-run", "--auto-resume", "--skip-failed", "--on-resume-conflict", "skip"])
        .passes()
        .stdout_has("dry run: 1 of 3 items would run (2 skipped)")
        .stdout_lacks(" alpha ")
        .stdout_lacks(" beta ");
}

#[test]
fn fresh_is_ignored() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);
    ws.file("completed.txt", "alpha\n");

    ws.run(&tool).args(&["--dry-run", "--fresh", "--auto-resume"]).passes();

    assert_eq!(ws.lines("completed.txt"), ["alpha"]);
}
