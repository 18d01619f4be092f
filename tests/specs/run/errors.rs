// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Conditions that stop a run with exit code 2.

use crate::prelude::*;

#[test]
fn missing_tool_is_fatal() {
    let ws = Workspace::new();
    ws.setup(&["alpha", "beta"]);

    ws.run("/nonexistent/analyzer").exits_with(2).stderr_has("drover:");

    assert!(ws.lines("completed.txt").is_empty());
    assert!(ws.lines("failed.txt").is_empty());
}

#[test]
fn missing_input_is_fatal() {
    let ws = Workspace::new();
    let tool = ws.tool("analyzer.sh", ANALYZER);

    ws.drover()
        .args(&["run", "--input", "nope.csv", "--program", &tool.display().to_string()])
        .exits_with(2)
        .stderr_has("nope.csv");
}

#[test]
fn zero_workers_is_rejected() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);

    ws.run(&tool).args(&["--max-workers", "0"]).exits_with(2).stderr_has("max-workers");
    assert!(!ws.exists("results"));
}

#[test]
fn unknown_config_key_is_rejected() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);
    ws.file("drover.toml", "[run]\nworkers = 3\n");

    ws.run(&tool).args(&["--config", "drover.toml"]).exits_with(2).stderr_has("drover.toml");
}

#[test]
fn missing_id_column_is_fatal() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha"]);

    ws.run(&tool).args(&["--id-column", "repo"]).exits_with(2).stderr_has("repo");
}
