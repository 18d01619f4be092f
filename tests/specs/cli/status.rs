// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! `drover status` reads the state files a run leaves behind.

use crate::prelude::*;

#[test]
fn empty_workspace() {
    let ws = Workspace::new();
    ws.drover()
        .args(&["status"])
        .passes()
        .stdout_has("completed: 0")
        .stdout_has("failed:    0")
        .stdout_has("last processed: -");
}

#[test]
fn reports_failed_items_after_a_run() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "bad-beta", "gamma"]);
    ws.run(&tool).exits_with(1);

    ws.drover()
        .args(&["status"])
        .passes()
        .stdout_has("completed: 2")
        .stdout_has("failed:    1")
        .stdout_has("Failed items:\n  bad-beta");
}

#[test]
fn json_output() {
    let ws = Workspace::new();
    ws.file("state/completed.txt", "A\nB\n").file("state/failed.txt", "C\n");
    ws.file("state/last_processed.txt", "B\n");

    let json = ws.drover().args(&["status", "--state-dir", "state", "--format", "json"]).passes().json();

    assert_eq!(json["completed"], 2);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["failed_items"], serde_json::json!(["C"]));
    assert_eq!(json["last_processed"], "B");
}

#[test]
fn state_dir_from_environment() {
    let ws = Workspace::new();
    ws.file("elsewhere/completed.txt", "A\n");
    let dir = ws.path().join("elsewhere");

    ws.drover()
        .env("DROVER_STATE_DIR", &dir.display().to_string())
        .args(&["status"])
        .passes()
        .stdout_has("completed: 1");
}
