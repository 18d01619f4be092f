// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Plain runs: artifacts, state files, logs, exit codes.

use crate::prelude::*;

#[test]
fn all_items_succeed() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "beta", "gamma"]);

    ws.run(&tool).passes().stdout_has("processed 3 items").stdout_has("3 succeeded, 0 failed");

    assert_eq!(ws.item_artifact("alpha").unwrap(), "item_id,metric,value\nalpha,length,5\n");
    assert!(ws.item_artifact("beta").is_some());
    assert!(ws.item_artifact("gamma").is_some());

    let mut completed = ws.lines("completed.txt");
    completed.sort();
    assert_eq!(completed, ["alpha", "beta", "gamma"]);
    assert!(ws.lines("failed.txt").is_empty());
    assert!(ws.exists("logs/run.log"));
}

#[test]
fn one_failure_exits_one() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "bad-beta", "gamma"]);

    ws.run(&tool)
        .exits_with(1)
        .stdout_has("2 succeeded, 1 failed")
        .stdout_has("failed: bad-beta")
        .stderr_has("1 of 3 items failed");

    assert_eq!(ws.lines("failed.txt"), ["bad-beta"]);
    assert!(ws.item_artifact("bad-beta").is_none());
}

#[test]
fn tool_without_output_is_a_failure() {
    let ws = Workspace::new();
    let tool = ws.setup(&["silent"]);

    ws.run(&tool).exits_with(1);

    assert_eq!(ws.lines("failed.txt"), ["silent"]);
    assert!(ws.lines("completed.txt").is_empty());
}

#[test]
fn timeout_marks_item_failed() {
    let ws = Workspace::new();
    let tool = ws.setup(&["slow", "quick"]);

    ws.run(&tool).args(&["--timeout", "1"]).exits_with(1).stdout_has("failed: slow");

    assert_eq!(ws.lines("completed.txt"), ["quick"]);
    assert_eq!(ws.lines("failed.txt"), ["slow"]);
}

#[test]
fn per_worker_artifacts() {
    let ws = Workspace::new();
    let tool = ws.setup(&["a", "bb", "ccc", "dddd"]);

    ws.run(&tool).args(&["--single-csv-per-worker"]).passes();

    let mut rows = Vec::new();
    for worker in ["results/worker_01.csv", "results/worker_02.csv"] {
        if !ws.exists(worker) {
            continue;
        }
        let content = unstamped(&ws.read(worker));
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("item_id,metric,value"));
        rows.extend(lines.map(str::to_string));
    }
    rows.sort();
    assert_eq!(rows, ["a,length,1", "bb,length,2", "ccc,length,3", "dddd,length,4"]);
}

#[test]
fn ids_with_a_shared_suffix_keep_their_own_artifacts() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alice_1", "bob_1"]);

    ws.run(&tool).args(&["--consolidate"]).passes();

    assert_eq!(ws.item_artifact("alice_1").unwrap(), "item_id,metric,value\nalice_1,length,7\n");
    assert_eq!(ws.item_artifact("bob_1").unwrap(), "item_id,metric,value\nbob_1,length,5\n");
    assert_eq!(
        ws.read("results/results_all.csv"),
        "item_id,metric,value\nalice_1,length,7\nbob_1,length,5\n"
    );
}

#[test]
fn consolidate_after_run() {
    let ws = Workspace::new();
    let tool = ws.setup(&["bb", "a"]);

    ws.run(&tool)
        .args(&["--consolidate", "--output-dir", "out"])
        .passes()
        .stdout_has("consolidated:");

    assert_eq!(ws.read("out/results_all.csv"), "item_id,metric,value\na,length,1\nbb,length,2\n");
}

#[test]
fn semicolon_input_with_named_column() {
    let ws = Workspace::new();
    let tool = ws.setup(&[]);
    ws.file("items.csv", "owner;repo\nacme;widget\nacme;gadget\n");

    ws.run(&tool).args(&["--delimiter", ";", "--id-column", "repo"]).passes();

    let mut completed = ws.lines("completed.txt");
    completed.sort();
    assert_eq!(completed, ["gadget", "widget"]);
}

#[test]
fn json_summary() {
    let ws = Workspace::new();
    let tool = ws.setup(&["alpha", "bad-beta"]);

    let run = ws.run(&tool).args(&["--format", "json"]).exits_with(1);
    let json = run.json();

    assert_eq!(json["queued"], 2);
    assert_eq!(json["succeeded"], serde_json::json!(["alpha"]));
    assert_eq!(json["failed"], serde_json::json!(["bad-beta"]));
    assert_eq!(json["dry_run"], false);
}

#[test]
fn worker_logs_record_attempts() {
    let ws = Workspace::new();
    let tool = ws.setup(&["bad-one"]);

    ws.run(&tool).exits_with(1);

    let log = ws.read("logs/worker-01.log");
    assert!(log.contains("[bad-one]"), "{log}");
    assert!(log.contains("cannot analyze bad-one"), "{log}");
}
