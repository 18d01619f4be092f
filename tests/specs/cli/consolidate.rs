// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Standalone `drover consolidate`.

use crate::prelude::*;

#[test]
fn merges_artifacts_of_completed_items() {
    let ws = Workspace::new();
    let tool = ws.setup(&["bb", "a", "bad-c"]);
    ws.run(&tool).exits_with(1);

    ws.drover().args(&["consolidate"]).passes().stdout_has("consolidated 2 items (2 rows)");

    similar_asserts::assert_eq!(
        ws.read("results/results_all.csv"),
        "item_id,metric,value\na,length,1\nbb,length,2\n"
    );
}

#[test]
fn output_dir_is_created() {
    let ws = Workspace::new();
    ws.file("results/item_x.csv", "item_id,n\nx,1\n").file("completed.txt", "x\n");

    ws.drover().args(&["consolidate", "--output-dir", "out/merged"]).passes();

    assert_eq!(ws.read("out/merged/results_all.csv"), "item_id,n\nx,1\n");
}

#[test]
fn json_report() {
    let ws = Workspace::new();
    ws.file("results/item_x.csv", "item_id,n\nx,1\nx,2\n").file("completed.txt", "x\n");

    let json = ws.drover().args(&["consolidate", "--format", "json"]).passes().json();

    assert_eq!(json["items"], 1);
    assert_eq!(json["rows"], 2);
    assert_eq!(json["skipped_files"], 0);
}
