// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Retry passes over failed items.

use crate::prelude::*;

#[test]
fn flaky_item_fails_without_retries() {
    let ws = Workspace::new();
    let tool = ws.setup(&["flaky", "alpha"]);

    ws.run(&tool).exits_with(1).stdout_has("failed: flaky");
}

#[test]
fn retry_pass_recovers_flaky_item() {
    let ws = Workspace::new();
    let tool = ws.setup(&["flaky", "alpha"]);

    ws.run(&tool)
        .args(&["--retries", "1", "--retry-backoff-ms", "10"])
        .passes()
        .stdout_has("2 succeeded, 0 failed")
        .stdout_has("attempts: 3 over 2 passes");

    let mut completed = ws.lines("completed.txt");
    completed.sort();
    assert_eq!(completed, ["alpha", "flaky"]);
    assert!(ws.lines("failed.txt").is_empty());
}

#[test]
fn retries_are_bounded() {
    let ws = Workspace::new();
    let tool = ws.setup(&["bad-one"]);

    ws.run(&tool)
        .args(&["--retries", "2", "--retry-backoff", "exponential"])
        .exits_with(1)
        .stdout_has("attempts: 3 over 3 passes");

    let log = ws.read("logs/worker-01.log");
    assert!(log.contains("attempt 3 failed"), "{log}");
}
