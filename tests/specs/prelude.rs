// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Shared helpers for the black-box specs.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Output;

use tempfile::TempDir;

/// Tool used by most specs.
///
/// Called as `tool <item> <output> [attempt]`. Items containing `bad` exit 3,
/// `slow` sleeps past any short timeout, `flaky` fails its first attempt,
/// `silent` exits 0 without writing output.
pub const ANALYZER: &str = r#"#!/bin/sh
case "$1" in
  *bad*) echo "cannot analyze $1" >&2; exit 3 ;;
  *slow*) exec sleep 10 ;;
  *flaky*) [ "$3" = "1" ] && exit 1 ;;
  *silent*) exit 0 ;;
esac
printf 'metric,value\nlength,%s\n' "${#1}" > "$2"
"#;

/// `drover` with no arguments.
pub fn cli() -> CliBuilder {
    CliBuilder::new(None)
}

/// A scratch directory acting as the working directory of a run.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the workspace, creating parent directories.
    pub fn file(&self, rel: &str, content: &str) -> &Self {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
        self
    }

    /// Write an executable script and return its absolute path.
    pub fn tool(&self, name: &str, script: &str) -> PathBuf {
        self.file(name, script);
        let path = self.path().join(name);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Input list plus the standard analyzer; returns the analyzer path.
    pub fn setup(&self, items: &[&str]) -> String {
        let mut input = String::from("id\n");
        for item in items {
            input.push_str(item);
            input.push('\n');
        }
        self.file("items.csv", &input);
        self.tool("analyzer.sh", ANALYZER).display().to_string()
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel))
            .unwrap_or_else(|e| panic!("failed to read {rel}: {e}"))
    }

    /// The per-item artifact holding rows for `id`, without its
    /// `completed_at` column.
    pub fn item_artifact(&self, id: &str) -> Option<String> {
        let entries = std::fs::read_dir(self.path().join("results")).ok()?;
        let prefix = format!("{id},");
        entries
            .filter_map(Result::ok)
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.starts_with("item_") && name.ends_with(".csv")
            })
            .map(|e| unstamped(&std::fs::read_to_string(e.path()).unwrap()))
            .find(|content| content.lines().skip(1).any(|l| l.starts_with(&prefix)))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path().join(rel).exists()
    }

    /// Lines of a state file, empty when missing.
    pub fn lines(&self, rel: &str) -> Vec<String> {
        if !self.exists(rel) {
            return Vec::new();
        }
        self.read(rel).lines().map(str::to_string).collect()
    }

    pub fn drover(&self) -> CliBuilder {
        CliBuilder::new(Some(self.path()))
    }

    /// `drover run` over `items.csv` with the analyzer and the attempt number.
    pub fn run(&self, tool: &str) -> CliBuilder {
        self.drover().args(&[
            "run",
            "--input",
            "items.csv",
            "--program",
            tool,
            "--arg",
            "${item}",
            "--arg",
            "${output}",
            "--arg",
            "${attempt}",
            "--max-workers",
            "2",
        ])
    }
}

/// Drop the second (`completed_at`) field of every artifact line.
pub fn unstamped(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            let mut fields = line.splitn(3, ',');
            let id = fields.next().unwrap_or_default();
            fields.next();
            format!("{id},{}\n", fields.next().unwrap_or_default())
        })
        .collect()
}

pub struct CliBuilder {
    cmd: assert_cmd::Command,
}

impl CliBuilder {
    fn new(cwd: Option<&Path>) -> Self {
        let mut cmd = assert_cmd::Command::cargo_bin("drover").unwrap();
        cmd.env("NO_COLOR", "1")
            .env_remove("COLOR")
            .env_remove("RUST_LOG")
            .env_remove("DROVER_STATE_DIR")
            .env_remove("DROVER_TIMEOUT_SECS")
            .env_remove("DROVER_MAX_WORKERS");
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and require exit code 0.
    pub fn passes(self) -> RunAssert {
        self.exits_with(0)
    }

    /// Run and require a non-zero exit code.
    pub fn fails(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert { output };
        assert!(!run.output.status.success(), "expected failure\n{}", run.describe());
        run
    }

    pub fn exits_with(mut self, code: i32) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert { output };
        assert_eq!(run.output.status.code(), Some(code), "unexpected exit code\n{}", run.describe());
        run
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout().contains(needle), "stdout lacks {needle:?}\n{}", self.describe());
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(!self.stdout().contains(needle), "stdout has {needle:?}\n{}", self.describe());
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr().contains(needle), "stderr lacks {needle:?}\n{}", self.describe());
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.output.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON: {e}\n{}", self.describe()))
    }

    fn describe(&self) -> String {
        format!("--- stdout ---\n{}--- stderr ---\n{}", self.stdout(), self.stderr())
    }
}
