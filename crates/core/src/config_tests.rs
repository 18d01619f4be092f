// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

use super::*;

fn base() -> RunConfig {
    RunConfig::new(CommandTemplate::new("java", vec![]), RunDirs::under(Path::new("/work")))
}

#[test]
fn defaults_match_documented_values() {
    let config = base();
    assert_eq!(config.timeout, Duration::from_secs(1620));
    assert!(config.max_workers >= 1);
    assert_eq!(config.retry.retries, 0);
    assert_eq!(config.layout, ArtifactLayout::PerItem);
    assert_eq!(config.resume.conflict, ResumeConflict::Retry);
    assert_eq!(config.dirs.state, PathBuf::from("/work"));
    assert_eq!(config.dirs.results, PathBuf::from("/work/results"));
}

#[test]
fn file_layer_overrides_defaults() {
    let file = ConfigFile::parse(
        r#"
[run]
program = "/usr/bin/java"
args = ["-jar", "tool.jar", "${item}"]
max_workers = 3
timeout_secs = 60
retries = 2
retry_backoff = "exponential"
retry_backoff_ms = 250
single_csv_per_worker = true
consolidate = true
on_resume_conflict = "skip"

[dirs]
state = "/state"
logs = "/logs"
"#,
    )
    .unwrap();

    let mut config = base();
    config.apply_file(&file);

    assert_eq!(config.command.program, "/usr/bin/java");
    assert_eq!(config.command.args, ["-jar", "tool.jar", "${item}"]);
    assert_eq!(config.max_workers, 3);
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.retry.retries, 2);
    assert_eq!(config.retry.backoff, Backoff::Exponential);
    assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    assert_eq!(config.layout, ArtifactLayout::PerWorker);
    assert!(config.consolidate);
    assert_eq!(config.resume.conflict, ResumeConflict::Skip);
    assert_eq!(config.dirs.state, PathBuf::from("/state"));
    assert_eq!(config.dirs.logs, PathBuf::from("/logs"));
    assert_eq!(config.dirs.results, PathBuf::from("/work/results"));
}

#[test]
fn empty_file_changes_nothing() {
    let file = ConfigFile::parse("").unwrap();
    let mut config = base();
    config.apply_file(&file);
    assert_eq!(config.command.program, "java");
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(ConfigFile::parse("[run]\nworkers = 3\n").is_err());
}

#[test]
fn load_reports_path_on_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drover.toml");
    std::fs::write(&path, "[run\n").unwrap();
    let err = ConfigFile::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("drover.toml"));
}

#[yare::parameterized(
    zero_workers  = { "java", 0, 10 },
    zero_timeout  = { "java", 2, 0 },
    empty_program = { "  ",   2, 10 },
)]
fn validate_rejects(program: &str, workers: usize, timeout_secs: u64) {
    let mut config = base().max_workers(workers).timeout(Duration::from_secs(timeout_secs));
    config.command.program = program.to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn validate_accepts_defaults() {
    assert!(base().validate().is_ok());
}

#[test]
fn display_names() {
    assert_eq!(ArtifactLayout::PerWorker.to_string(), "per-worker");
    assert_eq!(ResumeConflict::Skip.to_string(), "skip");
}
