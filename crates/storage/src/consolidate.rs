// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Merge result artifacts into `results_all.csv`.
//!
//! Each artifact row carries the `completed_at` stamp of the attempt that
//! wrote it, and for each id the group of rows with the latest stamp wins.
//! Per-worker files are appended across runs, so their mtime says nothing
//! about which worker saw an item last. Artifacts are still read
//! oldest-first (file mtime, then name) and a later group wins a tie, which
//! keeps unstamped artifacts resolving by file order. Only ids in the
//! completed set survive; output rows are sorted by id.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexSet;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::{COMPLETED_AT_COLUMN, ID_COLUMN, ITEM_PREFIX, WORKER_PREFIX};
use crate::state::RunState;

pub const CONSOLIDATED_FILE: &str = "results_all.csv";

#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("failed to read results directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a consolidation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub path: PathBuf,
    /// Artifact files read.
    pub files: usize,
    /// Distinct ids in the output.
    pub items: usize,
    /// Data rows written.
    pub rows: usize,
    /// Artifacts that could not be parsed and were skipped.
    pub skipped_files: usize,
}

struct Artifact {
    path: PathBuf,
    modified: SystemTime,
}

type Row = BTreeMap<String, String>;

/// Contiguous rows written by one attempt for one id.
struct Group {
    id: String,
    completed_at: Option<DateTime<FixedOffset>>,
    rows: Vec<Row>,
}

/// Consolidate every artifact under `results_dir` into
/// `<output_dir>/results_all.csv`, replacing any previous output.
pub fn consolidate(
    results_dir: &Path,
    output_dir: &Path,
    state: &RunState,
) -> Result<ConsolidationReport, ConsolidateError> {
    let artifacts = list_artifacts(results_dir)?;

    let mut columns: IndexSet<String> = IndexSet::new();
    let mut latest: BTreeMap<String, Group> = BTreeMap::new();
    let mut skipped_files = 0;

    for artifact in &artifacts {
        match read_artifact(&artifact.path, &mut columns) {
            Ok(groups) => {
                for group in groups {
                    let newer = match latest.get(&group.id) {
                        Some(seen) => group.completed_at >= seen.completed_at,
                        None => true,
                    };
                    if newer {
                        latest.insert(group.id.clone(), group);
                    }
                }
            }
            Err(e) => {
                warn!(path = %artifact.path.display(), error = %e, "skipping unreadable artifact");
                skipped_files += 1;
            }
        }
    }

    latest.retain(|id, _| state.completed.contains(id.as_str()));

    fs::create_dir_all(output_dir)
        .map_err(|source| ConsolidateError::Write { path: output_dir.to_path_buf(), source })?;
    let path = output_dir.join(CONSOLIDATED_FILE);
    let rows = write_output(&path, &columns, &latest)
        .map_err(|source| ConsolidateError::Write { path: path.clone(), source })?;

    let report =
        ConsolidationReport { path, files: artifacts.len(), items: latest.len(), rows, skipped_files };
    info!(
        path = %report.path.display(),
        files = report.files,
        items = report.items,
        rows = report.rows,
        "consolidated results"
    );
    Ok(report)
}

fn list_artifacts(results_dir: &Path) -> Result<Vec<Artifact>, ConsolidateError> {
    let read_dir_err =
        |source| ConsolidateError::ReadDir { path: results_dir.to_path_buf(), source };
    let entries = match fs::read_dir(results_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_dir_err(e)),
    };

    let mut artifacts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(read_dir_err)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let is_artifact = (name.starts_with(ITEM_PREFIX) || name.starts_with(WORKER_PREFIX))
            && name.ends_with(".csv");
        if !is_artifact {
            continue;
        }
        let meta = entry.metadata().map_err(read_dir_err)?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        artifacts.push(Artifact { path: entry.path(), modified });
    }
    artifacts.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(artifacts)
}

/// Rows of one artifact, grouped by id and stamp.
fn read_artifact(path: &Path, columns: &mut IndexSet<String>) -> Result<Vec<Group>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.first().map(String::as_str) != Some(ID_COLUMN) {
        warn!(path = %path.display(), "artifact has no leading item_id column");
    }
    let stamped = headers.get(1).map(String::as_str) == Some(COMPLETED_AT_COLUMN);
    let data_start = if stamped { 2 } else { 1 };
    for h in headers.iter().skip(data_start) {
        columns.insert(h.clone());
    }

    let mut groups: Vec<Group> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(id) = record.get(0).map(str::trim).filter(|id| !id.is_empty()) else {
            continue;
        };
        let completed_at = if stamped {
            record.get(1).and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
        } else {
            None
        };
        let row: Row = headers
            .iter()
            .skip(data_start)
            .zip(record.iter().skip(data_start))
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        match groups.last_mut() {
            Some(last) if last.id == id && last.completed_at == completed_at => last.rows.push(row),
            _ => groups.push(Group { id: id.to_string(), completed_at, rows: vec![row] }),
        }
    }
    Ok(groups)
}

fn write_output(
    path: &Path,
    columns: &IndexSet<String>,
    latest: &BTreeMap<String, Group>,
) -> std::io::Result<usize> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let mut written = 0;
    {
        let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
        let mut header = vec![ID_COLUMN];
        header.extend(columns.iter().map(String::as_str));
        writer.write_record(&header)?;
        for (id, group) in latest {
            for row in &group.rows {
                let mut record = vec![id.as_str()];
                record.extend(
                    columns.iter().map(|c| row.get(c).map(String::as_str).unwrap_or_default()),
                );
                writer.write_record(&record)?;
                written += 1;
            }
        }
        writer.flush()?;
    }
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_data()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(written)
}

#[cfg(test)]
#[path = "consolidate_tests.rs"]
mod tests;
