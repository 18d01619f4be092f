// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Result artifacts written from the tool's scratch output.
//!
//! The tool writes a CSV (with a header row) into its scratch directory. The
//! store copies it into the results directory with `item_id` and
//! `completed_at` columns prepended to every row, either as
//! `item_<token>-<digest>.csv` (one file per item, replaced on retry) or
//! appended to `worker_<NN>.csv`. The digest is taken over the full id, so
//! ids sharing a token never share a file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use dv_core::{ArtifactLayout, WorkItemId};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Column prepended to every artifact row.
pub const ID_COLUMN: &str = "item_id";
/// RFC 3339 time the attempt finished, second column of every artifact row.
pub const COMPLETED_AT_COLUMN: &str = "completed_at";
pub const ITEM_PREFIX: &str = "item_";
pub const WORKER_PREFIX: &str = "worker_";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("tool produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("tool output {0} is empty")]
    EmptyOutput(PathBuf),

    #[error("tool output {path} is not valid CSV: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    fn write(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Write { path: path.to_path_buf(), source }
    }
}

/// Where an artifact landed and how many data rows it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactWrite {
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes artifacts into a results directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    results_dir: PathBuf,
    layout: ArtifactLayout,
}

impl ArtifactStore {
    pub fn new(results_dir: impl Into<PathBuf>, layout: ArtifactLayout) -> Self {
        Self { results_dir: results_dir.into(), layout }
    }

    pub fn item_path(&self, id: &WorkItemId) -> PathBuf {
        self.results_dir.join(format!("{ITEM_PREFIX}{}-{}.csv", id.token(), id_digest(id)))
    }

    pub fn worker_path(&self, worker: usize) -> PathBuf {
        self.results_dir.join(format!("{WORKER_PREFIX}{worker:02}.csv"))
    }

    /// Copy `tool_output` into the artifact for `id`.
    ///
    /// Per-item artifacts are written to a temp file and renamed into place,
    /// so a crash never leaves a half-written `item_*.csv`. Per-worker files
    /// are owned by a single worker and only appended to.
    pub fn store(
        &self,
        id: &WorkItemId,
        worker: usize,
        tool_output: &Path,
    ) -> Result<ArtifactWrite, ArtifactError> {
        let table = read_tool_output(tool_output)?;
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        let write = match self.layout {
            ArtifactLayout::PerItem => self.write_item(id, &stamp, &table)?,
            ArtifactLayout::PerWorker => self.append_worker(id, &stamp, worker, &table)?,
        };
        debug!(item = %id, path = %write.path.display(), rows = write.rows, "artifact written");
        Ok(write)
    }

    fn write_item(
        &self,
        id: &WorkItemId,
        stamp: &str,
        table: &ToolTable,
    ) -> Result<ArtifactWrite, ArtifactError> {
        let path = self.item_path(id);
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.results_dir).map_err(ArtifactError::write(&path))?;
        {
            let mut writer = writer_for(tmp.as_file_mut());
            write_table(&mut writer, id, stamp, table, true).map_err(ArtifactError::write(&path))?;
        }
        tmp.as_file().sync_data().map_err(ArtifactError::write(&path))?;
        tmp.persist(&path).map_err(|e| ArtifactError::Write { path: path.clone(), source: e.error })?;
        Ok(ArtifactWrite { path, rows: table.rows.len() })
    }

    fn append_worker(
        &self,
        id: &WorkItemId,
        stamp: &str,
        worker: usize,
        table: &ToolTable,
    ) -> Result<ArtifactWrite, ArtifactError> {
        let path = self.worker_path(worker);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(ArtifactError::write(&path))?;
        let needs_header = file.metadata().map_err(ArtifactError::write(&path))?.len() == 0;

        // Buffer the whole chunk so the append is a single write
        let mut buf = Vec::new();
        {
            let mut writer = writer_for(&mut buf);
            write_table(&mut writer, id, stamp, table, needs_header)
                .map_err(ArtifactError::write(&path))?;
        }
        file.write_all(&buf).map_err(ArtifactError::write(&path))?;
        file.sync_data().map_err(ArtifactError::write(&path))?;
        Ok(ArtifactWrite { path, rows: table.rows.len() })
    }
}

struct ToolTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn read_tool_output(path: &Path) -> Result<ToolTable, ArtifactError> {
    if !path.is_file() {
        return Err(ArtifactError::MissingOutput(path.to_path_buf()));
    }
    if fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true) {
        return Err(ArtifactError::EmptyOutput(path.to_path_buf()));
    }
    let malformed = |source| ArtifactError::Malformed { path: path.to_path_buf(), source };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path).map_err(malformed)?;
    let headers = reader.headers().map_err(malformed)?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        rows.push(record.iter().map(String::from).collect());
    }
    Ok(ToolTable { headers, rows })
}

/// First 16 hex digits of the SHA-256 of the full id.
fn id_digest(id: &WorkItemId) -> String {
    let mut hex = format!("{:x}", Sha256::digest(id.as_str().as_bytes()));
    hex.truncate(16);
    hex
}

fn writer_for<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().flexible(true).from_writer(inner)
}

fn write_table<W: Write>(
    writer: &mut csv::Writer<W>,
    id: &WorkItemId,
    stamp: &str,
    table: &ToolTable,
    header: bool,
) -> std::io::Result<()> {
    if header {
        let mut row = vec![ID_COLUMN, COMPLETED_AT_COLUMN];
        row.extend(table.headers.iter().map(String::as_str));
        writer.write_record(&row).map_err(std::io::Error::from)?;
    }
    for record in &table.rows {
        let mut row = vec![id.as_str(), stamp];
        row.extend(record.iter().map(String::as_str));
        writer.write_record(&row).map_err(std::io::Error::from)?;
    }
    writer.flush()
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
