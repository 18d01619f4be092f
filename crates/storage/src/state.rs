// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Durable run state: completed ids, failed ids, last-processed marker.
//!
//! Layout under the state directory:
//!
//! ```text
//! completed.txt        one id per line, append-only
//! failed.txt           one id per line, append-only (removals rewrite the file)
//! last_processed.txt   single line
//! state.lock           advisory lock serializing mutations across processes
//! ```
//!
//! Every mutation holds the in-process mutex and the exclusive file lock, so
//! concurrent workers (and concurrent processes sharing the directory) never
//! interleave writes. Removals re-read the file from disk under the lock
//! before rewriting it, so appends made by another process are not lost.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dv_core::WorkItemId;
use fs2::FileExt;
use indexmap::IndexSet;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

pub const COMPLETED_FILE: &str = "completed.txt";
pub const FAILED_FILE: &str = "failed.txt";
pub const LAST_PROCESSED_FILE: &str = "last_processed.txt";
pub const LOCK_FILE: &str = "state.lock";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to lock state directory {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("work item id {0:?} cannot be stored (contains a line break)")]
    InvalidId(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StateError + '_ {
    move |source| StateError::Io { path: path.to_path_buf(), source }
}

/// Snapshot of the persisted run state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Ids that finished successfully, in file order.
    pub completed: IndexSet<WorkItemId>,
    /// Ids that finished with an error, in file order.
    pub failed: IndexSet<WorkItemId>,
    pub last_processed: Option<WorkItemId>,
}

impl RunState {
    /// Read the state directory without modifying it.
    ///
    /// A missing directory or missing files read as empty sets. A torn
    /// trailing line is ignored; an id in both sets counts as completed.
    pub fn load(dir: &Path) -> Result<Self, StateError> {
        let completed = read_id_file(&dir.join(COMPLETED_FILE))?.ids;
        let mut failed = read_id_file(&dir.join(FAILED_FILE))?.ids;

        let overlap: Vec<WorkItemId> =
            failed.iter().filter(|id| completed.contains(*id)).cloned().collect();
        for id in overlap {
            warn!(item = %id, "id present in both completed and failed; treating as completed");
            failed.shift_remove(&id);
        }

        let last_path = dir.join(LAST_PROCESSED_FILE);
        let last_processed = match fs::read_to_string(&last_path) {
            Ok(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(WorkItemId::new),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                let reason = "not valid UTF-8".to_string();
                return Err(StateError::Corrupt { path: last_path, reason });
            }
            Err(source) => return Err(StateError::Io { path: last_path, source }),
        };

        Ok(Self { completed, failed, last_processed })
    }

    pub fn is_completed(&self, id: &WorkItemId) -> bool {
        self.completed.contains(id)
    }

    pub fn is_failed(&self, id: &WorkItemId) -> bool {
        self.failed.contains(id)
    }
}

struct IdFile {
    ids: IndexSet<WorkItemId>,
    /// Byte length of the newline-terminated prefix; shorter than the file
    /// when the last append was torn.
    valid_len: usize,
    total_len: usize,
}

fn read_id_file(path: &Path) -> Result<IdFile, StateError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(IdFile { ids: IndexSet::new(), valid_len: 0, total_len: 0 })
        }
        Err(source) => return Err(StateError::Io { path: path.to_path_buf(), source }),
    };
    let content = String::from_utf8(bytes).map_err(|_| StateError::Corrupt {
        path: path.to_path_buf(),
        reason: "not valid UTF-8".to_string(),
    })?;

    let valid_len = content.rfind('\n').map(|i| i + 1).unwrap_or(0);
    if valid_len < content.len() {
        warn!(
            path = %path.display(),
            fragment = %&content[valid_len..],
            "ignoring unterminated trailing line in state file"
        );
    }

    let ids = content[..valid_len]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(WorkItemId::new)
        .collect();
    Ok(IdFile { ids, valid_len, total_len: content.len() })
}

/// Shared, lock-guarded handle on the state directory.
///
/// Workers call [`mark_completed`](Self::mark_completed) and
/// [`mark_failed`](Self::mark_failed); both are atomic with respect to other
/// workers and other processes using the same directory. Clones share the
/// same in-memory state.
///
/// Mutations take a blocking file lock; async callers run them on the
/// blocking pool.
#[derive(Clone)]
pub struct StateStore {
    dir: PathBuf,
    state: Arc<Mutex<RunState>>,
}

impl StateStore {
    /// Open (creating if needed) the state directory and load its contents.
    ///
    /// Torn trailing lines left by a crash are truncated away so later
    /// appends start on a fresh line.
    pub fn open(dir: &Path) -> Result<Self, StateError> {
        fs::create_dir_all(dir)
            .map_err(|source| StateError::CreateDir { path: dir.to_path_buf(), source })?;

        let store = Self { dir: dir.to_path_buf(), state: Arc::new(Mutex::new(RunState::default())) };
        {
            let _lock = store.lock_dir()?;
            for name in [COMPLETED_FILE, FAILED_FILE] {
                store.repair_torn_tail(&dir.join(name))?;
            }
            *store.state.lock() = RunState::load(dir)?;
        }
        Ok(store)
    }

    /// Copy of the current in-memory state.
    pub fn snapshot(&self) -> RunState {
        self.state.lock().clone()
    }

    pub fn is_completed(&self, id: &WorkItemId) -> bool {
        self.state.lock().is_completed(id)
    }

    pub fn is_failed(&self, id: &WorkItemId) -> bool {
        self.state.lock().is_failed(id)
    }

    /// Record a successful attempt: drop the id from failed, append it to
    /// completed, and move the last-processed marker.
    pub fn mark_completed(&self, id: &WorkItemId) -> Result<(), StateError> {
        check_id(id)?;
        let mut state = self.state.lock();
        let _lock = self.lock_dir()?;

        let failed_path = self.dir.join(FAILED_FILE);
        if state.failed.contains(id) || file_contains(&failed_path, id)? {
            rewrite_without(&failed_path, &[id.clone()])?;
            state.failed.shift_remove(id);
        }
        if !state.completed.contains(id) {
            append_line(&self.dir.join(COMPLETED_FILE), id)?;
            state.completed.insert(id.clone());
        }
        write_last_processed(&self.dir, id)?;
        state.last_processed = Some(id.clone());

        debug!(item = %id, "marked completed");
        Ok(())
    }

    /// Record a failed attempt: drop the id from completed (warning, since
    /// that discards an earlier success) and append it to failed.
    pub fn mark_failed(&self, id: &WorkItemId) -> Result<(), StateError> {
        check_id(id)?;
        let mut state = self.state.lock();
        let _lock = self.lock_dir()?;

        let completed_path = self.dir.join(COMPLETED_FILE);
        if state.completed.contains(id) || file_contains(&completed_path, id)? {
            warn!(item = %id, "previously completed item failed; moving it to the failed set");
            rewrite_without(&completed_path, &[id.clone()])?;
            state.completed.shift_remove(id);
        }
        if !state.failed.contains(id) {
            append_line(&self.dir.join(FAILED_FILE), id)?;
            state.failed.insert(id.clone());
        }

        debug!(item = %id, "marked failed");
        Ok(())
    }

    /// Remove ids from the failed set ahead of a retry.
    pub fn clear_failed(&self, ids: &[WorkItemId]) -> Result<(), StateError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock();
        let _lock = self.lock_dir()?;
        rewrite_without(&self.dir.join(FAILED_FILE), ids)?;
        for id in ids {
            state.failed.shift_remove(id);
        }
        Ok(())
    }

    /// Truncate the completed and failed sets. The last-processed marker is kept.
    pub fn reset(&self) -> Result<(), StateError> {
        let mut state = self.state.lock();
        let _lock = self.lock_dir()?;
        for name in [COMPLETED_FILE, FAILED_FILE] {
            let path = self.dir.join(name);
            File::create(&path).map_err(io_err(&path))?;
        }
        state.completed.clear();
        state.failed.clear();
        Ok(())
    }

    fn lock_dir(&self) -> Result<DirLock, StateError> {
        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| StateError::Lock { path: path.clone(), source })?;
        file.lock_exclusive().map_err(|source| StateError::Lock { path, source })?;
        Ok(DirLock(file))
    }

    fn repair_torn_tail(&self, path: &Path) -> Result<(), StateError> {
        let file = read_id_file(path)?;
        if file.valid_len < file.total_len {
            let f = OpenOptions::new().write(true).open(path).map_err(io_err(path))?;
            f.set_len(file.valid_len as u64).map_err(io_err(path))?;
        }
        Ok(())
    }
}

/// Exclusive advisory lock on `state.lock`, released on drop.
struct DirLock(File);

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

fn check_id(id: &WorkItemId) -> Result<(), StateError> {
    if id.as_str().contains(['\n', '\r']) {
        return Err(StateError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn file_contains(path: &Path, id: &WorkItemId) -> Result<bool, StateError> {
    Ok(read_id_file(path)?.ids.contains(id))
}

fn append_line(path: &Path, id: &WorkItemId) -> Result<(), StateError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path).map_err(io_err(path))?;
    file.write_all(format!("{id}\n").as_bytes()).map_err(io_err(path))?;
    file.sync_data().map_err(io_err(path))
}

/// Rewrite `path` without the given ids, atomically (temp file + rename).
fn rewrite_without(path: &Path, ids: &[WorkItemId]) -> Result<(), StateError> {
    let current = read_id_file(path)?.ids;
    let kept: Vec<&WorkItemId> = current.iter().filter(|id| !ids.contains(*id)).collect();
    let mut content = String::new();
    for id in kept {
        content.push_str(id.as_str());
        content.push('\n');
    }
    write_atomic(path, content.as_bytes())
}

fn write_last_processed(dir: &Path, id: &WorkItemId) -> Result<(), StateError> {
    write_atomic(&dir.join(LAST_PROCESSED_FILE), format!("{id}\n").as_bytes())
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StateError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err(path))?;
    tmp.write_all(content).map_err(io_err(path))?;
    tmp.as_file().sync_data().map_err(io_err(path))?;
    tmp.persist(path).map_err(|e| StateError::Io { path: path.to_path_buf(), source: e.error })?;
    Ok(())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
