// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Loading work item ids from a delimited input list.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::item::WorkItemId;

/// Header cells containing one of these mark the id column.
const ID_HEADER_HINTS: [&str; 2] = ["project", "proyecto"];

/// Header cells equal to one of these mark the id column.
const ID_HEADER_NAMES: [&str; 2] = ["id", "filename"];

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse input list {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("id column {column} not found in header of {path}")]
    MissingColumn { path: PathBuf, column: String },
}

/// How to read the input list.
#[derive(Debug, Clone)]
pub struct InputFormat {
    pub delimiter: u8,
    /// Explicit header name of the id column. When unset, the header is
    /// detected from [`ID_HEADER_HINTS`] and [`ID_HEADER_NAMES`].
    pub id_column: Option<String>,
}

impl Default for InputFormat {
    fn default() -> Self {
        Self { delimiter: b',', id_column: None }
    }
}

impl InputFormat {
    crate::setters! {
        set { delimiter: u8 }
        option { id_column: String }
    }
}

/// Read work item ids from `path`, one per row, in file order.
///
/// Blank rows and empty cells are skipped. Duplicates are kept; the queue
/// planner collapses them.
pub fn load_work_items(path: &Path, format: &InputFormat) -> Result<Vec<WorkItemId>, InputError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| InputError::Read { path: path.to_path_buf(), source })?;
    parse_work_items(&content, format).map_err(|e| match e {
        ParseFailure::Csv(source) => InputError::Parse { path: path.to_path_buf(), source },
        ParseFailure::MissingColumn(column) => {
            InputError::MissingColumn { path: path.to_path_buf(), column }
        }
    })
}

#[derive(Debug)]
enum ParseFailure {
    Csv(csv::Error),
    MissingColumn(String),
}

fn parse_work_items(content: &str, format: &InputFormat) -> Result<Vec<WorkItemId>, ParseFailure> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(format.delimiter)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let first = match records.next() {
        Some(record) => record.map_err(ParseFailure::Csv)?,
        None => return Ok(Vec::new()),
    };

    let mut items = Vec::new();
    let column = match header_column(&first, format)? {
        Some(idx) => idx,
        None => {
            push_cell(&mut items, first.get(0));
            0
        }
    };

    for record in records {
        let record = record.map_err(ParseFailure::Csv)?;
        push_cell(&mut items, record.get(column));
    }
    Ok(items)
}

/// Index of the id column if `first` is a header row, `None` if it is data.
fn header_column(first: &csv::StringRecord, format: &InputFormat) -> Result<Option<usize>, ParseFailure> {
    let normalized: Vec<String> = first.iter().map(|c| c.trim().to_lowercase()).collect();

    if let Some(wanted) = &format.id_column {
        let wanted = wanted.trim().to_lowercase();
        return match normalized.iter().position(|c| *c == wanted) {
            Some(idx) => Ok(Some(idx)),
            None => Err(ParseFailure::MissingColumn(wanted)),
        };
    }

    Ok(normalized.iter().position(|c| {
        ID_HEADER_HINTS.iter().any(|hint| c.contains(hint)) || ID_HEADER_NAMES.contains(&c.as_str())
    }))
}

fn push_cell(items: &mut Vec<WorkItemId>, cell: Option<&str>) {
    let Some(cell) = cell else {
        return;
    };
    let raw = cell.trim().trim_matches('"').trim();
    if !raw.is_empty() {
        items.push(WorkItemId::new(raw));
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
