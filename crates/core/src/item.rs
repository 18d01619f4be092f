// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Work item identifier.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

/// Identifier of one unit of batch work (a project).
///
/// Ids are opaque: the orchestrator never interprets them beyond deriving
/// a file-name-safe [`token`](WorkItemId::token).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub SmolStr);

impl WorkItemId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ID is an empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File-name-safe token derived from the id.
    ///
    /// `C:/data/batch_1234.sb3.txt` → `1234.sb3`, `my project` → `my-project`.
    pub fn token(&self) -> String {
        derive_token(&self.0)
    }
}

const STRIPPED_SUFFIXES: [&str; 3] = [".txt", ".csv", ".list"];

fn derive_token(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let mut token = match name.rsplit_once('_') {
        Some((_, tail)) => tail.to_string(),
        None => name.to_string(),
    };
    token = token.replace(' ', "-");
    for suffix in STRIPPED_SUFFIXES {
        token = token.replace(suffix, "");
    }
    let token = sanitize(token.trim_matches(['.', '-', '_']));
    if token.is_empty() {
        sanitize(raw)
    } else {
        token
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '-' })
        .collect()
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkItemId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkItemId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for WorkItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for WorkItemId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkItemId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for WorkItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
