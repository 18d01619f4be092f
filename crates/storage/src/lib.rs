// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dv-storage: Durable run state, result artifacts, and consolidation

mod artifact;
mod consolidate;
mod state;

pub use artifact::{ArtifactError, ArtifactStore, ArtifactWrite, COMPLETED_AT_COLUMN, ID_COLUMN};
pub use consolidate::{consolidate, ConsolidateError, ConsolidationReport, CONSOLIDATED_FILE};
pub use state::{
    RunState, StateError, StateStore, COMPLETED_FILE, FAILED_FILE, LAST_PROCESSED_FILE, LOCK_FILE,
};
