// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! CLI command implementations

pub mod consolidate;
pub mod run;
pub mod status;
