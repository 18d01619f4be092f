// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dv-core: Core types for the drover batch orchestrator

pub mod macros;

pub mod config;
pub mod input;
pub mod item;
pub mod retry;
pub mod template;
pub mod time_fmt;

pub use config::{
    default_workers, ArtifactLayout, ConfigError, ConfigFile, ResumeConflict, ResumeOptions,
    RunConfig, RunDirs, DEFAULT_TIMEOUT,
};
pub use input::{load_work_items, InputError, InputFormat};
pub use item::WorkItemId;
pub use retry::{Backoff, RetryPolicy};
pub use template::{interpolate, CommandTemplate};
pub use time_fmt::{format_duration, format_elapsed, format_utc_now};
