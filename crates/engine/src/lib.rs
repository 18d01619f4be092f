// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dv-engine: Queue planning, worker pool, and tool invocation

pub mod invoker;
pub mod orchestrator;
pub mod queue;
pub mod subprocess;
mod summary;
mod worker_logger;

pub use invoker::{CommandInvoker, InvokeError, InvokeOutcome, Invocation, Invoker};
pub use orchestrator::{Failure, Orchestrator, RunError, ITEM_LIST_FILE, TOOL_OUTPUT_FILE};
pub use queue::{plan, QueuePlan};
pub use summary::RunSummary;
pub use worker_logger::{worker_log_path, WorkerLogger};

#[cfg(any(test, feature = "test-support"))]
pub use invoker::{FakeInvoker, FakeStep, InvokeCall, DEFAULT_FAKE_CSV};
