// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Tracing subscriber setup: stderr plus an optional `run.log` file.

use std::fs::OpenOptions;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const RUN_LOG: &str = "run.log";

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "drover=info,dv_engine=info,dv_storage=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// With a log directory, events are also appended to `<dir>/run.log`
/// through a non-blocking writer; the returned guard must live until the
/// process is about to exit so buffered lines are flushed.
pub fn init(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter());

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir)?;
    let log_file = OpenOptions::new().create(true).append(true).open(dir.join(RUN_LOG))?;
    let (writer, guard) = tracing_appender::non_blocking(log_file);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter());

    tracing_subscriber::registry().with(stderr_layer).with(file_layer).try_init()?;
    Ok(Some(guard))
}
