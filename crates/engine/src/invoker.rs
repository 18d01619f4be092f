// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! The seam between the orchestrator and the external analysis tool.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use dv_core::WorkItemId;
use thiserror::Error;
use tokio::process::Command;

use crate::subprocess::{run_with_timeout, SubprocessError};

/// One attempt at one work item, fully rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub item: WorkItemId,
    /// 1-based worker number.
    pub worker: usize,
    /// 1-based attempt number within the run.
    pub attempt: u32,
    pub program: String,
    pub args: Vec<String>,
    /// Per-attempt scratch directory, removed after the attempt.
    pub scratch: PathBuf,
    /// Where the tool must write its CSV.
    pub output: PathBuf,
    pub timeout: Duration,
}

/// How an invocation ended when the tool could be launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeOutcome {
    Exited { code: Option<i32>, stdout: String, stderr: String },
    TimedOut { timeout: Duration },
}

#[derive(Debug, Error)]
pub enum InvokeError {
    /// The program cannot be launched at all. Fatal to the run.
    #[error("cannot launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(SubprocessError),

    #[error("invocation I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InvokeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }
}

/// Runs the external tool for one attempt.
#[async_trait]
pub trait Invoker: Clone + Send + Sync + 'static {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvokeOutcome, InvokeError>;
}

/// Invokes the real executable as a child process (no shell).
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandInvoker;

#[async_trait]
impl Invoker for CommandInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvokeOutcome, InvokeError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        let label = format!("{} [{}]", invocation.program, invocation.item);
        match run_with_timeout(cmd, invocation.timeout, &label).await {
            Ok(output) => Ok(InvokeOutcome::Exited {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Err(SubprocessError::Timeout { timeout, .. }) => Ok(InvokeOutcome::TimedOut { timeout }),
            Err(e) if e.is_launch_failure() => match e {
                SubprocessError::Spawn { source, .. } => {
                    Err(InvokeError::Launch { program: invocation.program.clone(), source })
                }
                other => Err(InvokeError::Process(other)),
            },
            Err(e) => Err(InvokeError::Process(e)),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{InvokeError, InvokeOutcome, Invocation, Invoker};
    use async_trait::async_trait;
    use dv_core::WorkItemId;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;

    /// CSV written by [`FakeStep::Succeed`] when no script is given.
    pub const DEFAULT_FAKE_CSV: &str = "metric,value\nloc,1\n";

    /// Scripted behavior for one attempt.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum FakeStep {
        /// Write the CSV to the output path and exit 0.
        Succeed(String),
        /// Exit with the code, writing nothing.
        Exit(i32),
        Timeout,
        /// Exit 0 without writing output.
        NoOutput,
        /// Fail as if the program did not exist.
        LaunchError,
    }

    impl FakeStep {
        pub fn ok() -> Self {
            Self::Succeed(DEFAULT_FAKE_CSV.to_string())
        }
    }

    /// Recorded invocation
    #[derive(Debug, Clone)]
    pub struct InvokeCall {
        pub item: WorkItemId,
        pub worker: usize,
        pub attempt: u32,
        pub args: Vec<String>,
    }

    #[derive(Default)]
    struct FakeInvokerState {
        scripts: HashMap<String, Vec<FakeStep>>,
        seen: HashMap<String, usize>,
        calls: Vec<InvokeCall>,
        in_flight: HashSet<String>,
        overlaps: usize,
        max_in_flight: usize,
    }

    /// Fake invoker scripted per item.
    ///
    /// The n-th invocation of an item plays the n-th step of its script; the
    /// last step repeats. Unscripted items succeed with [`DEFAULT_FAKE_CSV`].
    #[derive(Clone, Default)]
    pub struct FakeInvoker {
        inner: Arc<Mutex<FakeInvokerState>>,
        delay: Duration,
    }

    impl FakeInvoker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Hold every invocation for `delay` before acting.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn script(self, item: &str, steps: Vec<FakeStep>) -> Self {
            self.inner.lock().scripts.insert(item.to_string(), steps);
            self
        }

        pub fn calls(&self) -> Vec<InvokeCall> {
            self.inner.lock().calls.clone()
        }

        /// Items invoked, in call order.
        pub fn invoked_items(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|c| c.item.to_string()).collect()
        }

        /// Times an item was invoked while a previous invocation of the same
        /// item was still running.
        pub fn overlaps(&self) -> usize {
            self.inner.lock().overlaps
        }

        pub fn max_in_flight(&self) -> usize {
            self.inner.lock().max_in_flight
        }

        fn begin(&self, invocation: &Invocation) -> FakeStep {
            let mut state = self.inner.lock();
            let key = invocation.item.to_string();
            let n = {
                let seen = state.seen.entry(key.clone()).or_insert(0);
                *seen += 1;
                *seen - 1
            };
            let step = match state.scripts.get(&key) {
                Some(steps) if !steps.is_empty() => steps[n.min(steps.len() - 1)].clone(),
                _ => FakeStep::ok(),
            };
            if !state.in_flight.insert(key) {
                state.overlaps += 1;
            }
            state.max_in_flight = state.max_in_flight.max(state.in_flight.len());
            state.calls.push(InvokeCall {
                item: invocation.item.clone(),
                worker: invocation.worker,
                attempt: invocation.attempt,
                args: invocation.args.clone(),
            });
            step
        }

        fn end(&self, invocation: &Invocation) {
            self.inner.lock().in_flight.remove(invocation.item.as_str());
        }
    }

    #[async_trait]
    impl Invoker for FakeInvoker {
        async fn invoke(&self, invocation: &Invocation) -> Result<InvokeOutcome, InvokeError> {
            let step = self.begin(invocation);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.end(invocation);

            let exited = |code| InvokeOutcome::Exited {
                code: Some(code),
                stdout: String::new(),
                stderr: String::new(),
            };
            match step {
                FakeStep::Succeed(csv) => {
                    std::fs::write(&invocation.output, csv)?;
                    Ok(exited(0))
                }
                FakeStep::Exit(code) => Ok(exited(code)),
                FakeStep::Timeout => Ok(InvokeOutcome::TimedOut { timeout: invocation.timeout }),
                FakeStep::NoOutput => Ok(exited(0)),
                FakeStep::LaunchError => Err(InvokeError::Launch {
                    program: invocation.program.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "fake: not found"),
                }),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInvoker, FakeStep, InvokeCall, DEFAULT_FAKE_CSV};

#[cfg(test)]
#[path = "invoker_tests.rs"]
mod tests;
