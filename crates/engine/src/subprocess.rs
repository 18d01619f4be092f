// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Bounded subprocess execution.

use std::process::{Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label}: failed to spawn: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{label}: timed out after {}s", timeout.as_secs())]
    Timeout { label: String, timeout: Duration },

    #[error("{label}: failed to collect output: {source}")]
    Wait {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

impl SubprocessError {
    /// Spawn failures that no retry can fix: the program is missing or not
    /// executable.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::Spawn { source, .. }
                if matches!(
                    source.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
                )
        )
    }
}

/// Run `cmd` to completion, capturing stdout and stderr, killing it if it
/// outlives `timeout`.
///
/// The child is spawned with `kill_on_drop`, so dropping the wait future on
/// timeout terminates the process.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SubprocessError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    let child =
        cmd.spawn().map_err(|source| SubprocessError::Spawn { label: label.to_string(), source })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Wait { label: label.to_string(), source }),
        Err(_) => {
            tracing::warn!(label, timeout_secs = timeout.as_secs(), "subprocess timed out; killed");
            Err(SubprocessError::Timeout { label: label.to_string(), timeout })
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
