// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! The batch orchestrator: plan the queue, fan attempts out over a fixed
//! worker pool, retry failures in passes, and optionally consolidate.
//!
//! Dispatch is index-based: every worker claims the next slot of a shared
//! `Arc<Vec<WorkItemId>>` through an atomic counter, so each id in a pass is
//! attempted by exactly one worker. Reports flow back to the coordinator
//! over an mpsc channel. A fatal launch error cancels further dispatch;
//! attempts already in flight finish and are recorded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dv_core::template::vars;
use dv_core::{ConfigError, RunConfig, WorkItemId};
use dv_storage::{
    consolidate, ArtifactStore, ConsolidateError, RunState, StateError, StateStore,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{spawn_blocking, JoinError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::invoker::{InvokeError, InvokeOutcome, Invocation, Invoker};
use crate::queue::{self, QueuePlan};
use crate::summary::RunSummary;
use crate::worker_logger::WorkerLogger;

/// File the tool writes inside its scratch directory (`${output}`).
pub const TOOL_OUTPUT_FILE: &str = "output.csv";
/// Single-id list handed to the tool (`${item_list}`).
pub const ITEM_LIST_FILE: &str = "items.txt";

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create {what} directory {path}: {source}")]
    CreateDir {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    State(#[from] StateError),

    /// The tool cannot be launched; the run was aborted.
    #[error(transparent)]
    Launch(InvokeError),

    #[error(transparent)]
    Consolidate(#[from] ConsolidateError),

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Exit(Option<i32>),
    Timeout(Duration),
    /// Exit 0 but no usable output, or the artifact could not be written.
    Output(String),
    /// The process could not be run or waited on (not a launch failure).
    Invoke(String),
    Scratch(String),
    State(String),
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exit(Some(code)) => write!(f, "exited with code {code}"),
            Self::Exit(None) => write!(f, "killed by signal"),
            Self::Timeout(t) => write!(f, "timed out after {}s", t.as_secs()),
            Self::Output(msg) => write!(f, "bad output: {msg}"),
            Self::Invoke(msg) => write!(f, "invocation failed: {msg}"),
            Self::Scratch(msg) => write!(f, "scratch setup failed: {msg}"),
            Self::State(msg) => write!(f, "state update failed: {msg}"),
        }
    }
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Succeeded { rows: usize },
    Failed(Failure),
    Fatal(InvokeError),
}

#[derive(Debug)]
pub struct AttemptReport {
    pub item: WorkItemId,
    pub worker: usize,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

struct Shared<I> {
    config: RunConfig,
    invoker: I,
    state: StateStore,
    artifacts: ArtifactStore,
    logger: WorkerLogger,
}

#[derive(Default)]
struct PassResult {
    attempts: u32,
    succeeded: Vec<WorkItemId>,
    failed: Vec<WorkItemId>,
    fatal: Option<InvokeError>,
}

/// Runs a batch with a given invoker.
pub struct Orchestrator<I: Invoker> {
    config: RunConfig,
    invoker: I,
}

impl<I: Invoker> Orchestrator<I> {
    pub fn new(config: RunConfig, invoker: I) -> Self {
        Self { config, invoker }
    }

    /// Process `items` according to the configuration.
    pub async fn run(&self, items: &[WorkItemId]) -> Result<RunSummary, RunError> {
        self.config.validate()?;
        let started = Instant::now();
        if self.config.dry_run {
            return self.dry_run(items, started);
        }

        let dirs = &self.config.dirs;
        for (what, path) in [("results", &dirs.results), ("logs", &dirs.logs), ("tmp", &dirs.tmp)] {
            std::fs::create_dir_all(path)
                .map_err(|source| RunError::CreateDir { what, path: path.clone(), source })?;
        }

        let state_dir = dirs.state.clone();
        let state = spawn_blocking(move || StateStore::open(&state_dir)).await??;
        if self.config.resume.fresh {
            info!(dir = %dirs.state.display(), "fresh run: clearing completed and failed sets");
            with_state(&state, |s| s.reset()).await??;
        }

        let plan = queue::plan(items, &state.snapshot(), &self.config.resume);
        log_plan(&plan, items.len());
        if self.config.resume.auto_resume && !plan.requeued_failed.is_empty() {
            let requeued = plan.requeued_failed.clone();
            with_state(&state, move |s| s.clear_failed(&requeued)).await??;
        }

        let mut summary = summary_for(&plan, items.len());
        let shared = Arc::new(Shared {
            config: self.config.clone(),
            invoker: self.invoker.clone(),
            state,
            artifacts: ArtifactStore::new(&dirs.results, self.config.layout),
            logger: WorkerLogger::new(dirs.logs.clone()),
        });

        let retry = self.config.retry;
        let mut pending = plan.queue;
        let mut attempt = 1;
        while !pending.is_empty() {
            if attempt > 1 {
                let delay = retry.delay_before(attempt - 1);
                info!(attempt, items = pending.len(), delay_ms = delay.as_millis() as u64, "retry pass");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let pass = run_pass(&shared, pending, attempt).await?;
            summary.passes += 1;
            summary.attempts += pass.attempts;
            summary.succeeded.extend(pass.succeeded);
            if let Some(err) = pass.fatal {
                error!(
                    error = %err,
                    succeeded = summary.succeeded.len(),
                    "cannot launch the tool; aborting run"
                );
                return Err(RunError::Launch(err));
            }
            if pass.failed.is_empty() || !retry.should_retry(attempt) {
                summary.failed = pass.failed;
                break;
            }
            pending = pass.failed;
            attempt += 1;
        }

        if self.config.consolidate {
            let report = consolidate(&dirs.results, &dirs.output, &shared.state.snapshot())?;
            summary.consolidation = Some(report);
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            succeeded = summary.succeeded.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped(),
            attempts = summary.attempts,
            "run finished"
        );
        Ok(summary)
    }

    /// Plan against a read-only view of the state and render the commands
    /// that would run. Creates no directories and writes nothing.
    fn dry_run(&self, items: &[WorkItemId], started: Instant) -> Result<RunSummary, RunError> {
        if self.config.resume.fresh {
            warn!("fresh is ignored in a dry run");
        }
        let state = RunState::load(&self.config.dirs.state)?;
        let plan = queue::plan(items, &state, &self.config.resume);
        log_plan(&plan, items.len());

        let mut summary = summary_for(&plan, items.len());
        summary.dry_run = true;
        summary.planned = plan
            .queue
            .iter()
            .map(|item| {
                let token = item.token();
                let scratch = self.config.dirs.tmp.join(format!("{token}-XXXXXX"));
                let vars = attempt_vars(&self.config, item, &token, &scratch, 1);
                self.config.command.render_display(&vars)
            })
            .collect();
        for line in &summary.planned {
            info!(command = %line, "would run");
        }
        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(summary)
    }
}

fn summary_for(plan: &QueuePlan, input: usize) -> RunSummary {
    RunSummary {
        input,
        queued: plan.queue.len(),
        skipped_completed: plan.skipped_completed.len(),
        skipped_failed: plan.skipped_failed.len(),
        duplicates: plan.duplicates,
        ..RunSummary::default()
    }
}

fn log_plan(plan: &QueuePlan, input: usize) {
    info!(
        input,
        queued = plan.queue.len(),
        skipped_completed = plan.skipped_completed.len(),
        skipped_failed = plan.skipped_failed.len(),
        requeued_failed = plan.requeued_failed.len(),
        duplicates = plan.duplicates,
        "queue planned"
    );
}

/// Template variables for one attempt.
pub fn attempt_vars(
    config: &RunConfig,
    item: &WorkItemId,
    token: &str,
    scratch: &Path,
    attempt: u32,
) -> HashMap<String, String> {
    let path = |p: &Path| p.display().to_string();
    HashMap::from([
        (vars::ITEM.to_string(), item.to_string()),
        (vars::TOKEN.to_string(), token.to_string()),
        (vars::OUTPUT.to_string(), path(&scratch.join(TOOL_OUTPUT_FILE))),
        (vars::ITEM_LIST.to_string(), path(&scratch.join(ITEM_LIST_FILE))),
        (vars::SCRATCH.to_string(), path(scratch)),
        (vars::RESULTS_DIR.to_string(), path(&config.dirs.results)),
        (vars::ATTEMPT.to_string(), attempt.to_string()),
    ])
}

async fn run_pass<I: Invoker>(
    shared: &Arc<Shared<I>>,
    items: Vec<WorkItemId>,
    attempt: u32,
) -> Result<PassResult, RunError> {
    let items = Arc::new(items);
    let next = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    let workers = shared.config.max_workers.min(items.len()).max(1);
    let (tx, mut rx) = mpsc::channel::<(usize, AttemptReport)>(workers * 2);

    debug!(attempt, workers, items = items.len(), "starting pass");
    let mut handles = Vec::with_capacity(workers);
    for worker in 1..=workers {
        let shared = Arc::clone(shared);
        let items = Arc::clone(&items);
        let next = Arc::clone(&next);
        let cancel = cancel.clone();
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            while !cancel.is_cancelled() {
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items.get(index) else { break };
                let report = run_attempt(&shared, worker, item, attempt).await;
                if matches!(report.outcome, AttemptOutcome::Fatal(_)) {
                    cancel.cancel();
                }
                if tx.send((index, report)).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let mut reports: Vec<Option<AttemptReport>> = (0..items.len()).map(|_| None).collect();
    while let Some((index, report)) = rx.recv().await {
        if let Some(slot) = reports.get_mut(index) {
            *slot = Some(report);
        }
    }
    for handle in handles {
        handle.await?;
    }

    // Queue order, independent of completion order
    let mut result = PassResult::default();
    for report in reports.into_iter().flatten() {
        result.attempts += 1;
        match report.outcome {
            AttemptOutcome::Succeeded { .. } => result.succeeded.push(report.item),
            AttemptOutcome::Failed(_) => result.failed.push(report.item),
            AttemptOutcome::Fatal(err) => {
                if result.fatal.is_none() {
                    result.fatal = Some(err);
                }
            }
        }
    }
    Ok(result)
}

enum AttemptError {
    Failed(Failure),
    Fatal(InvokeError),
}

/// Run a state mutation on the blocking pool. Mutations wait on the
/// cross-process `state.lock`, which must not stall the async workers.
async fn with_state<T, F>(state: &StateStore, f: F) -> Result<Result<T, StateError>, JoinError>
where
    T: Send + 'static,
    F: FnOnce(&StateStore) -> Result<T, StateError> + Send + 'static,
{
    let state = state.clone();
    spawn_blocking(move || f(&state)).await
}

async fn run_attempt<I: Invoker>(
    shared: &Shared<I>,
    worker: usize,
    item: &WorkItemId,
    attempt: u32,
) -> AttemptReport {
    let started = Instant::now();
    let outcome = match attempt_item(shared, worker, item, attempt).await {
        Ok(rows) => {
            let id = item.clone();
            match with_state(&shared.state, move |s| s.mark_completed(&id)).await {
                Ok(Ok(())) => AttemptOutcome::Succeeded { rows },
                Ok(Err(e)) => AttemptOutcome::Failed(Failure::State(e.to_string())),
                Err(e) => AttemptOutcome::Failed(Failure::State(e.to_string())),
            }
        }
        Err(AttemptError::Failed(failure)) => AttemptOutcome::Failed(failure),
        Err(AttemptError::Fatal(err)) => AttemptOutcome::Fatal(err),
    };
    let elapsed = started.elapsed();

    match &outcome {
        AttemptOutcome::Succeeded { rows } => {
            info!(item = %item, worker, attempt, rows = *rows, "attempt succeeded");
            shared.logger.append(
                worker,
                item,
                &format!("attempt {attempt} succeeded in {}ms ({rows} rows)", elapsed.as_millis()),
            );
        }
        AttemptOutcome::Failed(failure) => {
            warn!(item = %item, worker, attempt, reason = %failure, "attempt failed");
            shared.logger.append(worker, item, &format!("attempt {attempt} failed: {failure}"));
            let id = item.clone();
            match with_state(&shared.state, move |s| s.mark_failed(&id)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(item = %item, error = %e, "failed to record failure"),
                Err(e) => error!(item = %item, error = %e, "failed to record failure"),
            }
        }
        AttemptOutcome::Fatal(err) => {
            error!(item = %item, worker, error = %err, "cannot launch tool");
            shared.logger.append(worker, item, &format!("attempt {attempt} aborted: {err}"));
        }
    }

    AttemptReport { item: item.clone(), worker, attempt, outcome, elapsed }
}

/// One attempt inside its own scratch directory. The directory is removed
/// when this returns, whatever the outcome.
async fn attempt_item<I: Invoker>(
    shared: &Shared<I>,
    worker: usize,
    item: &WorkItemId,
    attempt: u32,
) -> Result<usize, AttemptError> {
    let config = &shared.config;
    let token = item.token();
    let scratch_err = |e: std::io::Error| AttemptError::Failed(Failure::Scratch(e.to_string()));

    let scratch = tempfile::Builder::new()
        .prefix(&format!("{token}-"))
        .tempdir_in(&config.dirs.tmp)
        .map_err(scratch_err)?;
    let vars = attempt_vars(config, item, &token, scratch.path(), attempt);
    std::fs::write(scratch.path().join(ITEM_LIST_FILE), format!("{item}\n")).map_err(scratch_err)?;

    let invocation = Invocation {
        item: item.clone(),
        worker,
        attempt,
        program: config.command.program.clone(),
        args: config.command.render_args(&vars),
        scratch: scratch.path().to_path_buf(),
        output: scratch.path().join(TOOL_OUTPUT_FILE),
        timeout: config.timeout,
    };
    shared.logger.append(
        worker,
        item,
        &format!("attempt {attempt}: {}", config.command.render_display(&vars)),
    );
    debug!(item = %item, worker, attempt, scratch = %scratch.path().display(), "invoking tool");

    match shared.invoker.invoke(&invocation).await {
        Err(e) if e.is_fatal() => Err(AttemptError::Fatal(e)),
        Err(e) => Err(AttemptError::Failed(Failure::Invoke(e.to_string()))),
        Ok(InvokeOutcome::TimedOut { timeout }) => {
            Err(AttemptError::Failed(Failure::Timeout(timeout)))
        }
        Ok(InvokeOutcome::Exited { code, stdout, stderr }) => {
            shared.logger.append_fenced(worker, item, "stdout", &stdout);
            shared.logger.append_fenced(worker, item, "stderr", &stderr);
            if code != Some(0) {
                return Err(AttemptError::Failed(Failure::Exit(code)));
            }
            let write = shared
                .artifacts
                .store(item, worker, &invocation.output)
                .map_err(|e| AttemptError::Failed(Failure::Output(e.to_string())))?;
            Ok(write.rows)
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
