// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Queue planning: apply resume options to the input list.

use std::collections::HashSet;

use dv_core::{ResumeConflict, ResumeOptions, WorkItemId};
use dv_storage::RunState;
use serde::Serialize;

/// The effective queue for a run plus what was filtered out and why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueuePlan {
    /// Ids to attempt, in dispatch order.
    pub queue: Vec<WorkItemId>,
    /// Dropped because they already completed (auto-resume).
    pub skipped_completed: Vec<WorkItemId>,
    /// Dropped because they previously failed (skip-failed).
    pub skipped_failed: Vec<WorkItemId>,
    /// Queued ids that are currently in the failed set.
    pub requeued_failed: Vec<WorkItemId>,
    /// Repeated input ids collapsed onto their first occurrence.
    pub duplicates: usize,
}

impl QueuePlan {
    pub fn skipped(&self) -> usize {
        self.skipped_completed.len() + self.skipped_failed.len()
    }
}

/// Compute the effective queue.
///
/// Precedence: `resume_failed` replaces the input with the failed set (file
/// order). Otherwise `auto_resume` drops completed ids; failed ids are
/// re-queued under `auto_resume` unless `skip_failed` is set and the
/// conflict policy is [`ResumeConflict::Skip`]; `skip_failed` alone drops
/// them. Duplicate input ids keep their first position.
pub fn plan(items: &[WorkItemId], state: &RunState, options: &ResumeOptions) -> QueuePlan {
    let mut plan = QueuePlan::default();

    if options.resume_failed {
        plan.queue = state.failed.iter().cloned().collect();
        plan.requeued_failed = plan.queue.clone();
        return plan;
    }

    let retry_wins = options.auto_resume && options.conflict == ResumeConflict::Retry;
    let drop_failed = options.skip_failed && !retry_wins;

    let mut seen: HashSet<&WorkItemId> = HashSet::with_capacity(items.len());
    for id in items {
        if !seen.insert(id) {
            plan.duplicates += 1;
            continue;
        }
        if options.auto_resume && state.is_completed(id) {
            plan.skipped_completed.push(id.clone());
            continue;
        }
        if state.is_failed(id) {
            if drop_failed {
                plan.skipped_failed.push(id.clone());
                continue;
            }
            plan.requeued_failed.push(id.clone());
        }
        plan.queue.push(id.clone());
    }
    plan
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
