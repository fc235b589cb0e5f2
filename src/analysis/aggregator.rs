//! Task statistics.
//!
//! This module computes the global and per-task-type summary of a dataset
//! and the reference statistics of its memory bank.

use crate::models::{
    ratio, DatasetSummary, MemoryBank, MemoryBankStats, Metrics, TaskResult, TaskTypeSummary,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// How tasks with an explicit step count of zero enter the mean-step
/// denominator. Tasks with no recorded steps at all are always left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroStepPolicy {
    /// Zero-step tasks count as real zero values.
    #[default]
    Include,
    /// Zero-step tasks are treated as missing data.
    Exclude,
}

pub const DEFAULT_ZERO_STEP_POLICY: ZeroStepPolicy = ZeroStepPolicy::Include;

/// Step value a task contributes to the mean, if any.
pub fn counted_steps(result: &TaskResult, policy: ZeroStepPolicy) -> Option<u32> {
    match (result.steps, policy) {
        (Some(0), ZeroStepPolicy::Exclude) => None,
        (steps, _) => steps,
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    total: usize,
    successes: usize,
    step_sum: u64,
    step_count: u64,
    score_sum: f64,
    score_count: usize,
}

impl Accumulator {
    fn add(&mut self, result: &TaskResult, policy: ZeroStepPolicy) {
        self.total += 1;
        if result.success {
            self.successes += 1;
        }
        if let Some(steps) = counted_steps(result, policy) {
            self.step_sum += u64::from(steps);
            self.step_count += 1;
        }
        if let Some(score) = result.score {
            self.score_sum += score;
            self.score_count += 1;
        }
    }

    fn finish(&self) -> Metrics {
        Metrics {
            total: self.total,
            successes: self.successes,
            success_rate: ratio(self.successes as u64, self.total as u64),
            mean_steps: ratio(self.step_sum, self.step_count),
            mean_score: if self.score_count == 0 {
                None
            } else {
                Some(self.score_sum / self.score_count as f64)
            },
        }
    }
}

/// Summarize a dataset's task results in a single pass.
///
/// Groups are ordered by descending size, ties broken by label, so the same
/// input always yields the same output.
pub fn summarize(results: &[TaskResult], policy: ZeroStepPolicy) -> DatasetSummary {
    let mut overall = Accumulator::default();
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for result in results {
        overall.add(result, policy);
        groups
            .entry(result.task_type_label())
            .or_default()
            .add(result, policy);
    }

    let mut by_task_type: Vec<TaskTypeSummary> = groups
        .into_iter()
        .map(|(label, acc)| TaskTypeSummary {
            label: label.to_string(),
            metrics: acc.finish(),
        })
        .collect();
    // Stable sort over label-ordered input keeps ties lexicographic.
    by_task_type.sort_by_key(|g| Reverse(g.metrics.total));

    DatasetSummary {
        overall: overall.finish(),
        by_task_type,
    }
}

/// Reference statistics over every insight in the memory bank.
pub fn memory_bank_stats(bank: &MemoryBank) -> MemoryBankStats {
    let insights = bank.items().iter().flat_map(|m| &m.insights);

    let mut stats = MemoryBankStats {
        entries: bank.len(),
        ..MemoryBankStats::default()
    };
    for insight in insights {
        stats.insights += 1;
        stats.total_references += insight.reference_count;
        stats.referenced_successes += insight.reference_success_count;
    }
    stats.reference_success_rate = ratio(stats.referenced_successes, stats.total_references);

    stats
}
