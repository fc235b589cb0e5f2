//! Report assembly across datasets.
//!
//! Per-dataset outcomes may arrive in any order; the report always follows
//! the configured dataset order and has exactly one entry per configured
//! dataset.

use crate::error::LoadError;
use crate::models::{
    DatasetError, DatasetReport, DatasetStatus, DatasetSummary, LoadWarning, MemoryBankStats,
    Report, ReportMetadata, RunInfo, TaskView, WarningKind,
};
use chrono::Utc;
use std::collections::HashMap;

/// Aggregated and joined data of a successfully loaded dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetParts {
    pub summary: DatasetSummary,
    pub memory_stats: MemoryBankStats,
    pub runs: Vec<RunInfo>,
    /// Warnings raised while loading.
    pub warnings: Vec<LoadWarning>,
    pub tasks: Vec<TaskView>,
}

/// What processing a dataset produced.
pub type DatasetOutcome = Result<DatasetParts, DatasetError>;

impl From<&LoadError> for DatasetError {
    fn from(err: &LoadError) -> Self {
        DatasetError {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Context recorded in the report metadata.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub root: String,
    pub duration_seconds: f64,
}

/// Assemble the report in configured order.
///
/// A configured dataset without an outcome is reported as failed rather
/// than left out.
pub fn assemble(
    order: &[String],
    mut outcomes: HashMap<String, DatasetOutcome>,
    context: ReportContext,
) -> Report {
    let datasets: Vec<DatasetReport> = order
        .iter()
        .map(|name| match outcomes.remove(name) {
            Some(Ok(parts)) => dataset_report(name, parts),
            Some(Err(error)) => DatasetReport::failed(name.as_str(), error),
            None => DatasetReport::failed(
                name.as_str(),
                DatasetError {
                    kind: "missing".to_string(),
                    message: "dataset was not processed".to_string(),
                },
            ),
        })
        .collect();

    let metadata = ReportMetadata {
        generated_at: Utc::now(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        root: context.root,
        datasets_configured: datasets.len(),
        datasets_failed: datasets.iter().filter(|d| d.is_failed()).count(),
        total_tasks: datasets.iter().map(|d| d.summary.overall.total).sum(),
        duration_seconds: context.duration_seconds,
    };

    Report { metadata, datasets }
}

fn dataset_report(name: &str, parts: DatasetParts) -> DatasetReport {
    let mut warnings = parts.warnings;
    warnings.extend(integrity_warnings(&parts.tasks));

    DatasetReport {
        name: name.to_string(),
        status: DatasetStatus::Ok,
        error: None,
        summary: parts.summary,
        memory_stats: parts.memory_stats,
        runs: parts.runs,
        warnings,
        tasks: parts.tasks,
    }
}

/// One warning per retrieval reference that did not resolve.
pub fn integrity_warnings(tasks: &[TaskView]) -> Vec<LoadWarning> {
    tasks
        .iter()
        .flat_map(|view| {
            view.unresolved().map(move |reference| {
                LoadWarning::new(
                    WarningKind::UnresolvedReference,
                    format!(
                        "task '{}' references unknown memory '{}'",
                        view.task.task_id, reference.memory_id
                    ),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{join, summarize, DEFAULT_ZERO_STEP_POLICY};
    use crate::models::{MemoryBank, MemoryRef, TaskResult};
    use std::path::PathBuf;

    fn context() -> ReportContext {
        ReportContext {
            root: "mem_banks".to_string(),
            duration_seconds: 0.5,
        }
    }

    fn task(id: &str, success: bool, steps: u32, refs: &[&str]) -> TaskResult {
        TaskResult {
            task_id: id.to_string(),
            task_type: Some("pick".to_string()),
            success,
            steps: Some(steps),
            goal: None,
            score: None,
            trajectory: Vec::new(),
            used_memories: refs
                .iter()
                .map(|r| MemoryRef {
                    memory_id: r.to_string(),
                    query: None,
                    similarity: None,
                })
                .collect(),
        }
    }

    fn parts(results: &[TaskResult]) -> DatasetParts {
        let bank = MemoryBank::default();
        DatasetParts {
            summary: summarize(results, DEFAULT_ZERO_STEP_POLICY),
            tasks: join(results, &bank),
            ..DatasetParts::default()
        }
    }

    #[test]
    fn test_one_dataset_fails() {
        let order = vec!["alfworld".to_string(), "scienceworld".to_string()];
        let load_error = LoadError::Layout {
            dir: PathBuf::from("mem_banks/scienceworld"),
            reason: "no memory bank file (*.jsonl)".to_string(),
        };

        let mut outcomes = HashMap::new();
        outcomes.insert("scienceworld".to_string(), Err(DatasetError::from(&load_error)));
        outcomes.insert(
            "alfworld".to_string(),
            Ok(parts(&[task("a", true, 3, &[]), task("b", false, 5, &[])])),
        );

        let report = assemble(&order, outcomes, context());
        let names: Vec<_> = report.datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alfworld", "scienceworld"]);

        let alfworld = &report.datasets[0];
        assert_eq!(alfworld.status, DatasetStatus::Ok);
        assert_eq!(alfworld.summary.overall.success_rate, Some(0.5));
        assert_eq!(alfworld.summary.overall.mean_steps, Some(4.0));
        assert_eq!(alfworld.tasks.len(), 2);

        let scienceworld = &report.datasets[1];
        assert_eq!(scienceworld.status, DatasetStatus::Failed);
        let error = scienceworld.error.as_ref().unwrap();
        assert_eq!(error.kind, "layout");
        assert!(error.message.contains("no memory bank"));
        assert_eq!(scienceworld.summary, DatasetSummary::default());

        assert_eq!(report.metadata.datasets_configured, 2);
        assert_eq!(report.metadata.datasets_failed, 1);
        assert_eq!(report.metadata.total_tasks, 2);
    }

    #[test]
    fn test_order_follows_configuration() {
        let order: Vec<String> = ["webshop", "alfworld", "babyai"].iter().map(|s| s.to_string()).collect();
        let mut outcomes = HashMap::new();
        for name in ["babyai", "alfworld", "webshop"] {
            outcomes.insert(name.to_string(), Ok(parts(&[])));
        }

        let report = assemble(&order, outcomes, context());
        let names: Vec<_> = report.datasets.iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, order);
    }

    #[test]
    fn test_missing_outcome_is_marked_failed() {
        let order = vec!["alfworld".to_string()];
        let report = assemble(&order, HashMap::new(), context());

        assert_eq!(report.datasets.len(), 1);
        assert!(report.datasets[0].is_failed());
        assert_eq!(report.datasets[0].error.as_ref().unwrap().kind, "missing");
    }

    #[test]
    fn test_unresolved_references_become_warnings() {
        let order = vec!["alfworld".to_string()];
        let mut outcomes = HashMap::new();
        outcomes.insert(
            "alfworld".to_string(),
            Ok(parts(&[task("a", true, 3, &["m-404"])])),
        );

        let report = assemble(&order, outcomes, context());
        let warnings = &report.datasets[0].warnings;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnresolvedReference);
        assert!(warnings[0].message.contains("m-404"));
    }

    #[test]
    fn test_report_serializes_without_cycles() {
        let order = vec!["alfworld".to_string()];
        let mut outcomes = HashMap::new();
        outcomes.insert("alfworld".to_string(), Ok(parts(&[task("a", true, 3, &["m-1"])])));

        let report = assemble(&order, outcomes, context());
        let value = serde_json::to_value(&report).unwrap();
        let task = &value["datasets"][0]["tasks"][0];
        assert_eq!(task["task"]["task_id"], "a");
        assert_eq!(task["retrieved"][0]["resolution"], "unresolved");
        assert_eq!(task["retrieved"][0]["reference"]["memory_id"], "m-1");
    }
}
