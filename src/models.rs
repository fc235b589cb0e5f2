//! Data models for the memory report.
//!
//! This module contains the canonical in-memory shapes produced by the
//! loader and the serializable report model handed to the renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Label used for tasks that carry no task-type label.
pub const UNCLASSIFIED: &str = "unclassified";

/// One step of a task trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Action issued by the agent.
    pub action: String,
    /// Observation returned by the environment.
    pub observation: String,
    /// Optional reasoning text preceding the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A single insight stored inside a memory item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub description: String,
    pub content: String,
    /// How many tasks retrieved this insight.
    pub reference_count: u64,
    /// How many of those tasks succeeded.
    pub reference_success_count: u64,
}

impl Insight {
    /// Success rate of the tasks that referenced this insight.
    pub fn reference_success_rate(&self) -> Option<f64> {
        ratio(self.reference_success_count, self.reference_count)
    }
}

/// A memory-bank entry extracted from one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Identifier used by retrieval references.
    pub memory_id: String,
    /// Task this memory was extracted from.
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    /// Query the memory was indexed under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Whether the producing task succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_success: Option<bool>,
    /// The extracted knowledge.
    pub insights: Vec<Insight>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trajectory: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A record naming a memory item consulted while running a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRef {
    /// Raw identifier as written in the result file.
    pub memory_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// Outcome of one task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub success: bool,
    /// Step count; `None` when the task has no recorded steps at all.
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    pub trajectory: Vec<Step>,
    pub used_memories: Vec<MemoryRef>,
}

impl TaskResult {
    /// Task-type label used for grouping.
    pub fn task_type_label(&self) -> &str {
        match self.task_type.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => UNCLASSIFIED,
        }
    }
}

/// Memory items of one dataset, indexed for lookup.
#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    items: Vec<MemoryItem>,
    by_id: HashMap<String, usize>,
}

impl MemoryBank {
    /// Build a bank from items with unique memory identifiers.
    pub fn new(items: Vec<MemoryItem>) -> Self {
        let by_id = items
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.memory_id.clone(), idx))
            .collect();
        Self { items, by_id }
    }

    pub fn get(&self, memory_id: &str) -> Option<&MemoryItem> {
        self.by_id.get(memory_id).map(|&idx| &self.items[idx])
    }

    /// Items extracted from the given task, in bank order.
    pub fn extracted_from<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a MemoryItem> {
        self.items.iter().filter(move |item| item.task_id == task_id)
    }

    pub fn items(&self) -> &[MemoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Run information recorded in one result file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// File name of the result file.
    pub source_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
    /// Task total claimed by the file's own summary block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_total: Option<usize>,
    /// Number of result records in the file.
    pub result_count: usize,
}

/// Kind of a non-fatal data problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MalformedLine,
    DuplicateTask,
    DuplicateMemory,
    UnresolvedReference,
    SummaryMismatch,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MalformedLine => write!(f, "Malformed line"),
            WarningKind::DuplicateTask => write!(f, "Duplicate task"),
            WarningKind::DuplicateMemory => write!(f, "Duplicate memory"),
            WarningKind::UnresolvedReference => write!(f, "Unresolved reference"),
            WarningKind::SummaryMismatch => write!(f, "Summary mismatch"),
        }
    }
}

/// A recovered data problem, kept visible in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl LoadWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Count, success rate, mean steps and mean score over a set of tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: usize,
    pub successes: usize,
    /// `None` when there are no tasks.
    pub success_rate: Option<f64>,
    /// `None` when no task has a counted step value.
    pub mean_steps: Option<f64>,
    /// `None` when no task carries a score.
    pub mean_score: Option<f64>,
}

/// Metrics for one task-type group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTypeSummary {
    pub label: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// Aggregate statistics for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    #[serde(flatten)]
    pub overall: Metrics,
    /// Groups ordered by descending size, then label.
    pub by_task_type: Vec<TaskTypeSummary>,
}

/// Reference statistics for a dataset's memory bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryBankStats {
    pub entries: usize,
    pub insights: usize,
    pub total_references: u64,
    pub referenced_successes: u64,
    pub reference_success_rate: Option<f64>,
}

/// A retrieval reference after lookup in the memory bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum RetrievedMemory {
    /// The referenced item exists; it is copied by value.
    Resolved {
        reference: MemoryRef,
        item: MemoryItem,
    },
    /// No item with this identifier exists in the bank.
    Unresolved { reference: MemoryRef },
}

impl RetrievedMemory {
    pub fn reference(&self) -> &MemoryRef {
        match self {
            RetrievedMemory::Resolved { reference, .. } => reference,
            RetrievedMemory::Unresolved { reference } => reference,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, RetrievedMemory::Resolved { .. })
    }
}

/// A task result joined with its memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub task: TaskResult,
    /// Memories consulted while running this task.
    pub retrieved: Vec<RetrievedMemory>,
    /// Memories extracted from this task.
    pub extracted: Vec<MemoryItem>,
}

impl TaskView {
    /// References that did not resolve to a memory item.
    pub fn unresolved(&self) -> impl Iterator<Item = &MemoryRef> {
        self.retrieved
            .iter()
            .filter(|r| !r.is_resolved())
            .map(RetrievedMemory::reference)
    }
}

/// Load status of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    Ok,
    Failed,
}

/// Error marker attached to a failed dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetError {
    pub kind: String,
    pub message: String,
}

/// Everything the report shows for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub name: String,
    pub status: DatasetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DatasetError>,
    pub summary: DatasetSummary,
    pub memory_stats: MemoryBankStats,
    pub runs: Vec<RunInfo>,
    pub warnings: Vec<LoadWarning>,
    pub tasks: Vec<TaskView>,
}

impl DatasetReport {
    /// Entry for a dataset that could not be loaded.
    pub fn failed(name: impl Into<String>, error: DatasetError) -> Self {
        Self {
            name: name.into(),
            status: DatasetStatus::Failed,
            error: Some(error),
            summary: DatasetSummary::default(),
            memory_stats: MemoryBankStats::default(),
            runs: Vec::new(),
            warnings: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == DatasetStatus::Failed
    }
}

/// Metadata about the report run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    /// Root directory datasets were resolved against.
    pub root: String,
    pub datasets_configured: usize,
    pub datasets_failed: usize,
    pub total_tasks: usize,
    pub duration_seconds: f64,
}

/// The complete report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Datasets in configured order.
    pub datasets: Vec<DatasetReport>,
}

impl Report {
    pub fn failed_datasets(&self) -> impl Iterator<Item = &DatasetReport> {
        self.datasets.iter().filter(|d| d.is_failed())
    }
}

/// `num / den`, or `None` when `den` is zero.
pub fn ratio(num: u64, den: u64) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}
