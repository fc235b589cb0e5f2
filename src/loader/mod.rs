//! Record loading for one dataset directory.
//!
//! Memory-bank lines are parsed independently and a bad line only costs a
//! warning. Result files are parsed whole; any problem there fails the
//! dataset.

pub mod schema;

use crate::error::LoadError;
use crate::models::{LoadWarning, MemoryBank, MemoryItem, RunInfo, TaskResult, WarningKind};
use crate::scanner::DatasetScanner;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Canonical records of one dataset.
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    pub bank: MemoryBank,
    /// Task results with unique ids, in load order.
    pub results: Vec<TaskResult>,
    /// One entry per result file.
    pub runs: Vec<RunInfo>,
    pub warnings: Vec<LoadWarning>,
}

/// Load the memory bank and all result files of a dataset directory.
pub fn load_dataset(dir: &Path, scanner: &DatasetScanner) -> Result<LoadedDataset, LoadError> {
    let files = scanner.locate(dir)?;

    let (bank, mut warnings) = load_memory_bank(&files.memory_bank)?;
    if bank.is_empty() {
        warn!(
            "{}: memory bank {} holds no valid records",
            dir.display(),
            files.memory_bank.display()
        );
    }

    let mut results = Vec::new();
    let mut runs = Vec::new();
    for path in &files.results {
        let (file_results, run) = load_result_file(path)?;
        if let Some(recorded) = run.recorded_total {
            if recorded != run.result_count {
                warnings.push(LoadWarning::new(
                    WarningKind::SummaryMismatch,
                    format!(
                        "{}: summary reports {} tasks but {} results are present",
                        run.source_file, recorded, run.result_count
                    ),
                ));
            }
        }
        results.extend(file_results);
        runs.push(run);
    }

    let (results, duplicate_warnings) = dedupe_results(results);
    warnings.extend(duplicate_warnings);

    for warning in &warnings {
        warn!("{}: {}", dir.display(), warning.message);
    }
    debug!(
        "Loaded {}: {} memories, {} results, {} warning(s)",
        dir.display(),
        bank.len(),
        results.len(),
        warnings.len()
    );

    Ok(LoadedDataset {
        bank,
        results,
        runs,
        warnings,
    })
}

/// Read and parse a memory-bank file.
pub fn load_memory_bank(path: &Path) -> Result<(MemoryBank, Vec<LoadWarning>), LoadError> {
    let content = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_memory_bank(&content))
}

/// Parse newline-delimited memory records.
///
/// Lines are decoded one at a time, so a line cut inside a multi-byte
/// character costs only that line. Malformed lines are skipped with a
/// warning. A repeated memory id keeps the later record in the earlier
/// record's position.
pub fn parse_memory_bank(content: &[u8]) -> (MemoryBank, Vec<LoadWarning>) {
    let mut items: Vec<MemoryItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();

    for (idx, raw) in content.split(|&b| b == b'\n').enumerate() {
        let line_no = idx + 1;
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                warnings.push(LoadWarning::new(
                    WarningKind::MalformedLine,
                    format!("memory bank line {}: invalid UTF-8: {}", line_no, e),
                ));
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warnings.push(LoadWarning::new(
                    WarningKind::MalformedLine,
                    format!("memory bank line {}: {}", line_no, e),
                ));
                continue;
            }
        };

        let item = match schema::normalize_memory(&value) {
            Ok(item) => item,
            Err(field) => {
                warnings.push(LoadWarning::new(
                    WarningKind::MalformedLine,
                    format!(
                        "memory bank line {}: unrecognized schema, no known field for '{}'",
                        line_no, field
                    ),
                ));
                continue;
            }
        };

        match index.get(&item.memory_id) {
            Some(&slot) => {
                warnings.push(LoadWarning::new(
                    WarningKind::DuplicateMemory,
                    format!(
                        "memory bank line {}: duplicate memory id '{}', keeping the later record",
                        line_no, item.memory_id
                    ),
                ));
                items[slot] = item;
            }
            None => {
                index.insert(item.memory_id.clone(), items.len());
                items.push(item);
            }
        }
    }

    (MemoryBank::new(items), warnings)
}

/// Read and parse one result file.
pub fn load_result_file(path: &Path) -> Result<(Vec<TaskResult>, RunInfo), LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_result_document(&content, path)
}

/// Parse a result document with a `summary` object and a `results` array.
pub fn parse_result_document(
    content: &str,
    path: &Path,
) -> Result<(Vec<TaskResult>, RunInfo), LoadError> {
    let doc: Value = serde_json::from_str(content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let schema_error = |record: Option<usize>, field: &'static str| LoadError::Schema {
        path: path.to_path_buf(),
        record,
        field,
    };

    let doc = doc.as_object().ok_or_else(|| schema_error(None, "results"))?;
    let records = doc
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| schema_error(None, "results"))?;

    let results = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            schema::normalize_result(record).map_err(|field| schema_error(Some(idx), field))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let run = schema::read_run_info(doc, &source_file, results.len());

    Ok((results, run))
}

/// Drop repeated task ids, keeping the last-loaded record in the slot of
/// the first occurrence.
pub fn dedupe_results(results: Vec<TaskResult>) -> (Vec<TaskResult>, Vec<LoadWarning>) {
    let mut unique: Vec<TaskResult> = Vec::with_capacity(results.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut warnings = Vec::new();

    for result in results {
        match index.get(&result.task_id) {
            Some(&slot) => {
                warnings.push(LoadWarning::new(
                    WarningKind::DuplicateTask,
                    format!(
                        "duplicate task id '{}', keeping the last-loaded record",
                        result.task_id
                    ),
                ));
                unique[slot] = result;
            }
            None => {
                index.insert(result.task_id.clone(), unique.len());
                unique.push(result);
            }
        }
    }

    (unique, warnings)
}
