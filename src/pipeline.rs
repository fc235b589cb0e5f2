//! Batch processing across datasets.
//!
//! Every dataset is loaded, summarized and joined on its own blocking task.
//! A dataset that fails becomes a failed entry in the report; only a
//! missing root or an empty dataset list stops the batch.

use crate::analysis::{join, memory_bank_stats, summarize, ZeroStepPolicy};
use crate::models::{DatasetError, Report};
use crate::report::{assemble, DatasetOutcome, DatasetParts, ReportContext};
use crate::scanner::{DatasetScanner, ScanConfig};
use crate::loader;
use anyhow::{bail, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory holding the dataset directories.
    pub root: PathBuf,
    /// Configured dataset names; empty means discover under the root.
    pub datasets: Vec<String>,
    pub scan: ScanConfig,
    pub zero_step_policy: ZeroStepPolicy,
    /// Draw a progress bar while datasets are processed.
    pub show_progress: bool,
}

/// The ordered dataset list for a run.
///
/// Fails when the root is missing or no dataset is configured or found.
/// Repeated names are collapsed to their first position.
pub fn resolve_datasets(options: &BatchOptions) -> Result<Vec<String>> {
    if !options.root.is_dir() {
        bail!("Root directory not found: {}", options.root.display());
    }

    let names = if options.datasets.is_empty() {
        let scanner = DatasetScanner::new(options.scan.clone());
        let found = scanner.discover(&options.root)?;
        info!("Discovered {} datasets under {}", found.len(), options.root.display());
        found
    } else {
        options.datasets.clone()
    };

    let mut seen = HashSet::new();
    let mut ordered = Vec::with_capacity(names.len());
    for name in names {
        if seen.insert(name.clone()) {
            ordered.push(name);
        } else {
            warn!("Dataset '{}' listed more than once; keeping the first entry", name);
        }
    }

    if ordered.is_empty() {
        bail!("No datasets found under {}", options.root.display());
    }

    Ok(ordered)
}

/// Directory of a dataset entry. Absolute entries are used as given.
pub fn dataset_dir(root: &Path, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Run the whole batch and assemble the report in configured order.
pub async fn run_batch(options: &BatchOptions) -> Result<Report> {
    let start_time = Instant::now();
    let order = resolve_datasets(options)?;

    let progress = if options.show_progress {
        let pb = ProgressBar::new(order.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(Arc::new(pb))
    } else {
        None
    };

    let scanner = Arc::new(DatasetScanner::new(options.scan.clone()));
    let tasks = order.iter().map(|name| {
        let name = name.clone();
        let dir = dataset_dir(&options.root, &name);
        let scanner = Arc::clone(&scanner);
        let policy = options.zero_step_policy;
        let progress = progress.clone();

        async move {
            let handle = tokio::task::spawn_blocking({
                let name = name.clone();
                move || process_dataset(&name, &dir, &scanner, policy)
            });
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(DatasetError {
                    kind: "internal".to_string(),
                    message: format!("dataset task did not complete: {}", e),
                }),
            };
            if let Some(ref pb) = progress {
                pb.set_message(name.clone());
                pb.inc(1);
            }
            (name, outcome)
        }
    });

    let outcomes: HashMap<String, DatasetOutcome> = join_all(tasks).await.into_iter().collect();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let context = ReportContext {
        root: options.root.display().to_string(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    Ok(assemble(&order, outcomes, context))
}

/// Load, summarize and join one dataset.
pub fn process_dataset(
    name: &str,
    dir: &Path,
    scanner: &DatasetScanner,
    policy: ZeroStepPolicy,
) -> DatasetOutcome {
    debug!("Processing dataset {} at {}", name, dir.display());

    let loaded = loader::load_dataset(dir, scanner).map_err(|e| {
        warn!("Dataset {} failed: {}", name, e);
        DatasetError::from(&e)
    })?;

    let summary = summarize(&loaded.results, policy);
    let memory_stats = memory_bank_stats(&loaded.bank);
    let tasks = join(&loaded.results, &loaded.bank);

    info!(
        "Dataset {}: {} tasks, {} memories, {} warnings",
        name,
        summary.overall.total,
        memory_stats.entries,
        loaded.warnings.len()
    );

    Ok(DatasetParts {
        summary,
        memory_stats,
        runs: loaded.runs,
        warnings: loaded.warnings,
        tasks,
    })
}
