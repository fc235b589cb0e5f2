//! Dataset file discovery.
//!
//! This module finds the memory-bank file and result files inside a dataset
//! directory, and discovers dataset directories under a root when no
//! explicit dataset list is configured.

use crate::error::LoadError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for file classification.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Substrings marking a `.jsonl` file as a memory bank (e.g. ["mem"]).
    pub memory_markers: Vec<String>,
    /// Substrings marking a `.json` file as a result file (e.g. ["result"]).
    pub result_markers: Vec<String>,
    /// How deep below the root `discover` looks for dataset directories.
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            memory_markers: vec!["mem".to_string()],
            result_markers: vec!["result".to_string()],
            max_depth: 2,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            memory_markers: config.memory_markers.clone(),
            result_markers: config.result_markers.clone(),
            max_depth: config.max_depth,
        }
    }
}

/// Role of a file inside a dataset directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    MemoryBank,
    Results,
}

/// Files making up one dataset.
#[derive(Debug, Clone)]
pub struct DatasetFiles {
    pub memory_bank: PathBuf,
    /// Result files sorted by file name.
    pub results: Vec<PathBuf>,
}

/// Scanner for dataset directories.
pub struct DatasetScanner {
    config: ScanConfig,
}

impl DatasetScanner {
    /// Create a new dataset scanner.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Classify a file by extension and name markers.
    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        if is_hidden(&name) {
            return None;
        }

        let has_marker = |markers: &[String]| {
            markers.iter().any(|m| name.contains(&m.to_lowercase()))
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") if has_marker(self.config.memory_markers.as_slice()) => Some(FileKind::MemoryBank),
            Some("json") if has_marker(self.config.result_markers.as_slice()) => Some(FileKind::Results),
            _ => None,
        }
    }

    /// Locate the memory bank and result files of a dataset directory.
    ///
    /// The directory must hold exactly one memory bank and at least one
    /// result file.
    pub fn locate(&self, dir: &Path) -> std::result::Result<DatasetFiles, LoadError> {
        let layout = |reason: String| LoadError::Layout {
            dir: dir.to_path_buf(),
            reason,
        };

        if !dir.is_dir() {
            return Err(layout("directory does not exist".to_string()));
        }

        let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut banks = Vec::new();
        let mut results = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match self.classify(&path) {
                Some(FileKind::MemoryBank) => banks.push(path),
                Some(FileKind::Results) => results.push(path),
                None => {}
            }
        }

        banks.sort();
        results.sort();

        let memory_bank = match banks.len() {
            0 => return Err(layout("no memory bank file (*.jsonl)".to_string())),
            1 => banks.remove(0),
            n => {
                let names: Vec<_> = banks.iter().map(|p| file_name(p)).collect();
                return Err(layout(format!(
                    "expected one memory bank file, found {}: {}",
                    n,
                    names.join(", ")
                )));
            }
        };

        if results.is_empty() {
            return Err(layout("no result file (*.json)".to_string()));
        }

        debug!(
            "Dataset {}: memory bank {}, {} result file(s)",
            dir.display(),
            file_name(&memory_bank),
            results.len()
        );

        Ok(DatasetFiles {
            memory_bank,
            results,
        })
    }

    /// Discover dataset directories below `root`.
    ///
    /// Returns root-relative names (`alfworld`, `alfworld/qwen-7b`) of every
    /// directory that directly contains a memory bank or result file, sorted
    /// so repeated runs see the same order. A directory holding only one of
    /// the two kinds is still returned, so `locate` reports it as a layout
    /// failure instead of it vanishing from the report.
    pub fn discover(&self, root: &Path) -> Result<Vec<String>> {
        let mut found = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.config.max_depth)
            .into_iter()
            .filter_entry(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| !is_hidden(name))
                    .unwrap_or(false)
            });

        for entry in walker {
            let entry =
                entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !entry.file_type().is_dir() || !self.contains_dataset_files(entry.path()) {
                continue;
            }

            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            found.push(name);
        }

        found.sort();
        Ok(found)
    }

    fn contains_dataset_files(&self, dir: &Path) -> bool {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .flatten()
                .any(|e| e.path().is_file() && self.classify(&e.path()).is_some()),
            Err(e) => {
                debug!("Cannot read directory {}: {}", dir.display(), e);
                false
            }
        }
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
