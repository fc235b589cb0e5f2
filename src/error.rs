//! Dataset load errors.
//!
//! Every variant here fails a single dataset. Batch-level problems (missing
//! root directory, unreadable config) are reported through `anyhow` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a dataset could not be loaded.
#[derive(Error, Debug)]
pub enum LoadError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A result file is not valid JSON.
    #[error("malformed JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required field has no known name in a record.
    #[error(
        "unrecognized schema in {}{}: no known field for '{field}'",
        .path.display(),
        .record.map(|r| format!(" (record {r})")).unwrap_or_default()
    )]
    Schema {
        path: PathBuf,
        /// Index into the `results` array; `None` for document-level fields.
        record: Option<usize>,
        field: &'static str,
    },

    /// The dataset directory does not have the expected files.
    #[error("invalid dataset layout in {}: {reason}", .dir.display())]
    Layout { dir: PathBuf, reason: String },
}

impl LoadError {
    /// Short machine-readable kind, used in the report's error marker.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Io { .. } => "io",
            LoadError::Parse { .. } => "parse",
            LoadError::Schema { .. } => "schema",
            LoadError::Layout { .. } => "layout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_message() {
        let err = LoadError::Schema {
            path: PathBuf::from("run_results.json"),
            record: Some(3),
            field: "success",
        };
        let msg = err.to_string();
        assert!(msg.contains("unrecognized schema"));
        assert!(msg.contains("run_results.json"));
        assert!(msg.contains("record 3"));
        assert!(msg.contains("success"));
        assert_eq!(err.kind(), "schema");
    }

    #[test]
    fn test_document_level_schema_error() {
        let err = LoadError::Schema {
            path: PathBuf::from("results.json"),
            record: None,
            field: "results",
        };
        assert!(!err.to_string().contains("record"));
        assert!(err.to_string().contains("'results'"));
    }

    #[test]
    fn test_layout_error_kind() {
        let err = LoadError::Layout {
            dir: PathBuf::from("data/alfworld"),
            reason: "no memory bank file".to_string(),
        };
        assert_eq!(err.kind(), "layout");
        assert!(err.to_string().contains("no memory bank file"));
    }
}
