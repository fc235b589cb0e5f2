//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// memreport - batch reports over agent memory banks and evaluation runs
///
/// Loads each dataset's memory bank and result files, computes success and
/// step statistics, links every task to the memories it retrieved and
/// produced, and writes one ordered report.
///
/// Examples:
///   memreport --root mem_banks
///   memreport --root mem_banks --datasets alfworld,scienceworld
///   memreport --format markdown --output report.md
///   memreport --dry-run
///   memreport --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the dataset directories
    ///
    /// Defaults to the config file value, then `mem_banks`.
    #[arg(short, long, value_name = "DIR", env = "MEMREPORT_ROOT")]
    pub root: Option<PathBuf>,

    /// Datasets to include, in report order (comma-separated)
    ///
    /// Names are resolved relative to the root. When omitted, every dataset
    /// directory under the root is discovered.
    /// Example: --datasets alfworld,scienceworld
    #[arg(short, long, value_name = "NAMES", value_delimiter = ',')]
    pub datasets: Option<Vec<String>>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json, markdown, html)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .memreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 2 when any dataset failed to load
    ///
    /// The report is still written.
    #[arg(long)]
    pub strict: bool,

    /// Dry run: list the datasets and files that would be loaded
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .memreport.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
    /// Plain HTML format
    Html,
}

impl OutputFormat {
    /// File extension for reports in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref datasets) = self.datasets {
            if datasets.iter().any(|name| name.trim().is_empty()) {
                return Err("Dataset names must not be empty".to_string());
            }
        }

        if let Some(ref root) = self.root {
            if root.exists() && !root.is_dir() {
                return Err(format!("Root path is not a directory: {}", root.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_default` is the config file's `[general] verbose`; `--quiet`
    /// wins over both.
    pub fn log_level(&self, verbose_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
