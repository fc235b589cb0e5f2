//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.memreport.toml` files.

use crate::analysis::ZeroStepPolicy;
use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".memreport.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset selection.
    #[serde(default)]
    pub datasets: DatasetsConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Statistics settings.
    #[serde(default)]
    pub stats: StatsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path. The extension follows the format when unset.
    #[serde(default)]
    pub output: Option<String>,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

/// Which datasets to process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    /// Directory holding the dataset directories.
    #[serde(default = "default_root")]
    pub root: String,

    /// Dataset names, relative to the root. Empty means discover.
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            names: Vec::new(),
        }
    }
}

fn default_root() -> String {
    "mem_banks".to_string()
}

/// Dataset file classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Name fragments marking a `.jsonl` file as the memory bank.
    #[serde(default = "default_memory_markers")]
    pub memory_markers: Vec<String>,

    /// Name fragments marking a `.json` file as a result file.
    #[serde(default = "default_result_markers")]
    pub result_markers: Vec<String>,

    /// How deep discovery looks below the root.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            memory_markers: default_memory_markers(),
            result_markers: default_result_markers(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_memory_markers() -> Vec<String> {
    vec!["mem".to_string()]
}

fn default_result_markers() -> Vec<String> {
    vec!["result".to_string()]
}

fn default_max_depth() -> usize {
    2
}

/// Statistics settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Whether explicit zero-step tasks count toward mean steps.
    #[serde(default)]
    pub zero_step_policy: ZeroStepPolicy,
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Maximum trajectory steps rendered per task.
    #[serde(default = "default_max_trajectory_steps")]
    pub max_trajectory_steps: usize,

    /// Observations are cut after this many characters.
    #[serde(default = "default_max_observation_chars")]
    pub max_observation_chars: usize,

    /// Render trajectories in Markdown and HTML output.
    #[serde(default = "default_true")]
    pub include_trajectories: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_trajectory_steps: default_max_trajectory_steps(),
            max_observation_chars: default_max_observation_chars(),
            include_trajectories: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_trajectory_steps() -> usize {
    30
}

fn default_max_observation_chars() -> usize {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given on the command line (or through the environment)
    /// override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref root) = args.root {
            self.datasets.root = root.display().to_string();
        }
        if let Some(ref names) = args.datasets {
            self.datasets.names = names.clone();
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Output path, defaulting to `memreport.<ext>` for the chosen format.
    pub fn output_path(&self) -> String {
        self.general
            .output
            .clone()
            .unwrap_or_else(|| format!("memreport.{}", self.general.format.extension()))
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
