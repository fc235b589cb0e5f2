//! memreport - batch report generator for agent memory banks
//!
//! Loads per-dataset memory banks and evaluation result files, computes
//! success and step statistics, joins every task with the memories it
//! retrieved and produced, and writes a single ordered report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Fatal error (missing root, no datasets, unreadable config, write failure)
//!   2 - Report written, but --strict was set and a dataset failed

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod report;
mod scanner;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::{DatasetStatus, Report};
use pipeline::BatchOptions;
use report::RenderOptions;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` applies
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("memreport v{}", env!("CARGO_PKG_VERSION"));
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .memreport.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to set the dataset root, dataset list, and report limits.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the batch and write the report. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let options = BatchOptions {
        root: PathBuf::from(&config.datasets.root),
        datasets: config.datasets.names.clone(),
        scan: scanner::ScanConfig::from(&config.scanner),
        zero_step_policy: config.stats.zero_step_policy,
        show_progress: !args.quiet,
    };

    if args.dry_run {
        return handle_dry_run(&options);
    }

    println!("📂 Loading datasets from: {}", options.root.display());
    let report = pipeline::run_batch(&options).await?;

    let render_options = RenderOptions::from(&config.report);
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &render_options),
        OutputFormat::Html => report::generate_html_report(&report, &render_options),
    };

    let output_path = config.output_path();
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path))?;

    print_summary(&report);
    println!("\n✅ Report saved to: {}", output_path);

    if args.strict && report.failed_datasets().next().is_some() {
        eprintln!(
            "\n⛔ {} dataset(s) failed to load. Failing (exit code 2).",
            report.metadata.datasets_failed
        );
        return Ok(2);
    }

    Ok(0)
}

fn print_summary(report: &Report) {
    println!("\n📊 Report Summary:");
    for dataset in &report.datasets {
        match dataset.status {
            DatasetStatus::Ok => {
                let overall = &dataset.summary.overall;
                println!(
                    "   ✅ {}: {} tasks, success rate {}, {} warnings",
                    dataset.name,
                    overall.total,
                    overall
                        .success_rate
                        .map(|r| format!("{:.1}%", r * 100.0))
                        .unwrap_or_else(|| "n/a".to_string()),
                    dataset.warnings.len()
                );
            }
            DatasetStatus::Failed => {
                let reason = dataset
                    .error
                    .as_ref()
                    .map(|e| e.message.as_str())
                    .unwrap_or("unknown error");
                println!("   ❌ {}: {}", dataset.name, reason);
            }
        }
    }
    println!(
        "   Total tasks: {} | Failed datasets: {}",
        report.metadata.total_tasks, report.metadata.datasets_failed
    );
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
}

/// Handle --dry-run: list the datasets and files that would be loaded.
fn handle_dry_run(options: &BatchOptions) -> Result<i32> {
    println!("\n🔍 Dry run: locating dataset files (nothing is parsed)...\n");

    let names = pipeline::resolve_datasets(options)?;
    let dataset_scanner = scanner::DatasetScanner::new(options.scan.clone());

    for name in &names {
        let dir = pipeline::dataset_dir(&options.root, name);
        match dataset_scanner.locate(&dir) {
            Ok(files) => {
                println!("   📁 {}", name);
                println!("     🧠 {}", files.memory_bank.display());
                for result in &files.results {
                    println!("     📄 {}", result.display());
                }
            }
            Err(e) => println!("   ❌ {}: {}", name, e),
        }
    }

    println!("\n✅ Dry run complete. {} dataset(s) configured.", names.len());
    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// Also returns the file the configuration came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, Some(config_path.clone())));
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => Ok((config, Some(PathBuf::from(DEFAULT_CONFIG_FILE)))),
        None => Ok((Config::default(), None)),
    }
}
