//! Report rendering.
//!
//! This module turns the assembled report into JSON (the exchange format),
//! Markdown, or plain HTML. Rendering never changes the report model; it
//! only decides how much of each trajectory to show.

use crate::models::{
    DatasetReport, Insight, MemoryItem, Metrics, Report, ReportMetadata, RetrievedMemory, Step,
    TaskView,
};
use anyhow::Result;
use std::fmt::Write as _;

/// Presentation limits applied while rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Maximum trajectory steps shown per task.
    pub max_trajectory_steps: usize,
    /// Observations longer than this are truncated.
    pub max_observation_chars: usize,
    /// Whether task trajectories are rendered at all.
    pub include_trajectories: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_trajectory_steps: 30,
            max_observation_chars: 500,
            include_trajectories: true,
        }
    }
}

impl From<&crate::config::ReportConfig> for RenderOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            max_trajectory_steps: config.max_trajectory_steps,
            max_observation_chars: config.max_observation_chars,
            include_trajectories: config.include_trajectories,
        }
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Memory Bank Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));

    for dataset in &report.datasets {
        output.push_str(&generate_dataset_section(dataset, options));
    }

    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Report generated by memreport v{}*\n",
        report.metadata.tool_version
    ));

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Root:** {}\n", code_span(&metadata.root)));
    section.push_str(&format!("- **Datasets:** {}\n", metadata.datasets_configured));
    if metadata.datasets_failed > 0 {
        section.push_str(&format!("- **Datasets Failed:** {}\n", metadata.datasets_failed));
    }
    section.push_str(&format!("- **Total Tasks:** {}\n", metadata.total_tasks));
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Datasets\n\n");
    for dataset in &report.datasets {
        let marker = if dataset.is_failed() { " (failed)" } else { "" };
        toc.push_str(&format!(
            "- [{}](#{}){}\n",
            md_text(&dataset.name),
            anchor(&dataset.name),
            marker
        ));
    }
    toc.push('\n');

    toc
}

fn generate_dataset_section(dataset: &DatasetReport, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## {} {{#{}}}\n\n",
        md_text(&dataset.name),
        anchor(&dataset.name)
    ));

    if let Some(ref error) = dataset.error {
        section.push_str(&format!(
            "> ❌ **Failed to load ({}):** {}\n\n",
            error.kind,
            md_text(&error.message)
        ));
        return section;
    }

    section.push_str("### Summary\n\n");
    section.push_str("| Tasks | Successes | Success Rate | Mean Steps | Mean Score |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    let overall = &dataset.summary.overall;
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        overall.total,
        overall.successes,
        fmt_rate(overall.success_rate),
        fmt_mean(overall.mean_steps),
        fmt_mean(overall.mean_score)
    ));

    if !dataset.summary.by_task_type.is_empty() {
        section.push_str("### By Task Type\n\n");
        section.push_str("| Task Type | Tasks | Successes | Success Rate | Mean Steps |\n");
        section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
        for group in &dataset.summary.by_task_type {
            section.push_str(&format!(
                "| {} {}\n",
                md_text(&group.label),
                metrics_cells(&group.metrics)
            ));
        }
        section.push('\n');
    }

    let stats = &dataset.memory_stats;
    section.push_str("### Memory Bank\n\n");
    section.push_str("| Entries | Insights | References | Reference Success Rate |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        stats.entries,
        stats.insights,
        stats.total_references,
        fmt_rate(stats.reference_success_rate)
    ));

    if !dataset.runs.is_empty() {
        section.push_str("### Runs\n\n");
        section.push_str("| File | Model | Timestamp | Memory Mode | Top-K | Threshold |\n");
        section.push_str("|:---|:---|:---|:---|:---:|:---:|\n");
        for run in &dataset.runs {
            section.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                md_text(&run.source_file),
                md_text(run.model.as_deref().unwrap_or("n/a")),
                md_text(run.timestamp.as_deref().unwrap_or("n/a")),
                md_text(run.memory_mode.as_deref().unwrap_or("n/a")),
                run.top_k.map(|k| k.to_string()).unwrap_or_else(|| "n/a".to_string()),
                run.similarity_threshold
                    .map(|t| format!("{:.2}", t))
                    .unwrap_or_else(|| "n/a".to_string()),
            ));
        }
        section.push('\n');
    }

    if !dataset.warnings.is_empty() {
        section.push_str("### Warnings\n\n");
        for warning in &dataset.warnings {
            section.push_str(&format!(
                "- ⚠️ **{}:** {}\n",
                warning.kind,
                md_text(&warning.message)
            ));
        }
        section.push('\n');
    }

    section.push_str("### Tasks\n\n");
    if dataset.tasks.is_empty() {
        section.push_str("No task results were recorded for this dataset.\n\n");
    }
    for view in &dataset.tasks {
        section.push_str(&generate_task_block(view, options));
    }

    section
}

fn generate_task_block(view: &TaskView, options: &RenderOptions) -> String {
    let mut block = String::new();
    let task = &view.task;

    let status = if task.success { "✅" } else { "❌" };
    block.push_str(&format!("#### {} {}\n\n", status, code_span(&task.task_id)));

    let mut meta = vec![
        format!("Type: {}", md_text(task.task_type_label())),
        format!(
            "Steps: {}",
            task.steps.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string())
        ),
    ];
    if let Some(score) = task.score {
        meta.push(format!("Score: {}", score));
    }
    block.push_str(&format!("*{}*\n\n", meta.join(" | ")));

    if let Some(ref goal) = task.goal {
        block.push_str(&format!("**Goal:** {}\n\n", md_text(goal)));
    }

    if !view.retrieved.is_empty() {
        block.push_str("**Retrieved memories:**\n\n");
        for retrieved in &view.retrieved {
            block.push_str(&generate_retrieved_line(retrieved));
        }
        block.push('\n');
    }

    if !view.extracted.is_empty() {
        block.push_str("**Extracted memories:**\n\n");
        for item in &view.extracted {
            block.push_str(&format!("- {}\n", code_span(&item.memory_id)));
            for insight in &item.insights {
                block.push_str(&format!("  - {}\n", insight_line(insight)));
            }
        }
        block.push('\n');
    }

    if options.include_trajectories && !task.trajectory.is_empty() {
        block.push_str(&format!(
            "<details>\n<summary>Trajectory ({} steps)</summary>\n\n",
            task.trajectory.len()
        ));
        let (shown, omitted) = excerpt(&task.trajectory, options.max_trajectory_steps);
        for (i, step) in shown.iter().enumerate() {
            block.push_str(&format!("{}. {}\n", i + 1, code_span(&step.action)));
            if let Some(ref reasoning) = step.reasoning {
                block.push_str(&format!("   - *Thought:* {}\n", md_text(reasoning)));
            }
            if !step.observation.is_empty() {
                block.push_str(&format!(
                    "   - *Observation:* {}\n",
                    md_text(&truncate_chars(&step.observation, options.max_observation_chars))
                ));
            }
        }
        if omitted > 0 {
            block.push_str(&format!("\n... {} more steps omitted ...\n", omitted));
        }
        block.push_str("\n</details>\n\n");
    }

    block.push_str("---\n\n");

    block
}

fn generate_retrieved_line(retrieved: &RetrievedMemory) -> String {
    let reference = retrieved.reference();
    let similarity = reference
        .similarity
        .map(|s| format!(" (similarity {:.4})", s))
        .unwrap_or_default();

    match retrieved {
        RetrievedMemory::Resolved { item, .. } => {
            let mut line = format!(
                "- {}{} from task {}\n",
                code_span(&reference.memory_id),
                similarity,
                code_span(&item.task_id)
            );
            for insight in &item.insights {
                line.push_str(&format!("  - {}\n", insight_line(insight)));
            }
            line
        }
        RetrievedMemory::Unresolved { .. } => format!(
            "- {}{} ⚠️ **unresolved**: not in the memory bank\n",
            code_span(&reference.memory_id),
            similarity
        ),
    }
}

fn insight_line(insight: &Insight) -> String {
    let mut line = match (insight.title.is_empty(), insight.description.is_empty()) {
        (false, false) => format!(
            "**{}**: {}",
            md_text(&insight.title),
            md_text(&insight.description)
        ),
        (false, true) => format!("**{}**", md_text(&insight.title)),
        (true, _) => md_text(&insight.description),
    };
    if !insight.content.is_empty() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&code_span(&insight.content));
    }
    if insight.reference_count > 0 {
        line.push_str(&format!(
            " (referenced {}x, {} success)",
            insight.reference_count,
            fmt_rate(insight.reference_success_rate())
        ));
    }
    line
}

/// Generate a plain HTML report without styling or scripts.
pub fn generate_html_report(report: &Report, options: &RenderOptions) -> String {
    let mut out = String::new();
    let metadata = &report.metadata;

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    out.push_str("<title>Memory Bank Report</title>\n</head>\n<body>\n");
    out.push_str("<h1>Memory Bank Report</h1>\n");

    out.push_str("<ul>\n");
    let _ = writeln!(
        out,
        "<li>Generated: {}</li>",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "<li>Root: <code>{}</code></li>", escape_html(&metadata.root));
    let _ = writeln!(
        out,
        "<li>Datasets: {} ({} failed)</li>",
        metadata.datasets_configured, metadata.datasets_failed
    );
    let _ = writeln!(out, "<li>Total tasks: {}</li>", metadata.total_tasks);
    out.push_str("</ul>\n");

    out.push_str("<nav>\n<ul>\n");
    for dataset in &report.datasets {
        let _ = writeln!(
            out,
            "<li><a href=\"#{}\">{}</a>{}</li>",
            escape_html(&anchor(&dataset.name)),
            escape_html(&dataset.name),
            if dataset.is_failed() { " (failed)" } else { "" }
        );
    }
    out.push_str("</ul>\n</nav>\n");

    for dataset in &report.datasets {
        out.push_str(&generate_html_dataset(dataset, options));
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn generate_html_dataset(dataset: &DatasetReport, options: &RenderOptions) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "<section id=\"{}\">\n<h2>{}</h2>",
        escape_html(&anchor(&dataset.name)),
        escape_html(&dataset.name)
    );

    if let Some(ref error) = dataset.error {
        let _ = writeln!(
            out,
            "<p class=\"error\"><strong>Failed to load ({}):</strong> {}</p>\n</section>",
            escape_html(&error.kind),
            escape_html(&error.message)
        );
        return out;
    }

    out.push_str("<table>\n<tr><th>Group</th><th>Tasks</th><th>Successes</th><th>Success Rate</th><th>Mean Steps</th></tr>\n");
    out.push_str(&html_metrics_row("All tasks", &dataset.summary.overall));
    for group in &dataset.summary.by_task_type {
        out.push_str(&html_metrics_row(&group.label, &group.metrics));
    }
    out.push_str("</table>\n");

    let stats = &dataset.memory_stats;
    let _ = writeln!(
        out,
        "<p>Memory bank: {} entries, {} insights, {} references, {} reference success rate</p>",
        stats.entries,
        stats.insights,
        stats.total_references,
        fmt_rate(stats.reference_success_rate)
    );

    if !dataset.warnings.is_empty() {
        out.push_str("<h3>Warnings</h3>\n<ul>\n");
        for warning in &dataset.warnings {
            let _ = writeln!(
                out,
                "<li><strong>{}:</strong> {}</li>",
                warning.kind,
                escape_html(&warning.message)
            );
        }
        out.push_str("</ul>\n");
    }

    out.push_str("<h3>Tasks</h3>\n");
    for view in &dataset.tasks {
        out.push_str(&generate_html_task(view, options));
    }

    out.push_str("</section>\n");
    out
}

fn html_metrics_row(label: &str, metrics: &Metrics) -> String {
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
        escape_html(label),
        metrics.total,
        metrics.successes,
        fmt_rate(metrics.success_rate),
        fmt_mean(metrics.mean_steps)
    )
}

fn generate_html_task(view: &TaskView, options: &RenderOptions) -> String {
    let mut out = String::new();
    let task = &view.task;

    let _ = writeln!(
        out,
        "<details>\n<summary>[{}] {} ({}, {} steps)</summary>",
        if task.success { "success" } else { "failure" },
        escape_html(&task.task_id),
        escape_html(task.task_type_label()),
        task.steps.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string())
    );

    if let Some(ref goal) = task.goal {
        let _ = writeln!(out, "<p><strong>Goal:</strong> {}</p>", escape_html(goal));
    }

    if !view.retrieved.is_empty() {
        out.push_str("<h4>Retrieved memories</h4>\n<ul>\n");
        for retrieved in &view.retrieved {
            let reference = retrieved.reference();
            match retrieved {
                RetrievedMemory::Resolved { item, .. } => {
                    let _ = writeln!(
                        out,
                        "<li><code>{}</code> from task <code>{}</code>{}</li>",
                        escape_html(&reference.memory_id),
                        escape_html(&item.task_id),
                        html_insights(item)
                    );
                }
                RetrievedMemory::Unresolved { .. } => {
                    let _ = writeln!(
                        out,
                        "<li><code>{}</code> <strong>unresolved</strong></li>",
                        escape_html(&reference.memory_id)
                    );
                }
            }
        }
        out.push_str("</ul>\n");
    }

    if !view.extracted.is_empty() {
        out.push_str("<h4>Extracted memories</h4>\n<ul>\n");
        for item in &view.extracted {
            let _ = writeln!(
                out,
                "<li><code>{}</code>{}</li>",
                escape_html(&item.memory_id),
                html_insights(item)
            );
        }
        out.push_str("</ul>\n");
    }

    if options.include_trajectories && !task.trajectory.is_empty() {
        out.push_str("<h4>Trajectory</h4>\n<ol>\n");
        let (shown, omitted) = excerpt(&task.trajectory, options.max_trajectory_steps);
        for step in shown {
            let _ = write!(out, "<li><code>{}</code>", escape_html(&step.action));
            if let Some(ref reasoning) = step.reasoning {
                let _ = write!(out, "<br><em>{}</em>", escape_html(reasoning));
            }
            if !step.observation.is_empty() {
                let _ = write!(
                    out,
                    "<br>{}",
                    escape_html(&truncate_chars(&step.observation, options.max_observation_chars))
                );
            }
            out.push_str("</li>\n");
        }
        out.push_str("</ol>\n");
        if omitted > 0 {
            let _ = writeln!(out, "<p>... {} more steps omitted ...</p>", omitted);
        }
    }

    out.push_str("</details>\n");
    out
}

fn html_insights(item: &MemoryItem) -> String {
    if item.insights.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul>");
    for insight in &item.insights {
        let _ = write!(
            out,
            "<li><strong>{}</strong> {} <code>{}</code></li>",
            escape_html(&insight.title),
            escape_html(&insight.description),
            escape_html(&insight.content)
        );
    }
    out.push_str("</ul>");
    out
}

fn metrics_cells(metrics: &Metrics) -> String {
    format!(
        "| {} | {} | {} | {} |",
        metrics.total,
        metrics.successes,
        fmt_rate(metrics.success_rate),
        fmt_mean(metrics.mean_steps)
    )
}

/// First `max` steps and the number left out.
fn excerpt(trajectory: &[Step], max: usize) -> (&[Step], usize) {
    let shown = trajectory.len().min(max);
    (&trajectory[..shown], trajectory.len() - shown)
}

fn fmt_rate(rate: Option<f64>) -> String {
    rate.map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| "n/a".to_string())
}

fn fmt_mean(mean: Option<f64>) -> String {
    mean.map(|m| format!("{:.1}", m))
        .unwrap_or_else(|| "n/a".to_string())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Fragment id for a dataset; anything outside `[a-z0-9_-]` becomes `-`.
fn anchor(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Inline code span that survives backticks in `text`.
fn code_span(text: &str) -> String {
    let text = text.replace(['\r', '\n'], " ");
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    if longest == 0 {
        format!("`{}`", text)
    } else {
        let fence = "`".repeat(longest + 1);
        format!("{} {} {}", fence, text, fence)
    }
}

/// Plain Markdown text on one line, safe inside table cells and list items.
fn md_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '|' | '*' | '[' | ']' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '<' => escaped.push_str("&lt;"),
            '\r' | '\n' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DatasetError, DatasetStatus, DatasetSummary, LoadWarning, MemoryBankStats, MemoryRef,
        TaskResult, TaskTypeSummary, WarningKind,
    };
    use chrono::Utc;

    fn memory(memory_id: &str, task_id: &str) -> MemoryItem {
        MemoryItem {
            memory_id: memory_id.to_string(),
            task_id: task_id.to_string(),
            task_type: None,
            query: None,
            is_success: Some(true),
            insights: vec![Insight {
                title: "Check countertops".to_string(),
                description: "Mugs are usually there".to_string(),
                content: "go to countertop 1".to_string(),
                reference_count: 4,
                reference_success_count: 3,
            }],
            trajectory: Vec::new(),
            tags: Vec::new(),
            metadata: None,
        }
    }

    fn create_test_report() -> Report {
        let trajectory = (0..35)
            .map(|i| Step {
                action: format!("action {}", i),
                observation: "x".repeat(600),
                reasoning: (i == 0).then(|| "Think <first>".to_string()),
            })
            .collect();

        let task = TaskResult {
            task_id: "t1".to_string(),
            task_type: Some("pick_and_place".to_string()),
            success: true,
            steps: Some(35),
            goal: Some("put a mug in coffeemachine".to_string()),
            score: None,
            trajectory,
            used_memories: Vec::new(),
        };

        let reference = |id: &str| MemoryRef {
            memory_id: id.to_string(),
            query: None,
            similarity: Some(0.71),
        };

        let ok = DatasetReport {
            name: "alfworld".to_string(),
            status: DatasetStatus::Ok,
            error: None,
            summary: DatasetSummary {
                overall: Metrics {
                    total: 1,
                    successes: 1,
                    success_rate: Some(1.0),
                    mean_steps: Some(35.0),
                    mean_score: None,
                },
                by_task_type: vec![TaskTypeSummary {
                    label: "pick_and_place".to_string(),
                    metrics: Metrics {
                        total: 1,
                        successes: 1,
                        success_rate: Some(1.0),
                        mean_steps: Some(35.0),
                        mean_score: None,
                    },
                }],
            },
            memory_stats: MemoryBankStats {
                entries: 2,
                insights: 2,
                total_references: 8,
                referenced_successes: 6,
                reference_success_rate: Some(0.75),
            },
            runs: Vec::new(),
            warnings: vec![LoadWarning::new(
                WarningKind::UnresolvedReference,
                "task 't1' references unknown memory 'm-404'",
            )],
            tasks: vec![TaskView {
                task,
                retrieved: vec![
                    RetrievedMemory::Resolved {
                        reference: reference("mem-2"),
                        item: memory("mem-2", "t0"),
                    },
                    RetrievedMemory::Unresolved {
                        reference: reference("m-404"),
                    },
                ],
                extracted: vec![memory("mem-1", "t1")],
            }],
        };

        let failed = DatasetReport::failed(
            "scienceworld",
            DatasetError {
                kind: "parse".to_string(),
                message: "malformed JSON in results.json".to_string(),
            },
        );

        Report {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                tool_version: "1.0.0".to_string(),
                root: "mem_banks".to_string(),
                datasets_configured: 2,
                datasets_failed: 1,
                total_tasks: 1,
                duration_seconds: 0.2,
            },
            datasets: vec![ok, failed],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &RenderOptions::default());

        assert!(markdown.contains("# Memory Bank Report"));
        assert!(markdown.contains("## alfworld"));
        assert!(markdown.contains("| 1 | 1 | 100.0% | 35.0 | n/a |"));
        assert!(markdown.contains("| pick_and_place | 1 | 1 | 100.0% | 35.0 |"));
        assert!(markdown.contains("`m-404` (similarity 0.7100) ⚠️ **unresolved**"));
        assert!(markdown.contains("**Extracted memories:**"));
        assert!(markdown.contains("(referenced 4x, 75.0% success)"));
        assert!(markdown.contains("5 more steps omitted"));
        assert!(markdown.contains("Failed to load (parse)"));

        let alfworld = markdown.find("## alfworld").unwrap();
        let scienceworld = markdown.find("## scienceworld").unwrap();
        assert!(alfworld < scienceworld);
    }

    #[test]
    fn test_trajectories_can_be_disabled() {
        let report = create_test_report();
        let options = RenderOptions {
            include_trajectories: false,
            ..RenderOptions::default()
        };
        let markdown = generate_markdown_report(&report, &options);
        assert!(!markdown.contains("<summary>Trajectory"));
    }

    #[test]
    fn test_generate_html_report_escapes() {
        let report = create_test_report();
        let html = generate_html_report(&report, &RenderOptions::default());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<section id=\"alfworld\">"));
        assert!(html.contains("Think &lt;first&gt;"));
        assert!(!html.contains("Think <first>"));
        assert!(html.contains("<code>m-404</code> <strong>unresolved</strong>"));
        assert!(html.contains("Failed to load (parse)"));
        assert!(!html.contains("<script"));
        assert!(!html.contains("<style"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["datasets"][0]["name"], "alfworld");
        assert_eq!(value["datasets"][1]["status"], "failed");
        assert_eq!(value["datasets"][0]["tasks"][0]["retrieved"][1]["resolution"], "unresolved");
        assert_eq!(value["datasets"][0]["summary"]["success_rate"], 1.0);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor("alfworld/Qwen-7B"), "alfworld-qwen-7b");
        assert_eq!(anchor("web\"shop<b>"), "web-shop-b-");
    }

    #[test]
    fn test_markdown_escapes_task_text() {
        let mut report = create_test_report();
        {
            let dataset = &mut report.datasets[0];
            dataset.summary.by_task_type[0].label = "pick|place".to_string();
            let task = &mut dataset.tasks[0].task;
            task.task_id = "t`1".to_string();
            task.goal = Some("heat | cool\nthen *place*".to_string());
            task.trajectory[1].action = "say `hi`".to_string();
            task.trajectory[1].observation = "a | b".to_string();
        }
        let markdown = generate_markdown_report(&report, &RenderOptions::default());

        assert!(markdown.contains("| pick\\|place | 1 | 1 | 100.0% | 35.0 |"));
        assert!(markdown.contains("#### ✅ `` t`1 ``"));
        assert!(markdown.contains("**Goal:** heat \\| cool then \\*place\\*"));
        assert!(markdown.contains("2. `` say `hi` ``"));
        assert!(markdown.contains("*Observation:* a \\| b"));
    }

    #[test]
    fn test_html_anchor_is_attribute_safe() {
        let mut report = create_test_report();
        report.datasets[0].name = "x\"><script>".to_string();
        let html = generate_html_report(&report, &RenderOptions::default());

        assert!(html.contains("<section id=\"x---script-\">"));
        assert!(html.contains("<a href=\"#x---script-\">x&quot;&gt;&lt;script&gt;</a>"));
        assert!(!html.contains("<script>"));
    }
}
