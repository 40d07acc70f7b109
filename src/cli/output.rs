//! CLI output formatting utilities.

use crate::agent::ToolCallRecord;
use crate::orchestrator::IndexReport;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an indexed file.
    pub fn source_info(file_path: &str, pages: u32, chunks: u32, indexed_at: Option<&str>) {
        println!(
            "  {} {} ({} pages, {} chunks{})",
            style("*").cyan(),
            style(file_path).bold(),
            pages,
            chunks,
            indexed_at
                .map(|t| format!(", {}", style(t).dim()))
                .unwrap_or_default()
        );
    }

    /// Print search result.
    pub fn search_result(citation: &str, score: f32, content: &str) {
        println!(
            "\n{} {} (score: {:.2})",
            style(">>").green(),
            style(citation).bold(),
            score
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Print the tool calls an agent made.
    pub fn tool_calls(calls: &[ToolCallRecord]) {
        if calls.is_empty() {
            return;
        }
        Self::header("Tool calls");
        for call in calls {
            let result = content_preview(&call.result, 120);
            if call.is_error {
                println!("  {} {} -> {}", style("!").red(), call, style(result).red());
            } else {
                println!("  {} {} -> {}", style("*").cyan(), call, result);
            }
        }
    }

    /// Print the summary of an indexing pass.
    pub fn index_report(report: &IndexReport) {
        Self::kv("Files", &report.files_loaded.to_string());
        Self::kv("Pages", &report.pages_loaded.to_string());
        if report.files_skipped > 0 {
            Self::kv("Skipped (already indexed)", &report.files_skipped.to_string());
        }
        Self::kv("Chunks indexed", &report.chunks_indexed.to_string());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Collapse newlines and truncate with an ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
