//! CLI output formatting utilities.

use crate::batch::{ChunkPlan, RunStats};
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

    /// Print the counters of a finished run.
    pub fn run_stats(stats: &RunStats) {
        Output::kv("Records", &stats.total.to_string());
        Output::kv("Summarized", &stats.processed.to_string());
        if stats.skipped_existing > 0 {
            Output::kv("Already done", &stats.skipped_existing.to_string());
        }
        if stats.skipped_missing_id > 0 {
            Output::kv("Missing id", &stats.skipped_missing_id.to_string());
        }
        if stats.failed > 0 {
            Output::kv("Failed", &style(stats.failed).red().to_string());
        }
        Output::kv("Chunks", &stats.chunks.to_string());
        Output::kv("Model calls", &stats.completion_calls.to_string());
    }

    /// Print one line of a chunk plan.
    pub fn chunk_plan(plan: &ChunkPlan) {
        let id = if plan.id.is_empty() { "(no id)" } else { plan.id.as_str() };
        println!(
            "  {} {} ({}, {} tokens, {} chunks)",
            style("*").cyan(),
            style(title_preview(&plan.title, 60)).bold(),
            style(id).dim(),
            plan.tokens,
            plan.chunks
        );
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(bar_style);
        pb.set_message(msg.to_string());
        pb
    }
}

/// Truncate a title with ellipsis, on a character boundary.
fn title_preview(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_preview() {
        assert_eq!(title_preview("short", 10), "short");
        assert_eq!(title_preview("ünïcödé title", 5), "ünïcö...");
    }
}
