//! Resumable batch summarization.

use super::output::{already_done_ids, render_section, CsvSink, MarkdownSink};
use crate::config::Settings;
use crate::error::Result;
use crate::record::{InputRecord, OutputRow};
use crate::summarizer::MapReduceSummarizer;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};

/// Counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Records handed to the runner.
    pub total: usize,
    /// Records summarized and written.
    pub processed: usize,
    /// Records skipped because the table already has their id.
    pub skipped_existing: usize,
    /// Records skipped because they have no id.
    pub skipped_missing_id: usize,
    /// Records whose summarization failed (only with `continue_on_error`).
    pub failed: usize,
    /// Chunks summarized across all records.
    pub chunks: usize,
    /// Completion calls made, not counting retries.
    pub completion_calls: usize,
}

/// Summarizes records and appends the results to the table and the document.
pub struct BatchRunner {
    summarizer: MapReduceSummarizer,
    csv_path: PathBuf,
    md_path: PathBuf,
    concurrency: usize,
    continue_on_error: bool,
}

impl BatchRunner {
    pub fn new(summarizer: MapReduceSummarizer, settings: &Settings) -> Self {
        Self {
            summarizer,
            csv_path: settings.output_csv_path(),
            md_path: settings.output_md_path(),
            concurrency: settings.runtime.concurrency.max(1),
            continue_on_error: settings.runtime.continue_on_error,
        }
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }

    pub fn md_path(&self) -> &PathBuf {
        &self.md_path
    }

    /// Run without progress reporting.
    pub async fn run(&self, records: Vec<InputRecord>, resume: bool) -> Result<RunStats> {
        self.run_with_progress(records, resume, &ProgressBar::hidden())
            .await
    }

    /// Summarize `records`, skipping ids already in the table when `resume` is set.
    ///
    /// Each record's document section is written as soon as it is summarized.
    /// Table rows are written in batches; whatever is still buffered is written
    /// before returning, also when the run fails.
    #[instrument(skip(self, records, progress), fields(records = records.len()))]
    pub async fn run_with_progress(
        &self,
        records: Vec<InputRecord>,
        resume: bool,
        progress: &ProgressBar,
    ) -> Result<RunStats> {
        let mut done = if resume {
            already_done_ids(&self.csv_path)?
        } else {
            HashSet::new()
        };
        if resume {
            info!("Resuming: {} records already summarized", done.len());
        }

        let mut stats = RunStats {
            total: records.len(),
            ..RunStats::default()
        };
        progress.set_length(records.len() as u64);

        let mut pending = Vec::new();
        for record in records {
            let Some(id) = record.id() else {
                debug!("Skipping record without id");
                stats.skipped_missing_id += 1;
                progress.inc(1);
                continue;
            };
            // Also catches ids repeated within the input.
            if !done.insert(id.to_string()) {
                debug!(id, "Skipping already summarized record");
                stats.skipped_existing += 1;
                progress.inc(1);
                continue;
            }
            pending.push(record);
        }

        let mut table = CsvSink::new(&self.csv_path);
        let document = MarkdownSink::new(&self.md_path);
        let summarizer = &self.summarizer;

        let mut summaries = stream::iter(pending)
            .map(|record| async move {
                let outcome = summarizer.summarize_record(&record).await;
                (record, outcome)
            })
            .buffered(self.concurrency);

        let outcome: Result<()> = async {
            while let Some((record, outcome)) = summaries.next().await {
                progress.set_message(record.title().to_string());
                match outcome {
                    Ok(summary) => {
                        document.append(&render_section(&record, &summary.summary))?;
                        table.push(OutputRow::new(&record, &summary.summary))?;
                        stats.processed += 1;
                        stats.chunks += summary.chunks;
                        stats.completion_calls += summary.calls;
                    }
                    Err(e) if self.continue_on_error => {
                        error!(id = record.id().unwrap_or("-"), "Failed to summarize: {}", e);
                        stats.failed += 1;
                    }
                    Err(e) => return Err(e),
                }
                progress.inc(1);
            }
            Ok(())
        }
        .await;

        let flushed = table.flush();
        outcome?;
        flushed?;

        info!(
            processed = stats.processed,
            skipped = stats.skipped_existing + stats.skipped_missing_id,
            failed = stats.failed,
            "Batch complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::{fast_policy, ScriptedBackend};
    use crate::completion::{CompletionClient, CompletionError};
    use crate::config::Prompts;
    use crate::error::TldwError;
    use crate::rate_limit::RateLimiter;
    use crate::tokenizer::testing::WhitespaceTokenizer;
    use std::path::Path;
    use std::sync::Arc;

    fn settings(dir: &Path) -> Settings {
        let content = format!(
            "[chunking]\nchunk_size_tokens = 50\nchunk_overlap_tokens = 5\n\
             [io]\ninput_jsonl = \"{0}/in.jsonl\"\noutput_csv = \"{0}/out/summaries.csv\"\noutput_md = \"{0}/out/summaries.md\"\n",
            dir.display()
        );
        Settings::from_toml_with(&content, |_| None).unwrap()
    }

    fn runner(settings: &Settings, backend: Arc<ScriptedBackend>) -> BatchRunner {
        let client = CompletionClient::new(backend, "gpt-4o-mini").with_policy(fast_policy());
        let summarizer = MapReduceSummarizer::new(
            settings,
            Prompts::load(&settings.prompts).unwrap(),
            client,
            Arc::new(WhitespaceTokenizer::default()),
            Arc::new(RateLimiter::new(1000.0)),
        )
        .unwrap();
        BatchRunner::new(summarizer, settings)
    }

    fn record(id: Option<&str>, text: &str) -> InputRecord {
        let mut record = InputRecord {
            text: Some(text.to_string()),
            ..InputRecord::default()
        };
        record.meta.id = id.map(str::to_string);
        record.meta.title = id.map(|id| format!("Video {}", id));
        record
    }

    fn table_ids(path: &Path) -> Vec<String> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_run_writes_both_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let backend = Arc::new(ScriptedBackend::new().always(Ok("TL;DR: fine\n- point".to_string())));
        let runner = runner(&settings, backend.clone());

        let records = vec![
            record(Some("a"), "first transcript"),
            record(None, "no id here"),
            record(Some("b"), ""),
        ];
        let stats = runner.run(records, false).await.unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.skipped_missing_id, 1);
        // One map and one reduce call for "a"; nothing for the empty "b".
        assert_eq!(backend.calls(), 2);
        assert_eq!(stats.completion_calls, 2);

        assert_eq!(table_ids(runner.csv_path()), vec!["a", "b"]);
        let document = std::fs::read_to_string(runner.md_path()).unwrap();
        assert!(document.starts_with("# Video a\n"));
        assert!(document.contains("TL;DR: fine\n\n- point\n\n---\n"));
        assert_eq!(document.matches("\n---\n").count(), 2);
    }

    #[tokio::test]
    async fn test_resume_skips_finished_records() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let backend = Arc::new(ScriptedBackend::new().always(Ok("- ok".to_string())));
        let runner = runner(&settings, backend.clone());

        let batch = || vec![record(Some("a"), "one"), record(Some("b"), "two")];
        let first = runner.run(batch(), true).await.unwrap();
        assert_eq!(first.processed, 2);
        let calls_after_first = backend.calls();

        let second = runner.run(batch(), true).await.unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped_existing, 2);
        assert_eq!(backend.calls(), calls_after_first);
        assert_eq!(table_ids(runner.csv_path()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_input_are_summarized_once() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let backend = Arc::new(ScriptedBackend::new().always(Ok("- ok".to_string())));
        let runner = runner(&settings, backend);

        let stats = runner
            .run(vec![record(Some("a"), "one"), record(Some("a"), "one")], false)
            .await
            .unwrap();

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.skipped_existing, 1);
    }

    #[tokio::test]
    async fn test_failure_aborts_but_flushes_finished_rows() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let backend = Arc::new(
            ScriptedBackend::new()
                .then_ok("- a1")
                .then_ok("- a")
                .always(Err(CompletionError::permanent("invalid request"))),
        );
        let runner = runner(&settings, backend);

        let err = runner
            .run(vec![record(Some("a"), "one"), record(Some("b"), "two")], false)
            .await
            .unwrap_err();

        assert!(matches!(err, TldwError::Completion { .. }));
        assert_eq!(table_ids(runner.csv_path()), vec!["a"]);
        let document = std::fs::read_to_string(runner.md_path()).unwrap();
        assert!(document.contains("# Video a"));
        assert!(!document.contains("# Video b"));
    }

    #[tokio::test]
    async fn test_continue_on_error_skips_failed_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.runtime.continue_on_error = true;
        let backend = Arc::new(
            ScriptedBackend::new()
                .then_err(CompletionError::permanent("too long"))
                .always(Ok("- fine".to_string())),
        );
        let runner = runner(&settings, backend);

        let stats = runner
            .run(vec![record(Some("a"), "one"), record(Some("b"), "two")], false)
            .await
            .unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(table_ids(runner.csv_path()), vec!["b"]);
    }

    #[tokio::test]
    async fn test_concurrent_run_keeps_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.runtime.concurrency = 4;
        let backend = Arc::new(ScriptedBackend::new().always(Ok("- ok".to_string())));
        let runner = runner(&settings, backend);

        let ids: Vec<String> = (0..12).map(|i| format!("v{:02}", i)).collect();
        let records = ids.iter().map(|id| record(Some(id), "some words")).collect();
        let stats = runner.run(records, false).await.unwrap();

        assert_eq!(stats.processed, 12);
        assert_eq!(table_ids(runner.csv_path()), ids);
        let document = std::fs::read_to_string(runner.md_path()).unwrap();
        assert_eq!(document.matches("# Video").count(), 12);
    }
}
