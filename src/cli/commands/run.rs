//! Run command implementation.

use super::load_selection;
use crate::batch::BatchRunner;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::completion::{CompletionClient, OpenAIBackend};
use crate::config::{LlmProvider, Prompts, Settings};
use crate::rate_limit::RateLimiter;
use crate::summarizer::MapReduceSummarizer;
use crate::tokenizer::tokenizer_for_model;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the summarizer described by `settings`.
pub fn build_summarizer(settings: &Settings) -> crate::Result<MapReduceSummarizer> {
    let backend = match settings.llm.provider {
        LlmProvider::OpenAI => Arc::new(OpenAIBackend::new(
            settings.llm.base_url.as_deref(),
            Duration::from_secs(settings.llm.timeout_secs),
        )?),
    };
    let client = CompletionClient::new(backend, settings.llm.model.clone());
    let tokenizer = tokenizer_for_model(&settings.llm.model);
    let limiter = Arc::new(RateLimiter::new(settings.runtime.rate_limit_rps));
    let prompts = Prompts::load(&settings.prompts)?;

    info!(
        model = %settings.llm.model,
        tokenizer = tokenizer.name(),
        "Summarizer ready"
    );
    MapReduceSummarizer::new(settings, prompts, client, tokenizer, limiter)
}

/// Run the batch summarization.
pub async fn run_batch(
    limit: Option<usize>,
    resume: bool,
    ids: Option<&str>,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Summarize, &settings)?;

    let records = load_selection(&settings, limit, ids)?;
    if records.is_empty() {
        Output::warning("No records selected.");
        return Ok(());
    }

    Output::info(&format!(
        "Summarizing {} records with {}",
        records.len(),
        settings.llm.model
    ));

    let runner = BatchRunner::new(build_summarizer(&settings)?, &settings);
    let progress = Output::progress_bar(records.len() as u64, "Summarizing");
    let result = runner.run_with_progress(records, resume, &progress).await;
    progress.finish_and_clear();
    let stats = result?;

    Output::header("Summary");
    Output::run_stats(&stats);
    println!();
    Output::success(&format!(
        "Done. Wrote: {} and {}",
        runner.csv_path().display(),
        runner.md_path().display()
    ));

    Ok(())
}
