//! Chunks command implementation.

use super::load_selection;
use crate::batch::plan_chunks;
use crate::chunking::TokenChunker;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::tokenizer::tokenizer_for_model;
use anyhow::Result;

/// Show how the selected records would be chunked.
pub fn run_chunks(limit: Option<usize>, ids: Option<&str>, settings: Settings) -> Result<()> {
    preflight::check(Operation::Plan, &settings)?;

    let records = load_selection(&settings, limit, ids)?;
    let chunker = TokenChunker::new(
        settings.chunking.chunk_size_tokens,
        settings.chunking.chunk_overlap_tokens,
    )?;
    let tokenizer = tokenizer_for_model(&settings.llm.model);
    let plan = plan_chunks(&records, &chunker, tokenizer.as_ref());

    Output::header(&format!(
        "Chunk plan ({} tokens per chunk, {} overlap, {})",
        chunker.chunk_size(),
        chunker.overlap(),
        tokenizer.name()
    ));
    for entry in &plan {
        Output::chunk_plan(entry);
    }

    println!();
    Output::kv("Records", &plan.len().to_string());
    Output::kv("Chunks", &plan.iter().map(|p| p.chunks).sum::<usize>().to_string());
    Output::kv("Model calls", &plan.iter().map(|p| p.calls).sum::<usize>().to_string());

    Ok(())
}
