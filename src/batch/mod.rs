//! Batch processing of transcript files.
//!
//! Reads the JSONL input, selects records, and drives the summarizer over them
//! while appending results to the summary table and document.

mod input;
mod output;
mod runner;

pub use input::{parse_id_list, read_records, select_records};
pub use output::{already_done_ids, ensure_parent_dir, render_section, CsvSink, MarkdownSink, FLUSH_EVERY};
pub use runner::{BatchRunner, RunStats};

use crate::chunking::TokenChunker;
use crate::record::InputRecord;
use crate::tokenizer::Tokenizer;
use serde::Serialize;

/// How a record would be chunked, without calling the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkPlan {
    pub id: String,
    pub title: String,
    pub tokens: usize,
    pub chunks: usize,
    /// Completion calls the record would need (map calls plus reduce).
    pub calls: usize,
}

/// Plan the chunking of every record.
pub fn plan_chunks(
    records: &[InputRecord],
    chunker: &TokenChunker,
    tokenizer: &dyn Tokenizer,
) -> Vec<ChunkPlan> {
    records
        .iter()
        .map(|record| {
            let text = record.text();
            let tokens = if text.is_empty() {
                0
            } else {
                tokenizer.encode(text).len()
            };
            let chunks = chunker.expected_chunks(tokens);
            ChunkPlan {
                id: record.id().unwrap_or_default().to_string(),
                title: record.title().to_string(),
                tokens,
                chunks,
                calls: if chunks == 0 { 0 } else { chunks + 1 },
            }
        })
        .collect()
}
