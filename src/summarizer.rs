//! Map-reduce summarization of a single transcript.
//!
//! The transcript is split into token windows, each window is summarized on
//! its own (map), and the partial summaries are merged by one more call
//! (reduce). The first line of the merged output becomes the headline when it
//! starts with `TL;DR`.

use crate::chunking::TokenChunker;
use crate::completion::CompletionClient;
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::rate_limit::RateLimiter;
use crate::record::InputRecord;
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Prefix that marks the headline line of the reduce output (case-insensitive).
pub const HEADLINE_MARKER: &str = "tl;dr";

/// Final summary of one transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Headline line, empty when the model did not produce one.
    pub tldr: String,
    /// Remaining lines as Markdown.
    pub bullets: String,
}

impl SummaryResult {
    pub fn is_empty(&self) -> bool {
        self.tldr.is_empty() && self.bullets.is_empty()
    }
}

/// Summary of one record plus how much work it took.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSummary {
    pub summary: SummaryResult,
    /// Chunks the transcript was split into.
    pub chunks: usize,
    /// Completion calls made (map calls plus the reduce call).
    pub calls: usize,
}

/// Split reduce output into headline and bullets.
///
/// Blank lines are dropped and the remaining lines trimmed. The first line is
/// the headline only if it starts with [`HEADLINE_MARKER`].
pub fn parse_reduce_output(output: &str) -> SummaryResult {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match lines.split_first() {
        Some((first, rest)) if starts_with_marker(first) => SummaryResult {
            tldr: first.to_string(),
            bullets: rest.join("\n"),
        },
        _ => SummaryResult {
            tldr: String::new(),
            bullets: lines.join("\n"),
        },
    }
}

fn starts_with_marker(line: &str) -> bool {
    line.get(..HEADLINE_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HEADLINE_MARKER))
}

/// Two-phase summarizer shared by every record of a batch.
pub struct MapReduceSummarizer {
    client: CompletionClient,
    tokenizer: Arc<dyn Tokenizer>,
    limiter: Arc<RateLimiter>,
    chunker: TokenChunker,
    prompts: Prompts,
    temperature: f32,
    max_output_tokens: u32,
}

impl MapReduceSummarizer {
    pub fn new(
        settings: &Settings,
        prompts: Prompts,
        client: CompletionClient,
        tokenizer: Arc<dyn Tokenizer>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self> {
        let chunker = TokenChunker::new(
            settings.chunking.chunk_size_tokens,
            settings.chunking.chunk_overlap_tokens,
        )?;

        Ok(Self {
            client,
            tokenizer,
            limiter,
            chunker,
            prompts,
            temperature: settings.llm.temperature as f32,
            max_output_tokens: settings.llm.max_output_tokens,
        })
    }

    /// Summarize a record.
    pub async fn summarize(&self, record: &InputRecord) -> Result<SummaryResult> {
        Ok(self.summarize_record(record).await?.summary)
    }

    /// Summarize a record, reporting chunk and call counts.
    #[instrument(skip(self, record), fields(id = record.id().unwrap_or("-")))]
    pub async fn summarize_record(&self, record: &InputRecord) -> Result<RecordSummary> {
        let text = record.text();
        if text.is_empty() {
            debug!("Empty transcript, nothing to summarize");
            return Ok(RecordSummary {
                summary: SummaryResult::default(),
                chunks: 0,
                calls: 0,
            });
        }

        let chunks = self.chunker.chunk(text, self.tokenizer.as_ref());
        info!("Summarizing {} chunks", chunks.len());

        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            self.limiter.wait().await;
            let user = self.prompts.map_user(&chunk.content);
            let partial = self
                .client
                .complete(
                    &self.prompts.map.system,
                    &user,
                    self.temperature,
                    self.max_output_tokens,
                )
                .await?;
            debug!(order = chunk.order, tokens = chunk.token_count(), "Chunk summarized");
            partials.push(partial);
        }

        let merge_input = partials.join("\n\n");
        self.limiter.wait().await;
        let reduce_output = self
            .client
            .complete(
                &self.prompts.reduce.system,
                &self.prompts.reduce_user(&merge_input),
                self.temperature,
                self.max_output_tokens,
            )
            .await?;

        Ok(RecordSummary {
            summary: parse_reduce_output(&reduce_output),
            chunks: chunks.len(),
            calls: chunks.len() + 1,
        })
    }
}
