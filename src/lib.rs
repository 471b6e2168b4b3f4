//! tldw - Too Long; Didn't Watch
//!
//! A batch summarizer for video transcripts.
//!
//! # Overview
//!
//! tldw reads transcripts from a JSONL file and, for each record:
//! - Splits the text into overlapping token windows
//! - Summarizes every window with a language model (map)
//! - Merges the partial summaries into a headline and bullets (reduce)
//! - Appends the result to a CSV table and a Markdown document
//!
//! Runs are resumable: ids already present in the table are skipped.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `record` - Input records and output rows
//! - `tokenizer` - Token encoding with a fixed fallback
//! - `chunking` - Token-window chunking
//! - `completion` - Completion backends with retry
//! - `rate_limit` - Shared call throttle
//! - `summarizer` - Map-reduce summarization of one record
//! - `batch` - Input selection, resumable runs, and outputs
//!
//! # Example
//!
//! ```rust,no_run
//! use tldw::batch::{read_records, BatchRunner};
//! use tldw::cli::commands::build_summarizer;
//! use tldw::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let records = read_records(&settings.input_path())?;
//!
//!     let runner = BatchRunner::new(build_summarizer(&settings)?, &settings);
//!     let stats = runner.run(records, true).await?;
//!     println!("Summarized {} records", stats.processed);
//!
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod openai;
pub mod rate_limit;
pub mod record;
pub mod summarizer;
pub mod tokenizer;

pub use error::{Result, TldwError};
