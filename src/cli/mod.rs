//! CLI module for tldw.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// tldw - Too Long; Didn't Watch
///
/// Summarizes video transcripts with a map-reduce pass over a language model
/// and appends the results to a CSV table and a Markdown document.
#[derive(Parser, Debug)]
#[command(name = "tldw")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize the transcripts named in the configuration
    Run {
        /// Only consider the first N records of the input
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip records whose id is already in the summary table
        #[arg(short, long)]
        resume: bool,

        /// Comma-separated list of record ids to summarize
        #[arg(long)]
        ids: Option<String>,
    },

    /// Show how transcripts would be chunked without calling the model
    Chunks {
        /// Only consider the first N records of the input
        #[arg(short, long)]
        limit: Option<usize>,

        /// Comma-separated list of record ids to inspect
        #[arg(long)]
        ids: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}
