//! Durable outputs: the summary table (CSV) and the summary document (Markdown).

use crate::error::Result;
use crate::record::{InputRecord, OutputRow, CSV_HEADER};
use crate::summarizer::SummaryResult;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rows buffered before the table is written.
pub const FLUSH_EVERY: usize = 5;

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Ids already present in an existing summary table.
pub fn already_done_ids(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let Some(id_column) = reader.headers()?.iter().position(|h| h == "id") else {
        return Ok(HashSet::new());
    };

    let mut done = HashSet::new();
    for row in reader.records() {
        if let Some(id) = row?.get(id_column).filter(|id| !id.is_empty()) {
            done.insert(id.to_string());
        }
    }

    debug!("Found {} summarized ids in {}", done.len(), path.display());
    Ok(done)
}

/// Append-only CSV table that buffers rows and writes them in batches.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    pending: Vec<OutputRow>,
    flush_every: usize,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pending: Vec::new(),
            flush_every: FLUSH_EVERY,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Buffer a row, writing the batch once it is full.
    pub fn push(&mut self, row: OutputRow) -> Result<()> {
        self.pending.push(row);
        if self.pending.len() >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Write all buffered rows. A new (or empty) file gets the header first.
    pub fn flush(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        ensure_parent_dir(&self.path)?;
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(CSV_HEADER)?;
        }
        for row in &self.pending {
            writer.serialize(row)?;
        }
        writer.flush()?;

        let written = self.pending.len();
        self.pending.clear();
        debug!("Flushed {} rows to {}", written, self.path.display());
        Ok(written)
    }
}

/// Append-only Markdown document, one section per record.
#[derive(Debug, Clone)]
pub struct MarkdownSink {
    path: PathBuf,
}

impl MarkdownSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one section with a single write.
    pub fn append(&self, block: &str) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut data = block.to_string();
        if !data.ends_with('\n') {
            data.push('\n');
        }
        file.write_all(data.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// `YYYYMMDD` as `YYYY-MM-DD`; anything else unchanged.
fn display_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Markdown section for one summarized record.
pub fn render_section(record: &InputRecord, summary: &SummaryResult) -> String {
    let meta = &record.meta;
    let title = meta.title.as_deref().filter(|t| !t.is_empty()).unwrap_or("(untitled)");

    format!(
        "# {title}\n\
         **URL:** {url}\n\
         **Uploaded:** {uploaded}\n\
         **Language:** {language} | **Auto-captions:** {generated}\n\
         \n\
         {tldr}\n\
         \n\
         {bullets}\n\
         \n\
         ---\n",
        url = meta.url.as_deref().unwrap_or_default(),
        uploaded = display_date(meta.upload_date.as_deref().unwrap_or_default()),
        language = record.language.as_deref().unwrap_or_default(),
        generated = record.is_generated.map(|g| g.to_string()).unwrap_or_default(),
        tldr = summary.tldr,
        bullets = summary.bullets,
    )
}
