//! Transcript records and the rows produced from them.

use crate::summarizer::SummaryResult;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Metadata of the video a transcript belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Upload date as provided by the source, usually `YYYYMMDD`.
    #[serde(default)]
    pub upload_date: Option<String>,
    /// Duration in seconds, kept in its original numeric form.
    #[serde(default)]
    pub duration: Option<serde_json::Number>,
    /// Any other metadata fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One line of the transcripts JSONL input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    #[serde(default)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub language: Option<String>,
    /// Whether the captions were generated automatically.
    #[serde(default)]
    pub is_generated: Option<bool>,
    /// Transcript text. Anything other than a string is treated as no text.
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

impl InputRecord {
    /// Record identifier, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.meta.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Transcript text with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default().trim()
    }

    pub fn title(&self) -> &str {
        self.meta.title.as_deref().unwrap_or_default()
    }
}

/// Column names of the summary table, in order.
pub const CSV_HEADER: [&str; 9] = [
    "id",
    "title",
    "url",
    "upload_date",
    "duration_sec",
    "language",
    "is_generated",
    "tldr",
    "summary_bullets_md",
];

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub upload_date: String,
    pub duration_sec: String,
    pub language: String,
    pub is_generated: String,
    pub tldr: String,
    pub summary_bullets_md: String,
}

impl OutputRow {
    /// Flatten a record and its summary.
    pub fn new(record: &InputRecord, summary: &SummaryResult) -> Self {
        let meta = &record.meta;
        Self {
            id: meta.id.clone().unwrap_or_default(),
            title: meta.title.clone().unwrap_or_default(),
            url: meta.url.clone().unwrap_or_default(),
            upload_date: meta.upload_date.clone().unwrap_or_default(),
            duration_sec: meta.duration.as_ref().map(|d| d.to_string()).unwrap_or_default(),
            language: record.language.clone().unwrap_or_default(),
            is_generated: record.is_generated.map(|g| g.to_string()).unwrap_or_default(),
            tldr: summary.tldr.clone(),
            summary_bullets_md: summary.bullets.clone(),
        }
    }
}
