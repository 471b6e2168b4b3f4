//! Reading and selecting transcript records.

use crate::error::{Result, TldwError};
use crate::record::InputRecord;
use std::collections::HashSet;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Read every record of a JSONL file. Blank lines are skipped; any malformed
/// line fails the whole read.
pub fn read_records(path: &Path) -> Result<Vec<InputRecord>> {
    if !path.exists() {
        return Err(TldwError::InputNotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record = serde_json::from_str(line).map_err(|source| TldwError::MalformedInput {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }

    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parse a comma-separated id list, ignoring blanks.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep the first `limit` records, then only those whose id is in `ids`.
pub fn select_records(
    mut records: Vec<InputRecord>,
    limit: Option<usize>,
    ids: Option<&[String]>,
) -> Vec<InputRecord> {
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    if let Some(ids) = ids {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        records.retain(|r| r.id().is_some_and(|id| wanted.contains(id)));
    }

    records
}
