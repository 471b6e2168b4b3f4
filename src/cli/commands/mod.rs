//! CLI command implementations.

mod chunks;
mod config;
mod run;

pub use chunks::run_chunks;
pub use config::run_config;
pub use run::{build_summarizer, run_batch};

use crate::batch::{parse_id_list, read_records, select_records};
use crate::config::Settings;
use crate::error::Result;
use crate::record::InputRecord;

/// Read the configured input and apply `--limit` then `--ids`.
fn load_selection(
    settings: &Settings,
    limit: Option<usize>,
    ids: Option<&str>,
) -> Result<Vec<InputRecord>> {
    let records = read_records(&settings.input_path())?;
    let ids = ids.map(parse_id_list);
    Ok(select_records(records, limit, ids.as_deref()))
}
