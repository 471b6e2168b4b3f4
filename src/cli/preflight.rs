//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and input are available before a run starts
//! calling the model.

use crate::config::Settings;
use crate::error::{Result, TldwError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Summarizing needs credentials and the input file.
    Summarize,
    /// Planning chunks only needs the input file.
    Plan,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_with(operation, settings, |key| std::env::var(key).ok())
}

fn check_with<F>(operation: Operation, settings: &Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Operation::Summarize = operation {
        // Custom endpoints (local servers) may not need a key.
        if settings.llm.base_url.is_none() {
            check_api_key(lookup)?;
        }
    }
    check_input(settings)
}

/// Check if OpenAI API key is configured.
fn check_api_key<F>(lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup("OPENAI_API_KEY") {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(TldwError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(TldwError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

fn check_input(settings: &Settings) -> Result<()> {
    let input = settings.input_path();
    if input.is_file() {
        Ok(())
    } else {
        Err(TldwError::InputNotFound(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(input: &std::path::Path, base_url: Option<&str>) -> Settings {
        let mut settings = Settings::from_toml_with(
            &format!(
                "[io]\ninput_jsonl = \"{}\"\noutput_csv = \"o.csv\"\noutput_md = \"o.md\"\n",
                input.display()
            ),
            |_| None,
        )
        .unwrap();
        settings.llm.base_url = base_url.map(str::to_string);
        settings
    }

    #[test]
    fn test_missing_key_fails_summarize_only() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let settings = settings(file.path(), None);

        let err = check_with(Operation::Summarize, &settings, |_| None).unwrap_err();
        assert!(matches!(err, TldwError::Config(_)));
        assert!(check_with(Operation::Plan, &settings, |_| None).is_ok());
        assert!(check_with(Operation::Summarize, &settings, |_| Some("sk-x".to_string())).is_ok());
    }

    #[test]
    fn test_custom_endpoint_skips_key_check() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let settings = settings(file.path(), Some("http://localhost:11434/v1"));
        assert!(check_with(Operation::Summarize, &settings, |_| None).is_ok());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(&dir.path().join("none.jsonl"), None);
        let err = check_with(Operation::Plan, &settings, |_| None).unwrap_err();
        assert!(matches!(err, TldwError::InputNotFound(_)));
        assert_eq!(err.exit_code(), 3);
    }
}
