//! Error types for tldw.

use crate::completion::ErrorClass;
use std::path::PathBuf;
use thiserror::Error;

/// Library-level error type for tldw operations.
#[derive(Error, Debug)]
pub enum TldwError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Malformed input at line {line}: {source}")]
    MalformedInput {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Completion failed after {attempts} attempt(s) ({class}): {message}")]
    Completion {
        class: ErrorClass,
        attempts: u32,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TldwError {
    /// Process exit code for this error.
    ///
    /// Configuration problems exit with 2, unusable input with 3 and
    /// unrecoverable completion failures with 4. Everything else exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            TldwError::Config(_) | TldwError::TomlParse(_) => 2,
            TldwError::InputNotFound(_) | TldwError::MalformedInput { .. } => 3,
            TldwError::Completion { .. } => 4,
            _ => 1,
        }
    }
}

/// Result type alias for tldw operations.
pub type Result<T> = std::result::Result<T, TldwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        assert_eq!(TldwError::Config("bad".into()).exit_code(), 2);
        assert_eq!(TldwError::InputNotFound("x.jsonl".into()).exit_code(), 3);
        assert_eq!(
            TldwError::Completion {
                class: ErrorClass::Transient,
                attempts: 5,
                message: "timeout".into(),
            }
            .exit_code(),
            4
        );
        assert_eq!(
            TldwError::Io(std::io::Error::other("disk")).exit_code(),
            1
        );
    }

    #[test]
    fn test_malformed_input_reports_line() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = TldwError::MalformedInput { line: 7, source };
        assert!(err.to_string().starts_with("Malformed input at line 7"));
        assert_eq!(err.exit_code(), 3);
    }
}
