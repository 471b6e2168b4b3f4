//! Configuration settings for tldw.

use super::prompts::{DEFAULT_MAP_TEMPLATE, DEFAULT_REDUCE_TEMPLATE, CHUNK_TEXT_PLACEHOLDER};
use crate::chunking::validate_window;
use crate::error::{Result, TldwError};
use crate::openai::DEFAULT_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding `llm.model`.
pub const MODEL_ENV: &str = "MODEL";
/// Environment variable overriding `llm.temperature`.
pub const TEMPERATURE_ENV: &str = "TEMPERATURE";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub chunking: ChunkingSettings,
    #[serde(default)]
    pub runtime: RuntimeSettings,
    #[serde(default)]
    pub prompts: PromptSettings,
    pub io: IoSettings,
}

/// Completion provider type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI chat completions, or any endpoint speaking the same API.
    #[default]
    OpenAI,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Completion provider.
    pub provider: LlmProvider,
    /// Model used for both the map and the reduce calls.
    pub model: String,
    /// Sampling temperature. Narrowed to `f32` only when a request is built.
    pub temperature: f64,
    /// Maximum tokens generated per call.
    pub max_output_tokens: u32,
    /// Custom API endpoint (OpenAI-compatible).
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_output_tokens: 800,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Token chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Tokens per chunk.
    pub chunk_size_tokens: usize,
    /// Tokens shared by consecutive chunks. Must be smaller than the chunk size.
    pub chunk_overlap_tokens: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size_tokens: 3000,
            chunk_overlap_tokens: 200,
        }
    }
}

/// Batch execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Records summarized concurrently.
    pub concurrency: usize,
    /// Completion calls per second across all records.
    pub rate_limit_rps: f64,
    /// Log a failed record and keep going instead of aborting the run.
    pub continue_on_error: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            rate_limit_rps: 1.0,
            continue_on_error: false,
        }
    }
}

/// Prompt template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// User prompt for each chunk. Must contain `{{chunk_text}}`.
    pub map: String,
    /// User prompt for the merge. `{{bullets}}` receives the chunk summaries.
    pub reduce: String,
    /// Directory with `map.toml` / `reduce.toml` overrides.
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: HashMap<String, String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            map: DEFAULT_MAP_TEMPLATE.to_string(),
            reduce: DEFAULT_REDUCE_TEMPLATE.to_string(),
            custom_dir: None,
            variables: HashMap::new(),
        }
    }
}

/// Input and output locations. All fields are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoSettings {
    /// Newline-delimited JSON transcripts.
    pub input_jsonl: String,
    /// CSV table of summaries.
    pub output_csv: String,
    /// Markdown document of summaries.
    pub output_md: String,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or the default location if None.
    ///
    /// Values are resolved as environment override, then file value, then default.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if !config_path.exists() {
            return Err(TldwError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        debug!("Loading config from {}", config_path.display());
        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_with(&content, |key| std::env::var(key).ok())
    }

    /// Parse settings from TOML, apply overrides from `lookup`, and validate.
    pub fn from_toml_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings: Settings = toml::from_str(content)?;
        settings.apply_overrides(lookup)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `MODEL` / `TEMPERATURE` overrides.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.llm.model = model.trim().to_string();
        }

        if let Some(raw) = lookup(TEMPERATURE_ENV).filter(|t| !t.trim().is_empty()) {
            self.llm.temperature = raw.trim().parse().map_err(|_| {
                TldwError::Config(format!("{} is not a number: {}", TEMPERATURE_ENV, raw))
            })?;
        }

        Ok(())
    }

    /// Check numeric ranges and templates.
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(TldwError::Config("llm.model must not be empty".to_string()));
        }
        if !self.llm.temperature.is_finite() || !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(TldwError::Config(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_output_tokens == 0 {
            return Err(TldwError::Config(
                "llm.max_output_tokens must be greater than 0".to_string(),
            ));
        }

        validate_window(
            self.chunking.chunk_size_tokens,
            self.chunking.chunk_overlap_tokens,
        )?;

        if self.runtime.concurrency == 0 {
            return Err(TldwError::Config(
                "runtime.concurrency must be at least 1".to_string(),
            ));
        }
        if !self.runtime.rate_limit_rps.is_finite() || self.runtime.rate_limit_rps <= 0.0 {
            return Err(TldwError::Config(format!(
                "runtime.rate_limit_rps must be greater than 0, got {}",
                self.runtime.rate_limit_rps
            )));
        }

        if !self.prompts.map.contains(CHUNK_TEXT_PLACEHOLDER) {
            return Err(TldwError::Config(format!(
                "prompts.map must contain {}",
                CHUNK_TEXT_PLACEHOLDER
            )));
        }

        for (name, value) in [
            ("io.input_jsonl", &self.io.input_jsonl),
            ("io.output_csv", &self.io.output_csv),
            ("io.output_md", &self.io.output_md),
        ] {
            if value.trim().is_empty() {
                return Err(TldwError::Config(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// `./config/summarizer.toml` wins when it exists, otherwise the per-user config dir.
    pub fn default_config_path() -> PathBuf {
        let local = PathBuf::from("config").join("summarizer.toml");
        if local.exists() {
            return local;
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tldw")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded input path.
    pub fn input_path(&self) -> PathBuf {
        Self::expand_path(&self.io.input_jsonl)
    }

    /// Get the expanded CSV output path.
    pub fn output_csv_path(&self) -> PathBuf {
        Self::expand_path(&self.io.output_csv)
    }

    /// Get the expanded Markdown output path.
    pub fn output_md_path(&self) -> PathBuf {
        Self::expand_path(&self.io.output_md)
    }
}
