//! Configuration module for tldw.
//!
//! Handles loading and validating settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{
    PhasePrompts, Prompts, BULLETS_PLACEHOLDER, CHUNK_TEXT_PLACEHOLDER, DEFAULT_MAP_SYSTEM,
    DEFAULT_MAP_TEMPLATE, DEFAULT_REDUCE_SYSTEM, DEFAULT_REDUCE_TEMPLATE,
};
pub use settings::{
    ChunkingSettings, IoSettings, LlmProvider, LlmSettings, PromptSettings, RuntimeSettings,
    Settings, MODEL_ENV, TEMPERATURE_ENV,
};
