//! Prompt templates for tldw.
//!
//! Templates use `{{name}}` placeholders. The map and reduce user templates come
//! from the config file; system prompts can be replaced by TOML files in the
//! custom prompts directory.

use super::settings::PromptSettings;
use crate::error::{Result, TldwError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Placeholder for a chunk's text in the map template.
pub const CHUNK_TEXT_PLACEHOLDER: &str = "{{chunk_text}}";
/// Placeholder for the joined chunk summaries in the reduce template.
pub const BULLETS_PLACEHOLDER: &str = "{{bullets}}";

pub const DEFAULT_MAP_SYSTEM: &str =
    "You are a precise technical summarizer. Output only the requested bullets; no preamble.";

pub const DEFAULT_REDUCE_SYSTEM: &str =
    "You are a careful editor. Merge bullets into one coherent summary per instructions.";

pub const DEFAULT_MAP_TEMPLATE: &str = r#"Summarize the following part of a video transcript as 3-7 concise bullet points.
Keep names, numbers and technical terms exactly as spoken. Skip greetings, sponsor reads and calls to subscribe.

Transcript excerpt:
{{chunk_text}}"#;

pub const DEFAULT_REDUCE_TEMPLATE: &str = r#"The bullet points below summarize consecutive parts of one video.
Merge them into a single summary of the whole video.

Start with one line of the form "TL;DR: <one sentence>".
Then list 5-10 bullet points, without duplicates, in the order the topics appear.

{{bullets}}"#;

/// System and user template for one pipeline phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasePrompts {
    pub system: String,
    pub user: String,
}

/// Override file for one phase. Missing fields keep the configured value.
#[derive(Debug, Default, Deserialize)]
struct PhasePromptFile {
    system: Option<String>,
    user: Option<String>,
}

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompts {
    pub map: PhasePrompts,
    pub reduce: PhasePrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            map: PhasePrompts {
                system: DEFAULT_MAP_SYSTEM.to_string(),
                user: DEFAULT_MAP_TEMPLATE.to_string(),
            },
            reduce: PhasePrompts {
                system: DEFAULT_REDUCE_SYSTEM.to_string(),
                user: DEFAULT_REDUCE_TEMPLATE.to_string(),
            },
            variables: HashMap::new(),
        }
    }
}

impl Prompts {
    /// Build prompts from settings, applying `map.toml` / `reduce.toml` from the custom directory.
    pub fn load(settings: &PromptSettings) -> Result<Self> {
        let mut prompts = Prompts::default();
        prompts.map.user = settings.map.clone();
        prompts.reduce.user = settings.reduce.clone();
        prompts.variables = settings.variables.clone();

        if let Some(dir) = &settings.custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let map_path = custom_path.join("map.toml");
            if map_path.exists() {
                let file: PhasePromptFile = toml::from_str(&std::fs::read_to_string(&map_path)?)?;
                file.apply_to(&mut prompts.map);
            }

            let reduce_path = custom_path.join("reduce.toml");
            if reduce_path.exists() {
                let file: PhasePromptFile =
                    toml::from_str(&std::fs::read_to_string(&reduce_path)?)?;
                file.apply_to(&mut prompts.reduce);
            }
        }

        if !prompts.map.user.contains(CHUNK_TEXT_PLACEHOLDER) {
            return Err(TldwError::Config(format!(
                "map prompt must contain {}",
                CHUNK_TEXT_PLACEHOLDER
            )));
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a template with custom config variables and call-time variables.
    ///
    /// Custom variables are substituted first, so call-time values (transcript
    /// text, summaries) are inserted last and never rescanned for placeholders.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let custom: HashMap<String, String> = self
            .variables
            .iter()
            .filter(|(key, _)| !vars.contains_key(*key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut result = Self::render(template, &custom);
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// User prompt for one chunk.
    pub fn map_user(&self, chunk_text: &str) -> String {
        let vars = HashMap::from([("chunk_text".to_string(), chunk_text.to_string())]);
        self.render_with_custom(&self.map.user, &vars)
    }

    /// User prompt for the merge of all chunk summaries.
    ///
    /// Templates without `{{bullets}}` get the summaries appended in a delimited block.
    pub fn reduce_user(&self, bullets: &str) -> String {
        if self.reduce.user.contains(BULLETS_PLACEHOLDER) {
            let vars = HashMap::from([("bullets".to_string(), bullets.to_string())]);
            return self.render_with_custom(&self.reduce.user, &vars);
        }

        let instructions = self.render_with_custom(&self.reduce.user, &HashMap::new());
        format!(
            "{}\n\n=== BULLETS START ===\n{}\n=== BULLETS END ===\n",
            instructions.trim_end(),
            bullets
        )
    }
}

impl PhasePromptFile {
    fn apply_to(self, phase: &mut PhasePrompts) {
        if let Some(system) = self.system {
            phase.system = system;
        }
        if let Some(user) = self.user {
            phase.user = user;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.map.user.contains(CHUNK_TEXT_PLACEHOLDER));
        assert!(prompts.reduce.user.contains(BULLETS_PLACEHOLDER));
        assert!(!prompts.map.system.is_empty());
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let vars = HashMap::from([
            ("name".to_string(), "Alice".to_string()),
            ("count".to_string(), "5".to_string()),
        ]);

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_map_user_substitutes_chunk_and_variables() {
        let mut prompts = Prompts::default();
        prompts.map.user = "Channel: {{channel}}\n{{chunk_text}}".to_string();
        prompts.variables.insert("channel".to_string(), "RustConf".to_string());

        assert_eq!(prompts.map_user("borrowck"), "Channel: RustConf\nborrowck");
    }

    #[test]
    fn test_chunk_text_is_not_rescanned() {
        let mut prompts = Prompts::default();
        prompts.map.user = "{{chunk_text}}".to_string();
        prompts.variables.insert("channel".to_string(), "X".to_string());

        assert_eq!(prompts.map_user("say {{channel}}"), "say {{channel}}");
    }

    #[test]
    fn test_reduce_without_placeholder_appends_block() {
        let mut prompts = Prompts::default();
        prompts.reduce.user = "Merge these.".to_string();

        let rendered = prompts.reduce_user("- a\n\n- b");
        assert_eq!(
            rendered,
            "Merge these.\n\n=== BULLETS START ===\n- a\n\n- b\n=== BULLETS END ===\n"
        );
    }

    #[test]
    fn test_custom_dir_overrides_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("reduce.toml"), "system = \"You are terse.\"\n").unwrap();

        let settings = PromptSettings {
            custom_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..PromptSettings::default()
        };
        let prompts = Prompts::load(&settings).unwrap();

        assert_eq!(prompts.reduce.system, "You are terse.");
        assert_eq!(prompts.reduce.user, DEFAULT_REDUCE_TEMPLATE);
        assert_eq!(prompts.map.system, DEFAULT_MAP_SYSTEM);
    }

    #[test]
    fn test_custom_map_without_placeholder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map.toml"), "user = \"Summarize.\"\n").unwrap();

        let settings = PromptSettings {
            custom_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..PromptSettings::default()
        };
        assert!(Prompts::load(&settings).is_err());
    }
}
