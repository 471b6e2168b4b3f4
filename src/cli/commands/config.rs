//! Config command implementation.

use crate::cli::ConfigAction;
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load_from(Some(config_path))?;
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        // Printed even when the file does not exist yet.
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
