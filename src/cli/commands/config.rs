//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::{Prompts, Settings};
use anyhow::Result;
use std::path::Path;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                ));
            } else {
                settings.save_to(&config_path.to_path_buf())?;
                Output::success(&format!("Wrote config to {}", config_path.display()));
            }

            let docs_dir = settings.docs_dir();
            std::fs::create_dir_all(&docs_dir)?;
            Output::kv("Course documents", &docs_dir.display().to_string());

            if let Some(dir) = &settings.prompts.custom_dir {
                let prompts_dir = Settings::expand_path(dir);
                let prompts_path = prompts_dir.join("assistant.toml");
                if !prompts_path.exists() || *force {
                    std::fs::create_dir_all(&prompts_dir)?;
                    let content = toml::to_string_pretty(&Prompts::default().assistant)
                        .map_err(|e| anyhow::anyhow!("Failed to serialize prompts: {}", e))?;
                    std::fs::write(&prompts_path, content)?;
                    Output::kv("Prompts", &prompts_path.display().to_string());
                }
            }
        }
    }

    Ok(())
}
