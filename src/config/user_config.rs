//! User-level configuration for codereview
//!
//! `~/.config/codereview/config.toml` holds personal `[llm]` defaults
//! (provider choice, API keys) shared by every repository:
//!
//! ```toml
//! [llm]
//! enabled = true
//! provider = "anthropic"
//!
//! [llm.providers.anthropic]
//! api_key = "sk-ant-..."
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct UserConfig;

impl UserConfig {
    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("codereview").join("config.toml"))
    }

    /// The `[llm]` table from the user config, if any
    pub fn load_llm_table() -> Option<toml::Table> {
        let path = Self::user_config_path().filter(|p| p.exists())?;
        match Self::read_table(&path) {
            Ok(mut table) => {
                debug!("Loaded user config from {}", path.display());
                match table.remove("llm") {
                    Some(toml::Value::Table(llm)) => Some(llm),
                    _ => None,
                }
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", path.display(), e);
                None
            }
        }
    }

    fn read_table(path: &std::path::Path) -> Result<toml::Table> {
        let content = std::fs::read_to_string(path).context("Failed to read user config")?;
        toml::from_str(&content).context("Failed to parse user config")
    }

    /// Create the user config directory and an example config
    pub fn init_user_config() -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !config_path.exists() {
            let example = r#"# codereview user configuration

[llm]
# enabled = true
# provider = "anthropic"   # anthropic, openai, gemini, perplexity, openrouter, ollama

# [llm.providers.anthropic]
# api_key = "sk-ant-..."
# rate_limit = { requests_per_minute = 10, requests_per_hour = 100 }
"#;
            std::fs::write(&config_path, example)?;
        }

        Ok(config_path)
    }
}
