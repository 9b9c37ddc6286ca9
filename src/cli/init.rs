//! Init command - write an example codereview.toml

use crate::config::{UserConfig, PROJECT_CONFIG_FILE};
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

const EXAMPLE_CONFIG: &str = r#"# codereview configuration

[analysis]
# Skip files larger than this many bytes
# max_file_size = 1048576
# Globs of repo-relative paths to skip
# exclude = ["generated/**", "**/*.min.js"]
# Pattern analysis threads (0 = one per core)
# workers = 0

[llm]
# Review files with a remote model before falling back to pattern analyzers
enabled = false
# anthropic, openai, gemini, perplexity, openrouter, ollama
provider = "anthropic"
# batch_max_files = 5
# batch_max_tokens = 6000

# [llm.providers.anthropic]
# api_key = "..."  # or set ANTHROPIC_API_KEY
# model = "claude-sonnet-4-20250514"
# max_tokens = 2000
# temperature = 0.3
# rate_limit = { requests_per_minute = 10, requests_per_hour = 100 }
"#;

/// Run the init command
pub fn run(path: &Path) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    if !repo_path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", repo_path.display());
    }

    let config_path = repo_path.join(PROJECT_CONFIG_FILE);
    if config_path.exists() {
        println!(
            "{} Already initialized at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    } else {
        std::fs::write(&config_path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!(
            "{} Created {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    }

    match UserConfig::init_user_config() {
        Ok(user_path) => println!(
            "{} User config at {}",
            style("✓").green(),
            style(user_path.display()).cyan()
        ),
        Err(e) => eprintln!("{} Could not create user config: {}", style("!").yellow(), e),
    }
    Ok(())
}
