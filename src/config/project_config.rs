//! Project-level configuration support
//!
//! Loads `codereview.toml` from the repository root. Missing `[llm]` keys are
//! filled from the user config, then environment variables override both.
//!
//! # Configuration Format
//!
//! ```toml
//! # codereview.toml
//!
//! [analysis]
//! max_file_size = 1048576
//! exclude_dirs = [".git", "node_modules", "target"]
//! exclude = ["generated/**", "**/*.min.js"]
//! workers = 8
//!
//! [llm]
//! enabled = true
//! provider = "anthropic"
//! batch_max_files = 5
//!
//! [llm.providers.anthropic]
//! model = "claude-sonnet-4-20250514"
//! max_tokens = 2000
//! temperature = 0.3
//! rate_limit = { requests_per_minute = 10, requests_per_hour = 100 }
//! ```

use super::user_config::UserConfig;
use crate::ai::LlmBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub const PROJECT_CONFIG_FILE: &str = "codereview.toml";

/// Directory names pruned from every walk
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "dist",
    "build",
    "target",
    "bin",
    "obj",
    ".vscode",
    ".idea",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Files larger than this (bytes) are skipped
    pub max_file_size: u64,
    pub exclude_dirs: Vec<String>,
    /// Glob patterns matched against repo-relative paths
    pub exclude: Vec<String>,
    /// Files sampled per directory for language detection
    pub language_sample_size: usize,
    /// Pattern pass threads; 0 means one per core
    pub workers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1024 * 1024,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            language_sample_size: 100,
            workers: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub batch_max_files: usize,
    pub batch_max_tokens: usize,
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LlmBackend::default().as_str().to_string(),
            timeout_secs: 120,
            cache_ttl_secs: 3600,
            batch_max_files: 5,
            batch_max_tokens: 6000,
            providers: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    /// Settings for the selected provider (defaults when absent)
    pub fn active_provider(&self) -> ProviderConfig {
        self.providers.get(&self.provider).cloned().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub rate_limit: RateLimitConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            max_tokens: 2000,
            temperature: 0.3,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 10,
            requests_per_hour: 100,
        }
    }
}

impl AppConfig {
    /// Apply `CODEREVIEW_LLM_ENABLED`, `CODEREVIEW_LLM_PROVIDER` and the
    /// selected provider's API key variable
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = lookup("CODEREVIEW_LLM_ENABLED") {
            match parse_bool(&value) {
                Some(enabled) => self.llm.enabled = enabled,
                None => warn!("Ignoring CODEREVIEW_LLM_ENABLED={:?}", value),
            }
        }
        if let Some(provider) = lookup("CODEREVIEW_LLM_PROVIDER") {
            self.llm.provider = provider.trim().to_lowercase();
        }

        if let Ok(backend) = self.llm.provider.parse::<LlmBackend>() {
            if let Some(key) = lookup(backend.env_key()) {
                self.llm
                    .providers
                    .entry(self.llm.provider.clone())
                    .or_default()
                    .api_key = Some(key);
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load configuration for a repository: project file, user `[llm]`
/// defaults, then environment overrides. Never fails; problems are logged
/// and defaults used.
pub fn load_config(repo_path: &Path) -> AppConfig {
    let user_llm = UserConfig::load_llm_table();
    let mut config = load_project_config_with(repo_path, user_llm);
    config.apply_env_overrides();
    config
}

/// Load `codereview.toml` only (no user config, no environment)
pub fn load_project_config(repo_path: &Path) -> AppConfig {
    load_project_config_with(repo_path, None)
}

fn load_project_config_with(repo_path: &Path, user_llm: Option<toml::Table>) -> AppConfig {
    let toml_path = repo_path.join(PROJECT_CONFIG_FILE);
    let mut table = if toml_path.exists() {
        match load_toml_table(&toml_path) {
            Ok(table) => {
                debug!("Loaded project config from {}", toml_path.display());
                table
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
                toml::Table::new()
            }
        }
    } else {
        debug!("No project config found, using defaults");
        toml::Table::new()
    };

    if let Some(mut llm) = user_llm {
        if let Some(toml::Value::Table(project_llm)) = table.remove("llm") {
            merge_tables(&mut llm, project_llm);
        }
        table.insert("llm".to_string(), toml::Value::Table(llm));
    }

    match toml::Value::Table(table).try_into::<AppConfig>() {
        Ok(config) => config,
        Err(e) => {
            warn!("Invalid configuration in {}: {}", toml_path.display(), e);
            AppConfig::default()
        }
    }
}

fn load_toml_table(path: &Path) -> anyhow::Result<toml::Table> {
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content)?;
    Ok(table)
}

/// Deep merge: keys in `overlay` win, nested tables merge
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
