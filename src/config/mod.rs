//! Configuration module for codereview
//!
//! This module handles:
//! - Project-level configuration (codereview.toml)
//! - User-level `[llm]` defaults (~/.config/codereview/config.toml)
//! - Environment overrides for the remote model

mod project_config;
mod user_config;

pub use project_config::{
    load_config, load_project_config, AnalysisConfig, AppConfig, LlmConfig, ProviderConfig,
    RateLimitConfig, DEFAULT_EXCLUDE_DIRS, PROJECT_CONFIG_FILE,
};
pub use user_config::UserConfig;
