//! Remote model access
//!
//! This module talks to hosted (or local) LLM providers. Keys are BYOK:
//! either set in the config file or read from the provider's environment
//! variable.
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, `GEMINI_API_KEY`,
//!   `PERPLEXITY_API_KEY`, `OPENROUTER_API_KEY`
//!
//! # Example
//!
//! ```rust,ignore
//! use codereview::ai::{AiClient, AiConfig, LlmBackend, ModelService};
//!
//! let config = AiConfig { backend: LlmBackend::Anthropic, ..Default::default() };
//! let client = AiClient::new(config, std::env::var("ANTHROPIC_API_KEY")?);
//! client.probe()?;
//! let text = client.complete("Review this file...")?;
//! ```

mod client;
pub mod prompts;
mod rate_limit;
pub mod response;

pub use client::{AiClient, AiConfig, LlmBackend};
pub use rate_limit::SlidingWindowLimiter;

use thiserror::Error;

/// Errors that can occur while talking to a model provider
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Missing API key: {env_var} not set. Get your key at {signup_url}")]
    MissingApiKey { env_var: String, signup_url: String },

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API request timed out")]
    Timeout,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<ureq::Error> for AiError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Timeout(_) => AiError::Timeout,
            other => AiError::RequestFailed(other.to_string()),
        }
    }
}

pub type AiResult<T> = Result<T, AiError>;

/// "Send prompt, receive text"
///
/// Everything above the wire protocol (rate limiting, caching, batching,
/// response parsing) lives in the remote analyzer; implementations only
/// move text back and forth.
pub trait ModelService: Send + Sync {
    /// Provider/model label for logs
    fn name(&self) -> String;

    /// Lightweight connectivity and credential check
    fn probe(&self) -> AiResult<()>;

    fn complete(&self, prompt: &str) -> AiResult<String>;
}
